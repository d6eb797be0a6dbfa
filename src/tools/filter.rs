//! Shared filter / sort / truncate pipeline for the search tools.

use std::cmp::Ordering;

use crate::core::{DateRange, Record, SortBy, SortDirection, SortKey};

/// Filter and ordering criteria for one search.
#[derive(Debug, Clone, Default)]
pub struct Criteria<'a> {
    /// Free-text query.
    pub query: Option<&'a str>,
    /// Date range, matched with overlap semantics.
    pub date_range: Option<DateRange>,
    /// Status allow-list (empty = any).
    pub status: &'a [String],
    /// Priority allow-list (empty = any).
    pub priority: &'a [String],
    /// Department (case-insensitive).
    pub department: Option<&'a str>,
    /// Category (case-insensitive).
    pub category: Option<&'a str>,
    /// Explicit sort order.
    pub sort_by: Option<&'a SortBy>,
}

/// Result of running the pipeline.
#[derive(Debug, Clone)]
pub struct Filtered<R> {
    /// Records after truncation.
    pub records: Vec<R>,
    /// Matches before truncation.
    pub total: usize,
}

/// Splits a query into lowercase keywords longer than two characters.
#[must_use]
pub fn keywords(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Free-text match.
///
/// A record matches if the whole phrase appears in any field, if at least
/// half the keywords appear somewhere, or if any keyword hits a title field.
pub fn matches_text<R: Record>(record: &R, query: &str) -> bool {
    let phrase = query.trim().to_lowercase();
    if phrase.is_empty() {
        return true;
    }

    let fields: Vec<String> = record
        .search_fields()
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    if fields.iter().any(|f| f.contains(&phrase)) {
        return true;
    }

    let words = keywords(&phrase);
    if words.is_empty() {
        return false;
    }

    let hits = words
        .iter()
        .filter(|w| fields.iter().any(|f| f.contains(w.as_str())))
        .count();
    if hits * 2 >= words.len() {
        return true;
    }

    let titles: Vec<String> = record
        .title_fields()
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    words
        .iter()
        .any(|w| titles.iter().any(|t| t.contains(w.as_str())))
}

fn in_allow_list(value: Option<&str>, allowed: &[String]) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v)))
}

fn equals_ignore_case(value: Option<&str>, wanted: Option<&str>) -> bool {
    wanted.is_none_or(|w| value.is_some_and(|v| v.eq_ignore_ascii_case(w)))
}

/// Returns `true` if `record` passes every non-text criterion.
pub fn passes_filters<R: Record>(record: &R, criteria: &Criteria<'_>) -> bool {
    if !in_allow_list(record.status(), criteria.status)
        || !in_allow_list(record.priority(), criteria.priority)
        || !equals_ignore_case(record.department(), criteria.department)
        || !equals_ignore_case(record.category(), criteria.category)
    {
        return false;
    }

    match criteria.date_range {
        Some(range) => record
            .date_span(range.field.for_entity(R::ENTITY))
            .is_some_and(|(start, end)| range.overlaps(start, end)),
        None => true,
    }
}

/// Total order over sort keys; missing values always sort last.
fn compare_keys(a: &SortKey, b: &SortKey, direction: SortDirection) -> Ordering {
    let ordering = match (a, b) {
        (SortKey::Missing, SortKey::Missing) => return Ordering::Equal,
        (SortKey::Missing, _) => return Ordering::Greater,
        (_, SortKey::Missing) => return Ordering::Less,
        (SortKey::Date(x), SortKey::Date(y)) => x.cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Rank(x), SortKey::Rank(y)) => x.cmp(y),
        _ => Ordering::Equal,
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Sorts records in place by `field`.
pub fn sort_records<R: Record>(records: &mut [R], field: &str, direction: SortDirection) {
    records.sort_by(|a, b| {
        compare_keys(&a.sort_key(field), &b.sort_key(field), direction)
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Filters, sorts (explicit order or `default_sort`), and truncates.
pub fn apply<R: Record>(
    records: Vec<R>,
    criteria: &Criteria<'_>,
    default_sort: (&str, SortDirection),
    limit: usize,
) -> Filtered<R> {
    let mut matched: Vec<R> = records
        .into_iter()
        .filter(|r| passes_filters(r, criteria))
        .filter(|r| criteria.query.is_none_or(|q| matches_text(r, q)))
        .collect();

    let (field, direction) = criteria
        .sort_by
        .map_or(default_sort, |s| (s.field.as_str(), s.direction));
    sort_records(&mut matched, field, direction);

    let total = matched.len();
    matched.truncate(limit);
    Filtered {
        records: matched,
        total,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use test_case::test_case;

    use super::*;
    use crate::core::{DateField, Event};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
    }

    fn event(id: &str, title: &str, start: &str, end: Option<&str>) -> Event {
        Event {
            id: id.to_string(),
            title: title.to_string(),
            description: Some("Annual gathering of industry leaders".to_string()),
            category: Some("conference".to_string()),
            status: Some("confirmed".to_string()),
            location: Some("Hall 4".to_string()),
            organizer: None,
            start_date: d(start),
            end_date: end.map(d),
            expected_attendees: None,
            budget: None,
        }
    }

    #[test_case("industry leaders", true ; "full phrase")]
    #[test_case("annual industry summit", true ; "half the keywords")]
    #[test_case("defence maritime shipping", true ; "title keyword")]
    #[test_case("maritime shipping logistics", false ; "no overlap")]
    #[test_case("", true ; "empty query")]
    #[test_case("zq", false ; "only short words")]
    fn test_matches_text(query: &str, expected: bool) {
        let e = event("e1", "Defence Expo", "2025-02-01", None);
        assert_eq!(matches_text(&e, query), expected);
    }

    #[test]
    fn test_keywords_drop_short_words() {
        assert_eq!(keywords("AI in the Gulf"), vec!["the", "gulf"]);
    }

    #[test]
    fn test_date_range_uses_overlap() {
        let range = DateRange::new(d("2025-01-06"), d("2025-01-12"), DateField::StartDate);
        let criteria = Criteria {
            date_range: Some(range),
            ..Criteria::default()
        };
        let spanning = event("e1", "Spanning", "2025-01-10", Some("2025-01-20"));
        let after = event("e2", "After", "2025-01-13", None);
        let before = event("e3", "Before", "2024-12-30", Some("2025-01-06"));
        assert!(passes_filters(&spanning, &criteria));
        assert!(!passes_filters(&after, &criteria));
        assert!(passes_filters(&before, &criteria));
    }

    #[test]
    fn test_foreign_date_field_uses_event_dates() {
        let range = DateRange::new(d("2025-01-06"), d("2025-01-12"), DateField::DueDate);
        let criteria = Criteria {
            date_range: Some(range),
            ..Criteria::default()
        };
        let inside = event("e1", "Inside", "2025-01-08", None);
        let outside = event("e2", "Outside", "2025-02-01", None);
        assert!(passes_filters(&inside, &criteria));
        assert!(!passes_filters(&outside, &criteria));
    }

    #[test]
    fn test_status_allow_list_is_case_insensitive() {
        let allowed = vec!["CONFIRMED".to_string()];
        let criteria = Criteria {
            status: &allowed,
            ..Criteria::default()
        };
        assert!(passes_filters(&event("e1", "A", "2025-01-01", None), &criteria));
    }

    #[test]
    fn test_apply_sorts_and_truncates() {
        let records = vec![
            event("e1", "Late", "2025-03-01", None),
            event("e2", "Early", "2025-01-01", None),
            event("e3", "Middle", "2025-02-01", None),
        ];
        let out = apply(
            records,
            &Criteria::default(),
            ("startDate", SortDirection::Asc),
            2,
        );
        assert_eq!(out.total, 3);
        let ids: Vec<&str> = out.records.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e3"]);
    }

    #[test]
    fn test_explicit_sort_overrides_default() {
        let records = vec![
            event("e1", "Alpha", "2025-03-01", None),
            event("e2", "Charlie", "2025-01-01", None),
            event("e3", "Bravo", "2025-02-01", None),
        ];
        let sort = SortBy {
            field: "title".to_string(),
            direction: SortDirection::Desc,
        };
        let criteria = Criteria {
            sort_by: Some(&sort),
            ..Criteria::default()
        };
        let out = apply(records, &criteria, ("startDate", SortDirection::Asc), 10);
        let titles: Vec<&str> = out.records.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Charlie", "Bravo", "Alpha"]);
    }

    #[test]
    fn test_missing_keys_sort_last_in_both_directions() {
        assert_eq!(
            compare_keys(&SortKey::Missing, &SortKey::Rank(1), SortDirection::Desc),
            Ordering::Greater
        );
        assert_eq!(
            compare_keys(&SortKey::Rank(1), &SortKey::Missing, SortDirection::Asc),
            Ordering::Less
        );
    }
}

//! Server-sent events line decoder for streamed completions.
//!
//! Network chunks split frames at arbitrary byte positions. The decoder
//! holds back only the trailing partial line; every complete line is
//! handled as soon as it arrives.

/// A decoded SSE line of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of a `data:` line.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Incremental SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    remainder: Vec<u8>,
}

fn parse_line(line: &[u8]) -> Option<SseFrame> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches('\r');
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        Some(SseFrame::Done)
    } else if data.is_empty() {
        None
    } else {
        Some(SseFrame::Data(data.to_string()))
    }
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk and returns the frames it completes.
    ///
    /// Comments, `event:` lines and blank separators are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.remainder.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.remainder.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.remainder.drain(..=pos).collect();
            if let Some(frame) = parse_line(&line[..line.len() - 1]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let line = std::mem::take(&mut self.remainder);
        parse_line(&line)
    }

    /// Bytes held back waiting for the end of their line.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.remainder.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert_eq!(decoder.pending(), 10);
        let frames = decoder.push(b":1}\n\ndata: [DONE]\n\n");
        assert_eq!(
            frames,
            vec![SseFrame::Data("{\"a\":1}".to_string()), SseFrame::Done]
        );
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(frames, vec![SseFrame::Data("x".to_string())]);
    }

    #[test]
    fn test_multibyte_char_split() {
        let mut decoder = SseDecoder::new();
        let text = "data: caf\u{e9}\n".as_bytes();
        let (a, b) = text.split_at(text.len() - 2);
        assert!(decoder.push(a).is_empty());
        assert_eq!(decoder.push(b), vec![SseFrame::Data("caf\u{e9}".to_string())]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some(SseFrame::Data("tail".to_string())));
        assert_eq!(decoder.finish(), None);
    }
}

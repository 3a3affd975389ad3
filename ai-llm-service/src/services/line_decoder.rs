//! Splits a chunked byte stream into text lines.
//!
//! Both streaming dialects used here are line oriented: Ollama sends NDJSON,
//! OpenAI-compatible servers send SSE `data:` lines. Network chunks do not
//! respect line boundaries, so partial lines are buffered until the next `\n`.

#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every complete, non-blank line.
    ///
    /// Trailing `\r` is stripped so CRLF framing works too.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Returns the buffered remainder once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_split_across_chunks() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"{\"response\":\"He").is_empty());
        let lines = dec.push(b"llo\"}\n{\"response\":\" there\"}\n{\"do");
        assert_eq!(
            lines,
            vec![
                "{\"response\":\"Hello\"}".to_string(),
                "{\"response\":\" there\"}".to_string()
            ]
        );
        assert!(dec.push(b"ne\":true}").is_empty());
        assert_eq!(dec.finish().as_deref(), Some("{\"done\":true}"));
    }

    #[test]
    fn skips_blank_lines_and_strips_cr() {
        let mut dec = LineDecoder::new();
        let lines = dec.push(b"data: a\r\n\r\n: keep-alive\r\ndata: b\r\n");
        assert_eq!(lines, vec!["data: a", ": keep-alive", "data: b"]);
        assert_eq!(dec.finish(), None);
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let mut dec = LineDecoder::new();
        let text = "héllo wörld\n".as_bytes();
        let (a, b) = text.split_at(2);
        assert!(dec.push(a).is_empty());
        assert_eq!(dec.push(b), vec!["héllo wörld"]);
    }
}

use bytes::BytesMut;

/// Reassembles complete lines from a byte stream delivered in arbitrary chunks.
///
/// Bytes after the last `\n` are carried over to the next `push`. Lines are
/// only decoded once complete, so a multi-byte character split across two
/// chunks is never mangled.
#[derive(Debug)]
pub struct LineBuffer {
    carry: BytesMut,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            carry: BytesMut::with_capacity(8192),
        }
    }

    /// Appends a chunk and returns every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = memchr::memchr(b'\n', &self.carry) {
            let raw = self.carry.split_to(pos + 1);
            lines.push(decode_line(&raw[..pos]));
        }
        lines
    }

    /// Flushes the trailing partial line once the input has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let raw = self.carry.split();
        #[cfg(debug_assertions)]
        log::debug!("line buffer remain: {}", String::from_utf8_lossy(&raw));
        Some(decode_line(&raw))
    }

    /// Number of bytes waiting for their line terminator.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_is_carried() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: {\"type\":").is_empty());
        assert_eq!(buffer.pending(), 14);

        let lines = buffer.push(b"\"x\"}\n\ndata: next");
        assert_eq!(lines, vec!["data: {\"type\":\"x\"}".to_string(), String::new()]);
        assert_eq!(buffer.finish().as_deref(), Some("data: next"));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_crlf_terminators_are_stripped() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"event: chunk\r\ndata: \"hi\"\r\n\r\n");
        assert_eq!(lines, vec!["event: chunk", "data: \"hi\"", ""]);
    }

    #[test]
    fn test_split_multibyte_character() {
        let text = "data: \"café\"\n".as_bytes();
        // split inside the two-byte 'é'
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(&text[..split]).is_empty());
        assert_eq!(buffer.push(&text[split..]), vec!["data: \"café\""]);
    }
}

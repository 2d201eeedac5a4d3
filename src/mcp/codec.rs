//! Line codec for the MCP stdio transport.
//!
//! One JSON-RPC message (or batch) per line, UTF-8, terminated by `\n`.
//! Messages must not contain embedded newlines.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default cap on one inbound line, newline excluded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// One decoded inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(Value),
    /// The line was not valid JSON; answered with a parse error.
    Malformed(String),
}

/// Read the next non-blank line.
///
/// Returns `None` on clean EOF. A line longer than `max_line_bytes` is a
/// fatal `InvalidData` error.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_line_bytes: usize,
) -> std::io::Result<Option<Frame>> {
    loop {
        buf.clear();
        let limit = max_line_bytes as u64 + 1;
        let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        if n == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        } else if buf.len() > max_line_bytes {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Line too large: exceeds {} bytes", max_line_bytes),
            ));
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        return Ok(Some(match serde_json::from_slice(buf) {
            Ok(value) => Frame::Message(value),
            Err(e) => Frame::Malformed(e.to_string()),
        }));
    }
}

/// Write one message followed by a newline and flush.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    async fn frames(input: &[u8], max: usize) -> std::io::Result<Vec<Frame>> {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        while let Some(frame) = read_frame(&mut reader, &mut buf, max).await? {
            out.push(frame);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_reads_lines_and_skips_blanks() {
        let input = b"{\"a\":1}\n\n  \r\n{\"b\":2}\r\n[1,2]";
        let out = frames(input, 1024).await.unwrap();
        assert_eq!(
            out,
            vec![
                Frame::Message(json!({"a": 1})),
                Frame::Message(json!({"b": 2})),
                Frame::Message(json!([1, 2])),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_line_is_not_fatal() {
        let out = frames(b"{nope\n{\"ok\":true}\n", 1024).await.unwrap();
        assert!(matches!(out[0], Frame::Malformed(_)));
        assert_eq!(out[1], Frame::Message(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_oversized_line_is_rejected() {
        let line = format!("\"{}\"\n", "x".repeat(64));
        let err = frames(line.as_bytes(), 16).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_accepted() {
        // 8 bytes of JSON plus newline with an 8-byte limit.
        let out = frames(b"\"abcdef\"\n", 8).await.unwrap();
        assert_eq!(out, vec![Frame::Message(json!("abcdef"))]);
    }

    #[tokio::test]
    async fn test_write_frame_appends_newline() {
        let mut out = Vec::new();
        write_frame(&mut out, &json!({"jsonrpc": "2.0", "id": 1, "result": {}})).await.unwrap();
        assert_eq!(out.last(), Some(&b'\n'));
        assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 1);
    }
}

//! Turns a streaming HTTP response into text fragments.
//!
//! Every supported backend streams newline-delimited records (SSE `data:`
//! lines or NDJSON objects). The framing is shared here; each adapter only
//! supplies a [`LineParser`] for a single record.

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::RequestBuilder;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::FragmentStream;
use super::http::{self, Target};
use crate::error::ChatError;

/// What a single line of the response body means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Text(String),
    /// Keep-alives, comments, role-only deltas and the like.
    Skip,
    /// The server signalled the end of the reply.
    Done,
}

/// Parses one trimmed, non-empty line. `Err` carries a decode diagnostic.
pub type LineParser = fn(&str) -> Result<LineEvent, String>;

/// Longest line accepted before the response is treated as malformed.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Byte buffer that yields complete lines as chunks arrive.
///
/// Lines are split on raw bytes, so a multi-byte character cut across two
/// chunks is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &Bytes) {
        self.buffer.extend_from_slice(chunk);
    }

    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        Some(line)
    }

    /// Bytes held for a line whose newline has not arrived. Only meaningful
    /// once [`next_line`](Self::next_line) has returned `None`.
    pub fn partial_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whatever is left after the body ends without a final newline.
    pub fn take_rest(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

fn decode_line(target: &Target, line: &[u8], parse: LineParser) -> Result<LineEvent, ChatError> {
    let line = std::str::from_utf8(line).map_err(|e| {
        ChatError::Unexpected(format!("Invalid UTF-8 in {} response: {e}", target.service))
    })?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineEvent::Skip);
    }

    match parse(line) {
        Ok(LineEvent::Text(text)) if text.is_empty() => Ok(LineEvent::Skip),
        Ok(event) => Ok(event),
        Err(e) => Err(ChatError::Unexpected(format!(
            "Failed to decode {} response: {e}\n{line}",
            target.service
        ))),
    }
}

/// Sends `request` and streams the parsed fragments.
///
/// Nothing happens until the stream is first polled. A line longer than
/// [`MAX_LINE_BYTES`] is an error. The stream ends after the first error, at the server's end marker, when the body ends, or as
/// soon as `cancel` fires; on cancellation the response is dropped, which
/// closes the connection.
pub fn fragment_stream(
    target: Target,
    request: RequestBuilder,
    cancel: CancellationToken,
    parse: LineParser,
) -> FragmentStream {
    Box::pin(async_stream::stream! {
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            sent = http::send(&target, request) => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut body = std::pin::pin!(response.bytes_stream());
        let mut lines = LineBuffer::default();

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(target.classify(&e));
                    return;
                }
            };
            trace!(bytes = chunk.len(), "response chunk");
            lines.push(&chunk);

            while let Some(line) = lines.next_line() {
                match decode_line(&target, &line, parse) {
                    Ok(LineEvent::Text(text)) => yield Ok(text),
                    Ok(LineEvent::Skip) => {}
                    Ok(LineEvent::Done) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if lines.partial_len() > MAX_LINE_BYTES {
                yield Err(ChatError::Unexpected(format!(
                    "{} response line exceeds {MAX_LINE_BYTES} bytes",
                    target.service
                )));
                return;
            }
        }

        if let Some(line) = lines.take_rest() {
            match decode_line(&target, &line, parse) {
                Ok(LineEvent::Text(text)) => yield Ok(text),
                Ok(LineEvent::Skip | LineEvent::Done) => {}
                Err(e) => yield Err(e),
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Service;
    use crate::error::ErrorKind;
    use crate::provider::ollama::parse_ndjson_line;
    use crate::provider::openai::parse_sse_line;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    fn target() -> Target {
        Target {
            service: Service::OpenAI,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    fn echo(line: &str) -> Result<LineEvent, String> {
        match line {
            "[DONE]" => Ok(LineEvent::Done),
            "bad" => Err("not a record".to_string()),
            "empty" => Ok(LineEvent::Text(String::new())),
            other => Ok(LineEvent::Text(other.to_string())),
        }
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut lines = LineBuffer::default();
        lines.push(&Bytes::from_static(b"data: a\nda"));
        assert_eq!(lines.next_line(), Some(b"data: a".to_vec()));
        assert_eq!(lines.next_line(), None);

        lines.push(&Bytes::from_static(b"ta: b\n\n"));
        assert_eq!(lines.next_line(), Some(b"data: b".to_vec()));
        assert_eq!(lines.next_line(), Some(Vec::new()));
        assert_eq!(lines.take_rest(), None);
    }

    #[test]
    fn test_line_buffer_keeps_split_utf8() {
        let text = "こんにちは\n".as_bytes();
        let mut lines = LineBuffer::default();
        lines.push(&Bytes::copy_from_slice(&text[..4]));
        assert_eq!(lines.next_line(), None);
        lines.push(&Bytes::copy_from_slice(&text[4..]));
        let line = lines.next_line().unwrap();
        assert_eq!(String::from_utf8(line).unwrap(), "こんにちは");
    }

    #[test]
    fn test_line_buffer_trailing_line() {
        let mut lines = LineBuffer::default();
        lines.push(&Bytes::from_static(b"{\"done\":true}"));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.take_rest(), Some(b"{\"done\":true}".to_vec()));
    }

    #[test]
    fn test_decode_line_trims_and_skips_blank() {
        assert_eq!(
            decode_line(&target(), b"  hi\r", echo),
            Ok(LineEvent::Text("hi".to_string()))
        );
        assert_eq!(decode_line(&target(), b"   ", echo), Ok(LineEvent::Skip));
    }

    #[test]
    fn test_decode_line_drops_empty_text() {
        assert_eq!(decode_line(&target(), b"empty", echo), Ok(LineEvent::Skip));
    }

    #[test]
    fn test_decode_failure_is_unexpected() {
        let err = decode_line(&target(), b"bad", echo).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn test_invalid_utf8_is_unexpected() {
        let err = decode_line(&target(), &[0xff, 0xfe], echo).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn test_partial_len_counts_unterminated_line() {
        let mut lines = LineBuffer::default();
        lines.push(&Bytes::from_static(b"data: a\ndata: partial"));
        assert!(lines.next_line().is_some());
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.partial_len(), b"data: partial".len());
    }

    #[tokio::test]
    async fn test_cancelled_before_poll_yields_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = reqwest::Client::new();
        let request = client.post(target().endpoint);

        let mut stream = fragment_stream(target(), request, cancel, echo);

        assert!(stream.next().await.is_none());
    }

    const SSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/event-stream\r\n\
        Connection: close\r\n\r\n";

    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
    }

    /// Serves one connection with `response`, then closes it.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/v1/chat/completions")
    }

    fn local_target(endpoint: &str) -> Target {
        Target {
            service: Service::OpenAI,
            endpoint: endpoint.to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    async fn collect(endpoint: &str, parse: LineParser) -> Vec<Result<String, ChatError>> {
        let request = reqwest::Client::new().get(endpoint);
        fragment_stream(local_target(endpoint), request, CancellationToken::new(), parse)
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_sse_body_drops_empty_deltas_and_stops_at_done() {
        let body = [
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":""}}]}"#,
            "",
            ": keep-alive",
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
            "",
            "data: [DONE]",
            "",
            r#"data: {"choices":[{"delta":{"content":"after done"}}]}"#,
            "",
        ]
        .join("\n");
        let endpoint = serve_once(format!("{SSE_HEAD}{body}")).await;

        let fragments = collect(&endpoint, parse_sse_line).await;

        assert_eq!(fragments, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
    }

    #[tokio::test]
    async fn test_ndjson_body_stops_at_done_record() {
        let body = [
            r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":false}"#,
            r#"{"message":{"role":"assistant","content":"lo"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
            r#"{"message":{"role":"assistant","content":"late"},"done":false}"#,
        ]
        .join("\n");
        let endpoint = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\n\
             Connection: close\r\n\r\n{body}\n"
        ))
        .await;

        let fragments = collect(&endpoint, parse_ndjson_line).await;

        assert_eq!(fragments, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
    }

    #[tokio::test]
    async fn test_unauthorized_status_is_transport() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        let endpoint = serve_once(format!(
            "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ))
        .await;

        let fragments = collect(&endpoint, parse_sse_line).await;

        assert_eq!(fragments.len(), 1);
        let err = fragments[0].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn test_oversized_line_is_unexpected() {
        let endpoint = serve_once(format!(
            "{SSE_HEAD}data: {}",
            "x".repeat(MAX_LINE_BYTES + 1)
        ))
        .await;

        let fragments = collect(&endpoint, parse_sse_line).await;

        assert_eq!(fragments.len(), 1);
        let err = fragments[0].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[tokio::test]
    async fn test_cancel_mid_body_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
        let (closed_tx, closed_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let first = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
            socket
                .write_all(format!("{SSE_HEAD}{first}\n\n").as_bytes())
                .await
                .unwrap();
            // Stall until the client hangs up.
            let mut buf = [0u8; 64];
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
            let _ = closed_tx.send(());
        });

        let cancel = CancellationToken::new();
        let request = reqwest::Client::new().get(&endpoint);
        let mut stream =
            fragment_stream(local_target(&endpoint), request, cancel.clone(), parse_sse_line);

        assert_eq!(stream.next().await, Some(Ok("Hel".to_string())));
        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(2), stream.next()).await;
        assert_eq!(next.unwrap(), None);

        tokio::time::timeout(Duration::from_secs(2), closed_rx)
            .await
            .unwrap()
            .unwrap();
    }
}

//! Server-Sent Events (SSE) support.
//!
//! Upstream providers stream SSE; the gateway re-frames their tokens into
//! its own `data: {"content": ...}` events and ends with `data: [DONE]`.
//! A failure mid-stream ends the body without a trailer.

use crate::api::models::StreamToken;
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::services::llm_client::{ProviderClient, StreamEvent};
use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::stream::StreamExt;
use std::convert::Infallible;

/// SSE event parsed from stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: Option<String>,
}

/// Incremental SSE parser.
///
/// Bytes are buffered until an event boundary, so events (and multi-byte
/// characters) split across network chunks are reassembled intact.
pub struct SseParser {
    buffer: Vec<u8>,
    /// Bytes before this offset are known to hold no separator.
    scan_from: usize,
}

/// Blank-line separators for `\r\n`, `\n` and `\r` line endings, mixed
/// or not. Longer forms are tried first at each position.
const SEPARATORS: [&[u8]; 5] = [b"\r\n\r\n", b"\r\n\n", b"\n\r\n", b"\n\n", b"\r\r"];

/// Longest separator minus one: how far a separator can straddle chunks.
const MAX_STRADDLE: usize = 3;

impl SseParser {
    pub fn new() -> Self {
        SseParser {
            buffer: Vec::new(),
            scan_from: 0,
        }
    }

    /// Parse incoming bytes and return complete events.
    pub fn parse(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let from = self.scan_from.saturating_sub(MAX_STRADDLE);
        let mut next = find_boundary(&self.buffer, from);
        while let Some((end, boundary_len)) = next {
            let block: Vec<u8> = self.buffer.drain(..end + boundary_len).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block[..end])) {
                events.push(event);
            }
            next = find_boundary(&self.buffer, 0);
        }
        self.scan_from = self.buffer.len();
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.scan_from = 0;
        if self.buffer.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.buffer);
        parse_block(&String::from_utf8_lossy(&block))
    }

    /// Get remaining buffer content.
    pub fn remaining(&self) -> &[u8] {
        &self.buffer
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Position and length of the first blank-line separator at or after `from`.
fn find_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buf.len()).find_map(|i| {
        SEPARATORS
            .iter()
            .find(|sep| buf[i..].starts_with(sep))
            .map(|sep| (i, sep.len()))
    })
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = SseEvent::default();

    for line in block.split(['\r', '\n']) {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => match event.data {
                Some(ref mut data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => event.data = Some(value.to_string()),
            },
            _ => {}
        }
    }

    (event.data.is_some() || event.event.is_some()).then_some(event)
}

/// Format a simple data-only SSE event.
pub fn format_sse_data(data: &str) -> String {
    format!("data: {}\n\n", data)
}

/// Format the SSE done marker.
pub fn format_sse_done() -> String {
    "data: [DONE]\n\n".to_string()
}

fn token_event(content: String) -> Bytes {
    let payload = serde_json::to_string(&StreamToken { content })
        .unwrap_or_else(|_| "{\"content\":\"\"}".to_string());
    Bytes::from(format_sse_data(&payload))
}

/// Relay an upstream SSE response to the client, token by token.
///
/// # Arguments
///
/// * `response` - Successful streaming response from the provider
/// * `client` - The provider client, used to decode upstream events
pub fn create_sse_stream(response: reqwest::Response, client: ProviderClient) -> Response {
    let request_id = get_request_id();
    let provider = client.kind();

    let body_stream = async_stream::stream! {
        let mut upstream = response.bytes_stream();
        let mut parser = SseParser::new();
        let mut relayed: u64 = 0;
        let mut done = false;

        while !done {
            let events = match upstream.next().await {
                Some(Ok(bytes)) => parser.parse(&bytes),
                Some(Err(e)) => {
                    tracing::error!(
                        request_id = %request_id,
                        provider = %provider,
                        error = %e,
                        "Upstream stream failed"
                    );
                    get_metrics()
                        .upstream_errors
                        .with_label_values(&[provider.as_str(), "stream"])
                        .inc();
                    return;
                }
                None => {
                    done = true;
                    parser.finish().into_iter().collect()
                }
            };

            for event in events {
                let Some(data) = event.data else { continue };
                match client.stream_event(&data) {
                    StreamEvent::Token(token) => {
                        relayed += 1;
                        yield Ok::<Bytes, Infallible>(token_event(token));
                    }
                    StreamEvent::Done => {
                        done = true;
                        break;
                    }
                    StreamEvent::Skip => {}
                    StreamEvent::Error(message) => {
                        tracing::error!(
                            request_id = %request_id,
                            provider = %provider,
                            error = %message,
                            "Provider reported an error mid-stream"
                        );
                        get_metrics()
                            .upstream_errors
                            .with_label_values(&[provider.as_str(), "stream"])
                            .inc();
                        return;
                    }
                }
            }
        }

        get_metrics()
            .streamed_tokens
            .with_label_values(&[provider.as_str()])
            .inc_by(relayed);
        tracing::debug!(
            request_id = %request_id,
            provider = %provider,
            tokens = relayed,
            "Stream completed"
        );
        yield Ok(Bytes::from(format_sse_done()));
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body_stream),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_event() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"data: {\"a\":1}\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: None,
                data: Some("{\"a\":1}".to_string())
            }]
        );
        assert!(parser.remaining().is_empty());
    }

    #[test]
    fn test_parse_event_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.parse(b"data: {\"content\":").is_empty());
        assert!(parser.parse(b"\"hel").is_empty());
        let events = parser.parse(b"lo\"}\n\ndata: [DONE]\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data.as_deref(), Some("{\"content\":\"hello\"}"));
        assert_eq!(events[1].data.as_deref(), Some("[DONE]"));
    }

    #[test]
    fn test_parse_multibyte_split() {
        let text = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut parser = SseParser::new();
        assert!(parser.parse(&text[..split]).is_empty());
        let events = parser.parse(&text[split..]);
        assert_eq!(events[0].data.as_deref(), Some("héllo"));
    }

    #[test]
    fn test_parse_crlf_and_comments() {
        let mut parser = SseParser::new();
        let events = parser.parse(b": keep-alive\r\n\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("message".to_string()),
                data: Some("x".to_string())
            }]
        );
    }

    #[test]
    fn test_parse_mixed_line_endings() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"data: a\n\r\ndata: b\r\rdata: c\r\n\ndata: d\n\n");
        let data: Vec<_> = events.iter().filter_map(|e| e.data.as_deref()).collect();
        assert_eq!(data, vec!["a", "b", "c", "d"]);
        assert!(parser.remaining().is_empty());
    }

    #[test]
    fn test_parse_bare_cr_lines() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"event: message\rdata: x\rdata: y\r\r");
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("message".to_string()),
                data: Some("x\ny".to_string())
            }]
        );
    }

    #[test]
    fn test_separator_split_byte_by_byte() {
        let stream = b"data: one\r\n\r\ndata: two\n\r\n";
        let mut parser = SseParser::new();
        let mut data = Vec::new();
        for byte in stream.iter() {
            for event in parser.parse(std::slice::from_ref(byte)) {
                data.extend(event.data);
            }
        }
        assert_eq!(data, vec!["one".to_string(), "two".to_string()]);
        assert!(parser.remaining().is_empty());
    }

    #[test]
    fn test_parse_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data.as_deref(), Some("line1\nline2"));
    }

    #[test]
    fn test_finish_flushes_trailing_event() {
        let mut parser = SseParser::new();
        assert!(parser.parse(b"data: tail").is_empty());
        assert_eq!(parser.finish().unwrap().data.as_deref(), Some("tail"));
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_sse_data("{}"), "data: {}\n\n");
        assert_eq!(format_sse_done(), "data: [DONE]\n\n");
    }

    #[test]
    fn test_token_event_escapes_json() {
        let bytes = token_event("say \"hi\"\n".to_string());
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "data: {\"content\":\"say \\\"hi\\\"\\n\"}\n\n"
        );
    }
}

//! Incremental decoding of streamed chat completions.
//!
//! Both providers stream line-oriented bodies: OpenAI-compatible APIs send
//! Server-Sent Events (`data: {json}` … `data: [DONE]`), Ollama sends one JSON
//! object per line. Bytes arrive in arbitrary chunks, so [`LineBuffer`] keeps
//! the unfinished tail between chunks and only complete lines are parsed.

use futures::StreamExt;
use serde::Deserialize;

use crate::chat::TextStream;
use crate::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};

/// Result of parsing one complete line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamEvent {
    Delta(String),
    Done,
    Skip,
}

/// Splits a byte stream into `\n`-terminated lines (a trailing `\r` is dropped).
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Appends `chunk` and drains every line completed by it.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, ProviderErrorKind> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(decode_utf8(line)?);
        }
        Ok(lines)
    }

    /// Returns the unterminated remainder, if any, once the body has ended.
    pub(crate) fn finish(&mut self) -> Result<Option<String>, ProviderErrorKind> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let rest = std::mem::take(&mut self.buf);
        decode_utf8(rest).map(Some)
    }
}

fn decode_utf8(bytes: Vec<u8>) -> Result<String, ProviderErrorKind> {
    String::from_utf8(bytes)
        .map_err(|e| ProviderErrorKind::Decode(format!("stream is not valid UTF-8: {e}")))
}

#[derive(Debug, Deserialize)]
struct SseChunk {
    #[serde(default)]
    choices: Vec<SseChoice>,
    error: Option<SseError>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    #[serde(default)]
    delta: SseDelta,
}

#[derive(Debug, Default, Deserialize)]
struct SseDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseError {
    message: String,
}

/// Parses one line of an OpenAI-compatible SSE body.
pub(crate) fn parse_openai_sse_line(line: &str) -> Result<StreamEvent, ProviderErrorKind> {
    let Some(payload) = line.strip_prefix("data:") else {
        // blank separators, `event:`/`id:` fields and `:` comments
        return Ok(StreamEvent::Skip);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(StreamEvent::Done);
    }
    if payload.is_empty() {
        return Ok(StreamEvent::Skip);
    }

    let chunk: SseChunk = serde_json::from_str(payload)
        .map_err(|e| ProviderErrorKind::Decode(format!("bad SSE frame: {e}")))?;
    if let Some(err) = chunk.error {
        return Err(ProviderErrorKind::Decode(format!("stream error: {}", err.message)));
    }
    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();
    Ok(if text.is_empty() {
        StreamEvent::Skip
    } else {
        StreamEvent::Delta(text)
    })
}

#[derive(Debug, Deserialize)]
struct NdjsonChunk {
    message: Option<NdjsonMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NdjsonMessage {
    #[serde(default)]
    content: String,
}

/// Parses one line of an Ollama `/api/chat` streaming body.
pub(crate) fn parse_ollama_ndjson_line(line: &str) -> Result<StreamEvent, ProviderErrorKind> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(StreamEvent::Skip);
    }
    let chunk: NdjsonChunk = serde_json::from_str(line)
        .map_err(|e| ProviderErrorKind::Decode(format!("bad NDJSON line: {e}")))?;
    if let Some(err) = chunk.error {
        return Err(ProviderErrorKind::Decode(format!("stream error: {err}")));
    }
    match chunk.message {
        Some(m) if !m.content.is_empty() => Ok(StreamEvent::Delta(m.content)),
        _ if chunk.done => Ok(StreamEvent::Done),
        _ => Ok(StreamEvent::Skip),
    }
}

/// Turns a successful streaming response into a [`TextStream`].
///
/// The stream ends at the provider's terminator (or at end of body) and
/// fails with `EmptyChoices` if no fragment was produced at all. Dropping the
/// stream drops the response body, which closes the upstream connection.
pub(crate) fn decode_text_stream(
    provider: Provider,
    resp: reqwest::Response,
    parse: fn(&str) -> Result<StreamEvent, ProviderErrorKind>,
) -> TextStream {
    let wrap = move |kind: ProviderErrorKind| AiLlmError::from(ProviderError::new(provider, kind));

    Box::pin(async_stream::try_stream! {
        let mut body = resp.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut produced = false;
        let mut finished = false;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(AiLlmError::from)?;
            for line in lines.push(&chunk).map_err(wrap)? {
                match parse(&line).map_err(wrap)? {
                    StreamEvent::Delta(text) => {
                        produced = true;
                        yield text;
                    }
                    StreamEvent::Done => {
                        finished = true;
                        break;
                    }
                    StreamEvent::Skip => {}
                }
            }
            if finished {
                break;
            }
        }

        if !finished {
            if let Some(line) = lines.finish().map_err(wrap)? {
                if let StreamEvent::Delta(text) = parse(&line).map_err(wrap)? {
                    produced = true;
                    yield text;
                }
            }
        }

        if !produced {
            Err::<(), _>(wrap(ProviderErrorKind::EmptyChoices))?;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_joins_split_chunks() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"data: {\"a\"").unwrap().is_empty());
        let lines = buf.push(b":1}\r\n\ndata: [DO").unwrap();
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string(), String::new()]);
        assert!(buf.push(b"NE]").unwrap().is_empty());
        assert_eq!(buf.finish().unwrap().as_deref(), Some("data: [DONE]"));
        assert_eq!(buf.finish().unwrap(), None);
    }

    #[test]
    fn line_buffer_keeps_multibyte_chars_intact() {
        let mut buf = LineBuffer::default();
        let text = "héllo\n".as_bytes();
        assert!(buf.push(&text[..2]).unwrap().is_empty());
        assert_eq!(buf.push(&text[2..]).unwrap(), vec!["héllo".to_string()]);
    }

    #[test]
    fn openai_sse_lines() {
        let delta = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(
            parse_openai_sse_line(delta).unwrap(),
            StreamEvent::Delta("Hel".into())
        );

        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_openai_sse_line(role_only).unwrap(), StreamEvent::Skip);

        assert_eq!(parse_openai_sse_line("data: [DONE]").unwrap(), StreamEvent::Done);
        assert_eq!(parse_openai_sse_line("").unwrap(), StreamEvent::Skip);
        assert_eq!(parse_openai_sse_line(": keep-alive").unwrap(), StreamEvent::Skip);
        assert!(parse_openai_sse_line("data: {not json").is_err());

        let err = r#"data: {"error":{"message":"rate limited"}}"#;
        match parse_openai_sse_line(err) {
            Err(ProviderErrorKind::Decode(msg)) => assert!(msg.contains("rate limited")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ollama_ndjson_lines() {
        let delta = r#"{"message":{"role":"assistant","content":"blue"},"done":false}"#;
        assert_eq!(
            parse_ollama_ndjson_line(delta).unwrap(),
            StreamEvent::Delta("blue".into())
        );

        let done = r#"{"message":{"role":"assistant","content":""},"done":true}"#;
        assert_eq!(parse_ollama_ndjson_line(done).unwrap(), StreamEvent::Done);

        assert!(parse_ollama_ndjson_line(r#"{"error":"model not found"}"#).is_err());
        assert_eq!(parse_ollama_ndjson_line("  ").unwrap(), StreamEvent::Skip);
    }
}

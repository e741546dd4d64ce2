// Response decoding: SSE frame splitting and answer extraction
//
// Both backends stream newline-delimited "data: {...}" frames terminated by a
// "[DONE]" sentinel; the non-streaming path extracts the answer out of a
// single JSON document via a dollar-path expression.

use futures::stream::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::DeltaFragment;

/// End-of-stream sentinel payload
pub(crate) const DONE_SENTINEL: &str = "[DONE]";

/// Accumulates network chunks and yields complete lines.
///
/// Frames may be split across chunks at arbitrary byte positions; lines are
/// returned with trailing CR/LF stripped.
pub(crate) struct SseBuffer {
    buf: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buf.drain(..=pos).collect();
        let mut line = String::from_utf8_lossy(&line_bytes).into_owned();
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

/// Strip the SSE "data:" prefix from a line, if present.
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

// Incremental frame in the OpenAI chunked-streaming convention

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChunkDelta {
    pub content: Option<String>,
}

impl ChatChunk {
    /// Incremental text of the first choice, if any.
    ///
    /// A frame with no choices, or a choice without delta text, carries
    /// nothing to emit.
    pub fn into_delta_text(self) -> Option<String> {
        self.choices.into_iter().next()?.delta.content
    }
}

/// Drive an SSE response to completion, emitting one fragment per delta.
///
/// Fragments are forwarded in arrival order as soon as each frame parses.
/// The "[DONE]" sentinel closes the stream with success. A stream that ends
/// without the sentinel is an error unless `lenient_end` is set (used by
/// backends whose iterator semantics treat exhaustion as completion).
///
/// Failures are returned to the caller rather than sent, so each backend can
/// apply its own error-reporting policy. Cancellation ends the pump cleanly;
/// dropping the response releases the connection.
pub(crate) async fn pump_sse(
    response: reqwest::Response,
    tx: &mpsc::Sender<DeltaFragment>,
    cancel: &CancellationToken,
    lenient_end: bool,
) -> Result<(), String> {
    let mut stream = response.bytes_stream();
    let mut buf = SseBuffer::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("stream cancelled, dropping connection");
                return Ok(());
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                buf.push(&bytes);
                while let Some(line) = buf.next_line() {
                    let Some(payload) = data_payload(&line) else {
                        continue;
                    };
                    if payload == DONE_SENTINEL {
                        let _ = tx.send(DeltaFragment::Done).await;
                        return Ok(());
                    }
                    let frame: ChatChunk = serde_json::from_str(payload)
                        .map_err(|e| format!("malformed stream frame: {e}"))?;
                    if let Some(text) = frame.into_delta_text() {
                        if tx.send(DeltaFragment::Text(text)).await.is_err() {
                            // Receiver dropped, stop streaming
                            return Ok(());
                        }
                    }
                }
            }
            Some(Err(e)) => return Err(format!("stream read failed: {e}")),
            None => {
                if lenient_end {
                    let _ = tx.send(DeltaFragment::Done).await;
                    return Ok(());
                }
                return Err("incomplete stream".to_string());
            }
        }
    }
}

/// Evaluate an extraction path like "$.choices[0].message.content" against a
/// JSON document.
///
/// Strings are returned verbatim; other scalars are rendered with their JSON
/// representation; a miss (or an explicit null) yields `None`.
pub(crate) fn extract_path(root: &Value, path: &str) -> Option<String> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let mut current = root;

    for part in path.split('.').filter(|p| !p.is_empty()) {
        let (name, indexes) = split_indexes(part)?;
        if !name.is_empty() {
            current = current.get(name)?;
        }
        for index in indexes {
            current = current.get(index)?;
        }
    }

    match current {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Split "choices[0]" into ("choices", [0]); bare names have no indexes.
fn split_indexes(part: &str) -> Option<(&str, Vec<usize>)> {
    let Some(pos) = part.find('[') else {
        return Some((part, Vec::new()));
    };

    let name = &part[..pos];
    let mut indexes = Vec::new();
    for segment in part[pos..].split('[').filter(|s| !s.is_empty()) {
        let segment = segment.strip_suffix(']')?;
        indexes.push(segment.parse().ok()?);
    }
    Some((name, indexes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sse_buffer_handles_split_frames() {
        let mut buf = SseBuffer::new();
        buf.push(b"data: {\"a\":");
        assert_eq!(buf.next_line(), None);

        buf.push(b"1}\r\ndata: [DO");
        assert_eq!(buf.next_line(), Some("data: {\"a\":1}".to_string()));
        assert_eq!(buf.next_line(), None);

        buf.push(b"NE]\n");
        assert_eq!(buf.next_line(), Some("data: [DONE]".to_string()));
        assert_eq!(buf.next_line(), None);
    }

    #[test]
    fn test_data_payload() {
        assert_eq!(data_payload("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(data_payload("data:[DONE]"), Some("[DONE]"));
        assert_eq!(data_payload("event: ping"), None);
        assert_eq!(data_payload(""), None);
    }

    #[test]
    fn test_chunk_delta_text() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.into_delta_text(), Some("Hel".to_string()));
    }

    #[test]
    fn test_chunk_with_no_choices_yields_nothing() {
        let chunk: ChatChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chunk.into_delta_text(), None);

        let chunk: ChatChunk = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(chunk.into_delta_text(), None);
    }

    #[test]
    fn test_chunk_with_null_delta_yields_nothing() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":null}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.into_delta_text(), None);

        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{}}]}"#).unwrap();
        assert_eq!(chunk.into_delta_text(), None);
    }

    #[test]
    fn test_extract_path_simple() {
        let doc = json!({"answer": "hi there"});
        assert_eq!(
            extract_path(&doc, "$.answer"),
            Some("hi there".to_string())
        );
    }

    #[test]
    fn test_extract_path_nested_with_index() {
        let doc = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "42"}}
            ]
        });
        assert_eq!(
            extract_path(&doc, "$.choices[0].message.content"),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_extract_path_miss_is_none() {
        let doc = json!({"answer": "hi"});
        assert_eq!(extract_path(&doc, "$.reply"), None);
        assert_eq!(extract_path(&doc, "$.answer[3]"), None);
        assert_eq!(extract_path(&doc, "$.a.b.c"), None);
    }

    #[test]
    fn test_extract_path_non_string_scalar() {
        let doc = json!({"count": 7});
        assert_eq!(extract_path(&doc, "$.count"), Some("7".to_string()));
    }

    #[test]
    fn test_extract_path_null_is_none() {
        let doc = json!({"answer": null});
        assert_eq!(extract_path(&doc, "$.answer"), None);
    }
}

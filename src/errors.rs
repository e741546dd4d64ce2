// Uniform error taxonomy for the streaming client
//
// Configuration errors surface synchronously from `stream()`; transport and
// decode failures arrive in-band as the terminal fragment of the stream.
// Cancellation is a clean early termination, never an error fragment.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Bad or missing configuration, detected before any network activity
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connection failure, timeout, or non-success HTTP status
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed response body or stream frame
    #[error("decode error: {0}")]
    Decode(String),

    /// The caller cancelled the stream handle
    #[error("request cancelled")]
    Cancelled,
}

/// Translate an in-band terminal message back into a structured error.
///
/// Some backends report failures as free-form text ("Error: ...") rather than
/// structured errors. This classifies the message so callers that need an
/// error kind can recover one instead of matching on strings themselves.
pub fn parse_inband(message: &str) -> LlmError {
    let msg = message
        .strip_prefix("Error: ")
        .or_else(|| message.strip_prefix("error. "))
        .unwrap_or(message);

    // The adapters produce fixed message prefixes; match on those rather
    // than scanning the whole message, which may quote arbitrary upstream
    // body text.
    if msg.starts_with("malformed") || msg.starts_with("incomplete stream") {
        LlmError::Decode(msg.to_string())
    } else {
        LlmError::Transport(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inband_prefix_stripped() {
        let err = parse_inband("Error: connection refused");
        match err {
            LlmError::Transport(msg) => assert_eq!(msg, "connection refused"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_inband_decode_classification() {
        assert!(matches!(parse_inband("incomplete stream"), LlmError::Decode(_)));
        assert!(matches!(
            parse_inband("malformed response body: expected value at line 1"),
            LlmError::Decode(_)
        ));
    }

    #[test]
    fn test_inband_transport_classification() {
        assert!(matches!(
            parse_inband("request failed with status 500 Internal Server Error"),
            LlmError::Transport(_)
        ));
    }

    #[test]
    fn test_inband_quoted_body_does_not_flip_class() {
        // A status-error message quoting upstream body text stays transport,
        // even when that text mentions decode-sounding words
        assert!(matches!(
            parse_inband("request failed with status 500: upstream json parser expected value"),
            LlmError::Transport(_)
        ));
        assert!(matches!(
            parse_inband("stream read failed: connection reset while parsing json"),
            LlmError::Transport(_)
        ));
    }
}

// Message model and streaming surface shared by all backends

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::LlmError;

/// Role of one chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat turn. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// An ordered conversation snapshot handed to a provider.
///
/// Turn order is dialogue order and is preserved end-to-end. The request is
/// owned by the call that constructs it and is not mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct ConversationRequest {
    turns: Vec<ChatTurn>,
}

impl ConversationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<ChatTurn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn::new(role, content));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// One unit of incremental output, or the stream's terminal marker.
///
/// Every stream yields zero or more `Text` fragments followed by exactly one
/// of `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaFragment {
    Text(String),
    Done,
    Error(String),
}

/// The live, cancellable representation of one in-flight streaming call.
///
/// Fragments arrive in emission order. After the terminal fragment has been
/// returned (or the handle was cancelled), `next()` returns `None` forever;
/// a handle is never reused.
pub struct StreamHandle {
    rx: mpsc::Receiver<DeltaFragment>,
    cancel: CancellationToken,
    finished: bool,
}

impl StreamHandle {
    pub(crate) fn new(rx: mpsc::Receiver<DeltaFragment>, cancel: CancellationToken) -> Self {
        Self {
            rx,
            cancel,
            finished: false,
        }
    }

    /// Degenerate single-fragment stream: one text fragment, then success.
    ///
    /// Used for answers that arrive as a single complete body rather than a
    /// live stream; same contract, sequence of length one.
    pub(crate) fn once(text: String) -> Self {
        let (tx, rx) = mpsc::channel(2);
        // Capacity two, so both sends complete without a consumer
        let _ = tx.try_send(DeltaFragment::Text(text));
        let _ = tx.try_send(DeltaFragment::Done);
        Self::new(rx, CancellationToken::new())
    }

    /// Await the next fragment.
    ///
    /// Yields the terminal exactly once, then `None`. A cancelled handle
    /// delivers nothing further, including fragments already buffered.
    pub async fn next(&mut self) -> Option<DeltaFragment> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.finished = true;
            return None;
        }

        match self.rx.recv().await {
            Some(fragment @ DeltaFragment::Text(_)) => {
                if self.cancel.is_cancelled() {
                    self.finished = true;
                    return None;
                }
                Some(fragment)
            }
            Some(terminal) => {
                self.finished = true;
                Some(terminal)
            }
            None => {
                // Producer went away. Cancellation is a clean end; anything
                // else means the stream closed without its terminal marker.
                self.finished = true;
                if self.cancel.is_cancelled() {
                    None
                } else {
                    Some(DeltaFragment::Error(
                        "stream closed before completion".to_string(),
                    ))
                }
            }
        }
    }

    /// Cooperatively cancel the stream and release the connection.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain the stream and concatenate all text fragments.
    ///
    /// An error terminal is translated back into a structured error.
    pub async fn collect_text(&mut self) -> Result<String, LlmError> {
        let mut out = String::new();
        while let Some(fragment) = self.next().await {
            match fragment {
                DeltaFragment::Text(text) => out.push_str(&text),
                DeltaFragment::Done => return Ok(out),
                DeltaFragment::Error(message) => {
                    return Err(crate::errors::parse_inband(&message))
                }
            }
        }
        if self.cancel.is_cancelled() {
            Err(LlmError::Cancelled)
        } else {
            Ok(out)
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        // Dropping the handle releases the producer's connection
        self.cancel.cancel();
    }
}

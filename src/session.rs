// Session adapter
//
// Bridges a live, UI-owned chat session to the immutable conversation
// snapshot that providers consume.

use crate::providers::types::{ChatTurn, ConversationRequest, Role};

/// A growing conversation owned by the caller.
///
/// Unlike a `ConversationRequest`, a session keeps mutating as the dialogue
/// continues; `snapshot()` copies the turns so an in-flight request can never
/// observe later edits.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one turn to the live history.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn::new(role, content));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Copy the current history into an immutable request.
    pub fn snapshot(&self) -> ConversationRequest {
        ConversationRequest::from_turns(self.turns.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_copies_turns_in_order() {
        let mut session = ChatSession::new();
        session.push(Role::System, "be brief");
        session.push(Role::User, "hi");

        let request = session.snapshot();
        assert_eq!(request.len(), 2);
        assert_eq!(request.turns()[0].role, Role::System);
        assert_eq!(request.turns()[1].content, "hi");
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let mut session = ChatSession::new();
        session.push(Role::User, "question");

        let request = session.snapshot();
        session.push(Role::Assistant, "answer");
        session.push(Role::User, "followup");

        // The snapshot taken earlier is unaffected
        assert_eq!(request.len(), 1);
        assert_eq!(request.turns()[0].content, "question");
        assert_eq!(session.len(), 3);
    }
}

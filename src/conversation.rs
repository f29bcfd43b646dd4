//! Chat turns and the request context built from them.

use std::collections::VecDeque;

use crate::config::Config;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of the request context sent to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// Nothing typed yet.
    Draft,
    /// User text set, not sent.
    Pending,
    /// Sent; assistant text is still arriving.
    InFlight,
    Completed,
    Failed(ErrorKind),
    Cancelled,
}

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    id: u64,
    user_text: String,
    assistant_text: String,
    status: TurnStatus,
}

impl Turn {
    const fn empty(id: u64) -> Self {
        Self {
            id,
            user_text: String::new(),
            assistant_text: String::new(),
            status: TurnStatus::Draft,
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn user_text(&self) -> &str {
        &self.user_text
    }

    pub fn assistant_text(&self) -> &str {
        &self.assistant_text
    }

    pub const fn status(&self) -> TurnStatus {
        self.status
    }

    /// Pending or in flight.
    pub const fn is_active(&self) -> bool {
        matches!(self.status, TurnStatus::Pending | TurnStatus::InFlight)
    }
}

/// Turns, newest first.
///
/// There is always at least one turn, and the newest one is where the next
/// message is typed. At most one turn is pending or in flight.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: VecDeque<Turn>,
    next_id: u64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self {
            turns: VecDeque::from([Turn::empty(0)]),
            next_id: 1,
        }
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn newest(&self) -> &Turn {
        // `turns` is never empty: every mutation keeps or re-adds a turn.
        &self.turns[0]
    }

    /// Turns, newest first.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    /// Adds a fresh draft turn at the front and returns its id.
    pub fn append_empty_turn(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.turns.push_front(Turn::empty(id));
        id
    }

    /// Replaces the text of the newest turn if it has not been sent yet.
    /// Blank text leaves the turn a draft.
    ///
    /// Returns `false` when the newest turn is already in flight or finished.
    pub fn set_pending_user_text(&mut self, text: &str) -> bool {
        let turn = &mut self.turns[0];
        if !matches!(turn.status, TurnStatus::Draft | TurnStatus::Pending) {
            return false;
        }
        text.clone_into(&mut turn.user_text);
        turn.status = if text.trim().is_empty() {
            TurnStatus::Draft
        } else {
            TurnStatus::Pending
        };
        true
    }

    /// Marks the newest turn in flight if it is pending.
    pub fn begin_turn(&mut self) -> Option<u64> {
        if self.active_turn_count() > 1 {
            return None;
        }
        let turn = &mut self.turns[0];
        if turn.status != TurnStatus::Pending {
            return None;
        }
        turn.status = TurnStatus::InFlight;
        Some(turn.id)
    }

    /// Appends a fragment to the in-flight turn `id`.
    ///
    /// Returns `false` if that turn is gone or no longer in flight, in which
    /// case the fragment is dropped.
    pub fn append_assistant_fragment(&mut self, id: u64, text: &str) -> bool {
        match self.get_mut(id) {
            Some(turn) if turn.status == TurnStatus::InFlight => {
                turn.assistant_text.push_str(text);
                true
            }
            _ => false,
        }
    }

    pub fn complete_turn(&mut self, id: u64) -> bool {
        self.finish(id, TurnStatus::Completed)
    }

    /// Marks the turn failed, keeping whatever text already arrived.
    pub fn fail_turn(&mut self, id: u64, kind: ErrorKind) -> bool {
        self.finish(id, TurnStatus::Failed(kind))
    }

    pub fn cancel_turn(&mut self, id: u64) -> bool {
        self.finish(id, TurnStatus::Cancelled)
    }

    fn finish(&mut self, id: u64, status: TurnStatus) -> bool {
        let Some(turn) = self.get_mut(id) else {
            return false;
        };
        if turn.status != TurnStatus::InFlight {
            return false;
        }
        turn.status = status;
        self.append_empty_turn();
        true
    }

    /// Drops every turn and starts over with one empty turn.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.append_empty_turn();
    }

    pub fn active_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_active()).count()
    }

    /// Messages to send for the in-flight turn, oldest first, behind one
    /// system message.
    ///
    /// At most `config.history` conversation messages are included, taken from
    /// the newest turns. The in-flight turn contributes its user message and
    /// each completed turn its assistant reply and user message.
    pub fn build_request_context(&self, config: &Config) -> Vec<ChatMessage> {
        let limit = usize::try_from(config.history).unwrap_or(usize::MAX);
        let mut window = Vec::new();

        'turns: for turn in &self.turns {
            let (first, second) = match turn.status {
                TurnStatus::InFlight => (Some((Role::User, &turn.user_text)), None),
                TurnStatus::Completed => (
                    Some((Role::Assistant, &turn.assistant_text)),
                    Some((Role::User, &turn.user_text)),
                ),
                _ => continue,
            };
            for (role, content) in [first, second].into_iter().flatten() {
                if window.len() >= limit {
                    break 'turns;
                }
                window.push(ChatMessage::new(role, content.as_str()));
            }
        }

        window.push(ChatMessage::new(Role::System, config.system.as_str()));
        window.reverse();
        window
    }
}

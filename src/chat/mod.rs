//! Conversation orchestration and the interactive chat mode.
//!
//! [`ChatSession`] is the engine: it routes input, runs commands and drives
//! streamed turns. [`Repl`] is a terminal front end for it.

mod repl;
/// Classifies raw input into commands and chat text.
pub mod router;
mod session;
mod ui;

pub use repl::{CommandCompleter, Repl};
pub use session::{
    ChatSession, CommandOutcome, Observer, PENDING_SUBTITLE, Phase, ProviderFactory, Suggestion,
    SuggestionKind, TurnOutcome,
};
pub use ui::{mask_key, print_config};

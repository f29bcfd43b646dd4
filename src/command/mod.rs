//! Slash commands: descriptors, fuzzy ranking and the built-in set.

mod builtin;
mod fuzzy;
mod registry;

pub use builtin::DOCS_URL;
pub use fuzzy::levenshtein;
pub use registry::{
    CommandAction, CommandContext, CommandDescriptor, CommandEffect, CommandKind,
    CommandRegistry, Detail,
};

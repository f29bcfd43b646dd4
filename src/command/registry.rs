use indexmap::IndexMap;
use tracing::debug;

use super::fuzzy::levenshtein;
use crate::config::Config;
use crate::error::ChatError;

/// A command body. Receives the current settings snapshot and the trimmed
/// argument, and describes the change to make without performing it.
pub type CommandAction = fn(&Config, &str) -> Result<CommandEffect, ChatError>;

/// What a successful command asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEffect {
    /// Replace the settings snapshot with this one.
    UpdateConfig(Config),
    /// Drop every turn and start over with one empty turn.
    ClearConversation,
}

/// Read-only view of the session handed to descriptions and detail panes.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub config: &'a Config,
    pub turn_count: usize,
}

/// Title and markdown body shown in a detail pane or info page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Action,
    Info,
    Link,
}

#[derive(Clone, Copy)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub arg_hint: Option<&'static str>,
    /// Accept `/name ` with nothing after it.
    pub allow_empty_arg: bool,
    pub describe: fn(&CommandContext<'_>) -> String,
    pub detail: Option<fn(&CommandContext<'_>) -> Detail>,
    pub link: Option<&'static str>,
    pub action: Option<CommandAction>,
}

impl CommandDescriptor {
    /// An action command that takes no argument.
    pub const fn action(
        name: &'static str,
        describe: fn(&CommandContext<'_>) -> String,
        action: CommandAction,
    ) -> Self {
        Self {
            name,
            arg_hint: None,
            allow_empty_arg: false,
            describe,
            detail: None,
            link: None,
            action: Some(action),
        }
    }

    /// An action command that requires an argument described by `hint`.
    pub const fn with_arg(
        name: &'static str,
        hint: &'static str,
        describe: fn(&CommandContext<'_>) -> String,
        action: CommandAction,
    ) -> Self {
        Self {
            arg_hint: Some(hint),
            ..Self::action(name, describe, action)
        }
    }

    pub const fn kind(&self) -> Option<CommandKind> {
        if self.action.is_some() {
            Some(CommandKind::Action)
        } else if self.detail.is_some() {
            Some(CommandKind::Info)
        } else if self.link.is_some() {
            Some(CommandKind::Link)
        } else {
            None
        }
    }

    /// `/name` followed by the argument hint, if any.
    pub fn title(&self) -> String {
        match self.arg_hint {
            Some(hint) => format!("/{} {hint}", self.name),
            None => format!("/{}", self.name),
        }
    }
}

/// Insertion-ordered set of commands.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: IndexMap<&'static str, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in command.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in super::builtin::descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Adds a command. A descriptor with an existing name replaces the old
    /// one but keeps its position.
    pub fn register(&mut self, descriptor: CommandDescriptor) {
        self.commands.insert(descriptor.name, descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    /// Every command, closest to `candidate` first.
    ///
    /// The sort is stable, so equally distant commands keep registration order.
    pub fn lookup(&self, candidate: &str) -> Vec<&CommandDescriptor> {
        let mut ranked: Vec<_> = self.commands.values().collect();
        ranked.sort_by_cached_key(|descriptor| levenshtein(candidate, descriptor.name));
        ranked
    }

    /// Runs the action of `name` against the full input line.
    ///
    /// `search_text` must start with `/name`. Commands with an argument hint
    /// additionally require `/name ` and a non-blank argument.
    pub fn invoke(
        &self,
        name: &str,
        search_text: &str,
        config: &Config,
    ) -> Result<CommandEffect, ChatError> {
        let not_found = || ChatError::CommandNotFound(search_text.to_string());

        let descriptor = self.get(name).ok_or_else(not_found)?;
        let rest = search_text
            .strip_prefix('/')
            .and_then(|s| s.strip_prefix(descriptor.name))
            .ok_or_else(not_found)?;

        let argument = match descriptor.arg_hint {
            Some(hint) => {
                let argument = rest
                    .strip_prefix(' ')
                    .map(str::trim)
                    .ok_or_else(|| ChatError::missing_argument(descriptor.name, hint))?;
                if argument.is_empty() && !descriptor.allow_empty_arg {
                    return Err(ChatError::missing_argument(descriptor.name, hint));
                }
                argument
            }
            None => "",
        };

        let action = descriptor.action.ok_or_else(|| {
            ChatError::Unexpected(format!("Command '/{}' has no action", descriptor.name))
        })?;

        debug!(command = descriptor.name, "running command");
        action(config, argument)
    }
}

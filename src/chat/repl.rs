//! The interactive prompt driving a [`ChatSession`].

use anyhow::Result;
use inquire::Text;
use inquire::autocompletion::{Autocomplete, Replacement};
use inquire::ui::{Attributes, Color, RenderConfig, StyleSheet, Styled};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::debug;

use super::router::{Input, Route, parse_input, route};
use super::session::{ChatSession, CommandOutcome, TurnOutcome};
use super::ui;
use crate::error::ChatError;
use crate::ui::{Spinner, Style, is_prompt_cancelled};

const HELP_MESSAGE: &str = "Type a message, / for commands, /quit or Ctrl+C to exit";

/// Autocomplete backed by the session's ranked command list.
#[derive(Clone)]
pub struct CommandCompleter {
    session: ChatSession,
}

impl CommandCompleter {
    pub const fn new(session: ChatSession) -> Self {
        Self { session }
    }
}

impl Autocomplete for CommandCompleter {
    fn get_suggestions(&mut self, input: &str) -> Result<Vec<String>, inquire::CustomUserError> {
        if !input.starts_with('/') || input.contains(' ') {
            return Ok(vec![]);
        }

        Ok(self
            .session
            .get_suggestions(input)
            .into_iter()
            .map(|s| format!("{}  {}", s.title, s.subtitle))
            .collect())
    }

    fn get_completion(
        &mut self,
        _input: &str,
        highlighted_suggestion: Option<String>,
    ) -> Result<Replacement, inquire::CustomUserError> {
        let replacement = highlighted_suggestion.map(|s| {
            let name = s.split_whitespace().next().unwrap_or_default();
            let takes_arg = self
                .session
                .registry()
                .get(name.trim_start_matches('/'))
                .is_some_and(|d| d.arg_hint.is_some());
            if takes_arg {
                format!("{name} ")
            } else {
                name.to_string()
            }
        });
        Ok(replacement)
    }
}

/// Line-oriented front end for a session.
pub struct Repl {
    session: ChatSession,
    fragments: mpsc::UnboundedReceiver<String>,
}

impl Repl {
    pub fn new(session: ChatSession) -> Self {
        let (tx, fragments) = mpsc::unbounded_channel();
        session.subscribe(move |fragment| {
            // The receiver lives as long as the repl; a closed channel only
            // means we are shutting down.
            let _ = tx.send(fragment.to_string());
        });
        Self { session, fragments }
    }

    pub async fn run(&mut self) -> Result<()> {
        ui::print_header(&self.session.config());
        self.print_missing_config();

        let prompt_style = Styled::new("❯")
            .with_fg(Color::LightBlue)
            .with_attr(Attributes::BOLD);
        let mut render_config = RenderConfig::default()
            .with_prompt_prefix(prompt_style)
            .with_answered_prompt_prefix(prompt_style);
        render_config.option = StyleSheet::new().with_fg(Color::Grey);
        render_config.selected_option = Some(StyleSheet::new().with_fg(Color::DarkMagenta));

        loop {
            let input = Text::new("")
                .with_render_config(render_config)
                .with_autocomplete(CommandCompleter::new(self.session.clone()))
                .with_help_message(HELP_MESSAGE)
                .prompt();

            match input {
                Ok(line) => match parse_input(&line) {
                    Input::Empty => {}
                    Input::Quit => break,
                    Input::Command(line) => self.run_command(&line),
                    Input::Text(text) => self.send(&text).await?,
                },
                Err(e) if is_prompt_cancelled(&e) => {
                    println!();
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        ui::print_goodbye();
        Ok(())
    }

    fn print_missing_config(&self) {
        let config = self.session.config();
        let missing = config.missing_fields();
        if !missing.is_empty() {
            ui::print_missing(&config, &missing);
            println!();
        }
    }

    fn run_command(&self, line: &str) {
        if matches!(route(line), Route::Command { candidate: "", .. }) {
            ui::print_commands(&self.session.get_suggestions(line));
            return;
        }

        match self.session.execute_command(line) {
            CommandOutcome::Applied(name) => {
                ui::print_applied(name);
                if name != "clear" {
                    self.print_missing_config();
                }
            }
            CommandOutcome::Info(detail) => ui::print_detail(&detail),
            CommandOutcome::Link(url) => ui::print_link(url),
            CommandOutcome::Busy => ui::print_warning("A reply is still streaming"),
            CommandOutcome::Failed(error) => {
                ui::print_error(&self.session.error_message(&error));
                if matches!(error, ChatError::CommandNotFound(_)) {
                    println!("{}", Style::hint("Did you mean:"));
                    let suggestions = self.session.get_suggestions(line);
                    ui::print_commands(&suggestions[..suggestions.len().min(3)]);
                }
            }
        }
    }

    /// Sends `text` as the next turn and prints the reply as it streams.
    ///
    /// Ctrl+C while waiting cancels the turn rather than exiting.
    async fn send(&mut self, text: &str) -> Result<()> {
        self.session.set_pending_text(text);

        let spinner = Spinner::new("Thinking...");
        let mut printed_any = false;
        let commit = self.session.commit();
        tokio::pin!(commit);

        let outcome = loop {
            tokio::select! {
                outcome = &mut commit => break outcome,
                Some(fragment) = self.fragments.recv() => {
                    if !printed_any {
                        spinner.stop();
                        printed_any = true;
                    }
                    print!("{fragment}");
                    io::stdout().flush()?;
                }
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() && self.session.cancel() {
                        debug!("cancel requested");
                        spinner.set_message("Cancelling...");
                    }
                }
            }
        };
        spinner.stop();

        while let Ok(fragment) = self.fragments.try_recv() {
            print!("{fragment}");
            printed_any = true;
        }
        if printed_any {
            println!();
            println!();
        }
        io::stdout().flush()?;

        match outcome {
            TurnOutcome::Completed { .. } | TurnOutcome::Empty => {}
            TurnOutcome::Cancelled { .. } => ui::print_warning("Cancelled"),
            TurnOutcome::Rejected => ui::print_warning("A reply is still streaming"),
            TurnOutcome::Blocked(error) | TurnOutcome::Failed { error, .. } => {
                ui::print_error(&self.session.error_message(&error));
            }
        }
        Ok(())
    }
}

/// Where a line of input goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    /// `/candidate args`. `candidate` is everything up to the first space and
    /// may be empty; `args` is everything after it, untrimmed.
    Command { candidate: &'a str, args: &'a str },
    /// Anything else is the pending message for the current turn.
    Chat(&'a str),
}

pub fn route(text: &str) -> Route<'_> {
    let Some(command) = text.strip_prefix('/') else {
        return Route::Chat(text);
    };

    match command.split_once(' ') {
        Some((candidate, args)) => Route::Command { candidate, args },
        None => Route::Command {
            candidate: command,
            args: "",
        },
    }
}

/// Input types, as the prompt sees them.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Text(String),
    /// The full line, kept as typed so commands can validate their prefix.
    Command(String),
    Quit,
    Empty,
}

pub fn parse_input(input: &str) -> Input {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Input::Empty;
    }

    if matches!(trimmed, "/quit" | "/exit" | "/q") {
        return Input::Quit;
    }

    // Keep a trailing space: `/url ` is a command with an empty argument.
    let line = input.trim_start();
    match route(line) {
        Route::Command { .. } => Input::Command(line.to_string()),
        Route::Chat(_) => Input::Text(trimmed.to_string()),
    }
}

//! Chat mode UI components.

use crate::chat::Suggestion;
use crate::command::Detail;
use crate::config::Config;
use crate::ui::Style;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn print_header(config: &Config) {
    println!(
        "{} {} - {} {}",
        Style::header("chatline"),
        Style::version(format!("v{VERSION}")),
        Style::value(config.service),
        Style::secondary(config.model_name()),
    );
    println!();
}

pub fn print_goodbye() {
    println!("{}", Style::success("Goodbye!"));
}

/// Shows an API key as its last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

pub fn print_config(config: &Config) {
    let or_unset = |value: Option<&str>| match value {
        Some(v) if !v.trim().is_empty() => Style::value(v),
        _ => Style::hint("(unset)"),
    };

    println!("{}", Style::header("Settings"));
    println!("  {}  {}", Style::label("service"), Style::value(config.service));
    println!(
        "  {}      {}",
        Style::label("url"),
        match config.url.trim() {
            "" => Style::hint(
                config
                    .service
                    .default_url()
                    .map_or_else(|| "(unset)".to_string(), |url| format!("(default: {url})"))
            ),
            url => Style::value(url),
        }
    );
    println!("  {}    {}", Style::label("model"), or_unset(config.model.as_deref()));
    println!(
        "  {}   {}",
        Style::label("apikey"),
        or_unset(config.api_key.as_deref().map(mask_key).as_deref())
    );
    println!("  {}  {}", Style::label("history"), Style::value(config.history));
    println!("  {}  {}", Style::label("details"), Style::value(config.details));
    println!("  {}    {}", Style::label("debug"), Style::value(config.debug));
    println!(
        "  {}   {}",
        Style::label("system"),
        Style::secondary(config.system.lines().next().unwrap_or_default())
    );

    let missing = config.missing_fields();
    if !missing.is_empty() {
        println!();
        print_missing(config, &missing);
    }
    println!();
}

pub fn print_missing(config: &Config, missing: &[&str]) {
    println!(
        "{} {}",
        Style::warning(format!("⚠ Configuration incomplete for {}.", config.service)),
        Style::secondary(format!(
            "The missing configurations are: {}",
            missing.join(", ")
        ))
    );
}

/// Prints ranked command suggestions, one per line.
pub fn print_commands(suggestions: &[Suggestion]) {
    for suggestion in suggestions {
        println!(
            "  {}  {}",
            Style::command(&suggestion.title),
            Style::secondary(&suggestion.subtitle)
        );
    }
    println!();
}

pub fn print_detail(detail: &Detail) {
    println!("{}", Style::header(&detail.title));
    println!();
    println!("{}", detail.body.trim_end());
    println!();
}

pub fn print_applied(command: &str) {
    println!("{} {}", Style::success("✓"), Style::command(format!("/{command}")));
}

pub fn print_link(url: &str) {
    println!("Open {}", Style::link(url));
    println!();
}

pub fn print_warning(message: &str) {
    eprintln!("{}", Style::warning(message));
    eprintln!();
}

pub fn print_error(message: &str) {
    eprintln!("{} {message}", Style::error("Error:"));
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key_keeps_last_four() {
        assert_eq!(mask_key("sk-abcdef123456"), "****3456");
    }

    #[test]
    fn test_mask_key_hides_short_keys() {
        assert_eq!(mask_key("abcd"), "****");
        assert_eq!(mask_key(""), "****");
    }
}

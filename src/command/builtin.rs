//! The built-in slash commands.

use super::registry::{CommandContext, CommandDescriptor, CommandEffect, Detail};
use crate::config::{Config, Service};
use crate::error::ChatError;

/// Chat completions API reference, opened by `/docs`.
pub const DOCS_URL: &str = "https://platform.openai.com/docs/api-reference/chat/create";

const HELP_TITLE: &str = "Help message";

const HELP_BODY: &str = "\
# chatline

Type a message and press enter to send it to the configured model. The reply \
streams in as it is generated; press Ctrl-C to stop it early.

Start a line with `/` to run a command instead. Commands are ranked by how \
close they are to what you typed, so `/hist 10` finds `/history`.

## Getting connected

1. `/service <name>` picks the backend: Ollama, OpenAI, AzureOpenAI, Google or Mistral. \
Any OpenAI compatible server works with `OpenAI`.
2. `/url <url>` sets the server address. Ollama usually listens on \
`http://localhost:11434`; Azure uses `https://<resource>.openai.azure.com`. \
Send `/url ` with nothing after it to fall back to the service default.
3. `/model <name>` sets the model. For Azure this is the deployment name.
4. `/apikey <key>` sets the key for services that need one.

Until every setting the service needs is present, the prompt shows which are missing.

## Other commands

- `/system <prompt>` replaces the system prompt.
- `/history <n>` limits how many earlier messages are sent with each request.
- `/detail` toggles showing full replies next to the list.
- `/debug` toggles full error diagnostics.
- `/clear` starts a fresh conversation.
- `/reset` restores every setting to its default.
- `/docs` opens the chat completions API reference.
";

pub fn descriptors() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor::with_arg(
            "service",
            "<one-of-[ Ollama | OpenAI | AzureOpenAI | Google | Mistral ]>",
            |ctx| {
                format!(
                    "Set the API service to call (currently: {})",
                    ctx.config.service
                )
            },
            set_service,
        ),
        CommandDescriptor::action("clear", describe_clear, clear),
        CommandDescriptor {
            allow_empty_arg: true,
            ..CommandDescriptor::with_arg(
                "url",
                "<url>",
                |ctx| format!("Set server URL (current: {})", ctx.config.url),
                set_url,
            )
        },
        CommandDescriptor::with_arg(
            "model",
            "<model-name>",
            |ctx| {
                format!(
                    "Set the model to use (current: {})",
                    ctx.config.model_name()
                )
            },
            set_model,
        ),
        CommandDescriptor::with_arg(
            "apikey",
            "<api-key>",
            |_| "Set the API key (Ollama not applicable)".to_string(),
            set_api_key,
        ),
        CommandDescriptor::action(
            "detail",
            |ctx| {
                format!(
                    "Toggle full detailed response on the side (current: {})",
                    ctx.config.details
                )
            },
            toggle_details,
        ),
        CommandDescriptor {
            detail: Some(system_detail),
            ..CommandDescriptor::with_arg(
                "system",
                "<system-prompt>",
                |_| "Set the system prompt".to_string(),
                set_system,
            )
        },
        CommandDescriptor::with_arg(
            "history",
            "<history-count>",
            |ctx| {
                format!(
                    "Set the message history count (current: {})",
                    ctx.config.history
                )
            },
            set_history,
        ),
        CommandDescriptor {
            name: "help",
            arg_hint: None,
            allow_empty_arg: false,
            describe: |_| "Help message on usage of chatline".to_string(),
            detail: Some(help_detail),
            link: None,
            action: None,
        },
        CommandDescriptor {
            name: "docs",
            arg_hint: None,
            allow_empty_arg: false,
            describe: |_| "Open the chat completions API reference".to_string(),
            detail: None,
            link: Some(DOCS_URL),
            action: None,
        },
        CommandDescriptor::action(
            "debug",
            |ctx| {
                format!(
                    "Toggle printing of the complete error (current: {})",
                    ctx.config.debug
                )
            },
            toggle_debug,
        ),
        CommandDescriptor::action("reset", |_| "Reset all settings".to_string(), reset),
    ]
}

fn system_detail(ctx: &CommandContext<'_>) -> Detail {
    Detail {
        title: "Current System Prompt".to_string(),
        body: ctx.config.system.clone(),
    }
}

fn help_detail(_: &CommandContext<'_>) -> Detail {
    Detail {
        title: HELP_TITLE.to_string(),
        body: HELP_BODY.to_string(),
    }
}

fn describe_clear(ctx: &CommandContext<'_>) -> String {
    let n = ctx.turn_count;
    let plural = if n == 1 { "" } else { "s" };
    format!("Clear message history ({n} message{plural})")
}

fn update(config: &Config, edit: impl FnOnce(&mut Config)) -> Result<CommandEffect, ChatError> {
    let mut next = config.clone();
    edit(&mut next);
    Ok(CommandEffect::UpdateConfig(next))
}

fn set_service(config: &Config, arg: &str) -> Result<CommandEffect, ChatError> {
    let service: Service = arg
        .parse()
        .map_err(|message: String| ChatError::invalid_argument("service", message))?;
    update(config, |c| c.service = service)
}

fn clear(_: &Config, _: &str) -> Result<CommandEffect, ChatError> {
    Ok(CommandEffect::ClearConversation)
}

fn set_url(config: &Config, arg: &str) -> Result<CommandEffect, ChatError> {
    update(config, |c| c.url = arg.to_string())
}

fn set_model(config: &Config, arg: &str) -> Result<CommandEffect, ChatError> {
    update(config, |c| c.model = Some(arg.to_string()))
}

fn set_api_key(config: &Config, arg: &str) -> Result<CommandEffect, ChatError> {
    update(config, |c| c.api_key = Some(arg.to_string()))
}

fn toggle_details(config: &Config, _: &str) -> Result<CommandEffect, ChatError> {
    update(config, |c| c.details = !c.details)
}

fn set_system(config: &Config, arg: &str) -> Result<CommandEffect, ChatError> {
    update(config, |c| c.system = arg.to_string())
}

fn set_history(config: &Config, arg: &str) -> Result<CommandEffect, ChatError> {
    let count: i64 = arg.parse().map_err(|_| {
        ChatError::invalid_argument(
            "history",
            format!("Invalid history count '{arg}', expected integer"),
        )
    })?;

    let history = u32::try_from(count)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            ChatError::invalid_argument(
                "history",
                format!("Invalid history count {count}, expected positive integer"),
            )
        })?;

    update(config, |c| c.history = history)
}

fn toggle_debug(config: &Config, _: &str) -> Result<CommandEffect, ChatError> {
    update(config, |c| c.debug = !c.debug)
}

fn reset(_: &Config, _: &str) -> Result<CommandEffect, ChatError> {
    Ok(CommandEffect::UpdateConfig(Config::default()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::command::CommandRegistry;
    use crate::error::ErrorKind;

    fn run(text: &str, config: &Config) -> Result<CommandEffect, ChatError> {
        let registry = CommandRegistry::with_builtins();
        let name = text[1..].split(' ').next().unwrap();
        registry.invoke(name, text, config)
    }

    fn updated(text: &str, config: &Config) -> Config {
        match run(text, config).unwrap() {
            CommandEffect::UpdateConfig(config) => config,
            CommandEffect::ClearConversation => panic!("Expected UpdateConfig"),
        }
    }

    #[test]
    fn test_registration_order() {
        let registry = CommandRegistry::with_builtins();
        let names: Vec<_> = registry.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "service", "clear", "url", "model", "apikey", "detail", "system", "history",
                "help", "docs", "debug", "reset"
            ]
        );
    }

    #[test]
    fn test_service_is_case_insensitive() {
        let config = updated("/service googLE", &Config::default());
        assert_eq!(config.service, Service::Google);
    }

    #[test]
    fn test_service_rejects_unknown() {
        let err = run("/service anthropic", &Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CommandArgument);
        assert_eq!(
            err.to_string(),
            "Invalid service 'anthropic', expected one of 'Ollama', 'OpenAI', 'AzureOpenAI', 'Google', 'Mistral'"
        );
    }

    #[test]
    fn test_history_validation() {
        let err = run("/history ten", &Config::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid history count 'ten', expected integer");

        let err = run("/history 0", &Config::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid history count 0, expected positive integer"
        );

        let err = run("/history -3", &Config::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid history count -3, expected positive integer"
        );

        assert_eq!(updated("/history 10", &Config::default()).history, 10);
    }

    #[test]
    fn test_url_can_be_cleared() {
        let config = Config {
            url: "http://localhost:11434".to_string(),
            ..Config::default()
        };
        assert_eq!(updated("/url ", &config).url, "");
    }

    #[test]
    fn test_toggles() {
        let config = Config::default();
        assert!(!updated("/detail", &config).details);
        assert!(updated("/debug", &config).debug);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let config = Config {
            service: Service::Mistral,
            history: 40,
            ..Config::default()
        };
        assert_eq!(updated("/reset", &config), Config::default());
    }

    #[test]
    fn test_clear() {
        assert_eq!(
            run("/clear", &Config::default()).unwrap(),
            CommandEffect::ClearConversation
        );
    }

    #[test]
    fn test_actions_do_not_touch_input_config() {
        let config = Config::default();
        let _ = updated("/model llama3", &config);
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_descriptions_reflect_current_values() {
        let registry = CommandRegistry::with_builtins();
        let config = Config {
            model: Some("llama3".to_string()),
            api_key: Some("sk-secret".to_string()),
            ..Config::default()
        };
        let ctx = CommandContext {
            config: &config,
            turn_count: 1,
        };

        let describe = |name: &str| (registry.get(name).unwrap().describe)(&ctx);
        assert_eq!(describe("model"), "Set the model to use (current: llama3)");
        assert_eq!(describe("clear"), "Clear message history (1 message)");
        assert!(!describe("apikey").contains("sk-secret"));

        let ctx = CommandContext {
            config: &config,
            turn_count: 3,
        };
        assert_eq!(
            (registry.get("clear").unwrap().describe)(&ctx),
            "Clear message history (3 messages)"
        );
    }

    #[test]
    fn test_system_detail_shows_prompt() {
        let registry = CommandRegistry::with_builtins();
        let config = Config::default();
        let ctx = CommandContext {
            config: &config,
            turn_count: 1,
        };
        let detail = (registry.get("system").unwrap().detail.unwrap())(&ctx);
        assert_eq!(detail.title, "Current System Prompt");
        assert_eq!(detail.body, config.system);
    }

    #[test]
    fn test_help_mentions_every_command() {
        let registry = CommandRegistry::with_builtins();
        let config = Config::default();
        let ctx = CommandContext {
            config: &config,
            turn_count: 1,
        };
        let detail = (registry.get("help").unwrap().detail.unwrap())(&ctx);
        for descriptor in registry.iter().filter(|d| d.name != "help") {
            let command = format!("`/{}", descriptor.name);
            assert!(detail.body.contains(&command), "{command} missing from help");
        }
    }
}

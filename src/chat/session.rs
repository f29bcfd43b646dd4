use futures_util::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::router::{Route, route};
use crate::command::{CommandContext, CommandEffect, CommandKind, CommandRegistry, Detail};
use crate::config::{Config, ConfigManager};
use crate::conversation::{Conversation, Turn, TurnStatus};
use crate::error::ChatError;
use crate::provider::{Adapter, ChatProvider};

/// Called with every fragment as it arrives.
pub type Observer = Arc<dyn Fn(&str) + Send + Sync>;

/// Builds the provider for a settings snapshot.
pub type ProviderFactory =
    Arc<dyn Fn(&Config) -> Result<Arc<dyn ChatProvider>, ChatError> + Send + Sync>;

/// Subtitle of a typed but unsent message.
pub const PENDING_SUBTITLE: &str = "Press enter to send";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Request sent, no fragment yet.
    Sending,
    Streaming,
}

/// How a [`ChatSession::commit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing was typed.
    Empty,
    /// Another turn is in flight.
    Rejected,
    /// Settings are incomplete; no request was made.
    Blocked(ChatError),
    Completed { turn_id: u64, fragments: usize },
    /// The turn keeps whatever text arrived before the error.
    Failed { turn_id: u64, error: ChatError },
    Cancelled { turn_id: u64 },
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied(&'static str),
    /// Info page to show.
    Info(Detail),
    /// External page to open.
    Link(&'static str),
    Failed(ChatError),
    /// A reply is streaming; try again once it ends.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionKind {
    Command {
        name: &'static str,
        kind: Option<CommandKind>,
    },
    /// Settings are incomplete.
    Warning,
    Pending,
    Response { turn_id: u64 },
}

/// One row of the list shown under the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub title: String,
    pub subtitle: String,
    pub detail: Option<Detail>,
    pub kind: SuggestionKind,
}

struct State {
    config: Arc<Config>,
    adapter: Result<Arc<dyn ChatProvider>, ChatError>,
    conversation: Conversation,
    phase: Phase,
    cancel: Option<CancellationToken>,
}

struct Inner {
    state: Mutex<State>,
    /// One permit: held by the turn in flight.
    turn_slot: Semaphore,
    /// Held while a command reads, replaces and saves the settings.
    commands: Mutex<()>,
    observers: Mutex<Vec<Observer>>,
    registry: CommandRegistry,
    store: Option<ConfigManager>,
    factory: ProviderFactory,
}

/// A conversation with one backend, driven by text from the host.
///
/// Cheap to clone; clones share the same conversation.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    /// Creates a session that persists setting changes to `store`.
    pub fn new(config: Config, store: ConfigManager) -> Self {
        Self::with_factory(config, Some(store), default_factory())
    }

    /// Creates a session with a custom provider factory. Setting changes are
    /// only persisted when `store` is given.
    pub fn with_factory(
        config: Config,
        store: Option<ConfigManager>,
        factory: ProviderFactory,
    ) -> Self {
        let adapter = factory(&config);
        if let Err(e) = &adapter {
            debug!("no adapter for initial settings: {e}");
        }

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    config: Arc::new(config),
                    adapter,
                    conversation: Conversation::new(),
                    phase: Phase::Idle,
                    cancel: None,
                }),
                turn_slot: Semaphore::new(1),
                commands: Mutex::new(()),
                observers: Mutex::new(Vec::new()),
                registry: CommandRegistry::with_builtins(),
                store,
                factory,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.lock().config)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase() != Phase::Idle
    }

    /// A copy of every turn, newest first.
    pub fn turns(&self) -> Vec<Turn> {
        self.lock().conversation.turns().cloned().collect()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.inner.registry
    }

    pub fn subscribe(&self, observer: impl Fn(&str) + Send + Sync + 'static) {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    fn notify(&self, fragment: &str) {
        let observers = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer(fragment);
        }
    }

    /// Text to show for `error`, honoring the `debug` setting.
    pub fn error_message(&self, error: &ChatError) -> String {
        error.user_message(self.lock().config.debug)
    }

    /// Sets the text of the message being typed. Ignored while a reply is
    /// streaming.
    pub fn set_pending_text(&self, text: &str) -> bool {
        let mut state = self.lock();
        if state.phase != Phase::Idle {
            return false;
        }
        state.conversation.set_pending_user_text(text)
    }

    /// Rows to show for the current input.
    ///
    /// Command input lists every command, best match first. Otherwise the
    /// input becomes the pending message, and the rows are either a single
    /// warning (incomplete configuration) or the conversation, newest first.
    pub fn get_suggestions(&self, search_text: &str) -> Vec<Suggestion> {
        let mut state = self.lock();
        let idle = state.phase == Phase::Idle;

        if idle && let Route::Command { candidate, .. } = route(search_text) {
            let ctx = CommandContext {
                config: &state.config,
                turn_count: state.conversation.len(),
            };
            return self
                .inner
                .registry
                .lookup(candidate)
                .into_iter()
                .map(|descriptor| Suggestion {
                    title: descriptor.title(),
                    subtitle: (descriptor.describe)(&ctx),
                    detail: descriptor.detail.map(|detail| detail(&ctx)),
                    kind: SuggestionKind::Command {
                        name: descriptor.name,
                        kind: descriptor.kind(),
                    },
                })
                .collect();
        }

        if idle {
            state.conversation.set_pending_user_text(search_text);
        }

        let missing = state.config.missing_fields();
        if !missing.is_empty() {
            return vec![Suggestion {
                title: format!("Configuration incomplete for {}", state.config.service),
                subtitle: format!("The missing configurations are: {}", missing.join(", ")),
                detail: None,
                kind: SuggestionKind::Warning,
            }];
        }

        let details = state.config.details;
        state
            .conversation
            .turns()
            .filter_map(|turn| turn_suggestion(turn, details))
            .collect()
    }

    /// Runs the command that best matches `search_text`.
    pub fn execute_command(&self, search_text: &str) -> CommandOutcome {
        let Route::Command { candidate, .. } = route(search_text) else {
            return CommandOutcome::Failed(ChatError::CommandNotFound(search_text.to_string()));
        };
        let Some(best) = self.inner.registry.lookup(candidate).first().map(|d| d.name) else {
            return CommandOutcome::Failed(ChatError::CommandNotFound(search_text.to_string()));
        };
        self.invoke(best, search_text)
    }

    /// Runs command `name` with `search_text` as the full input line.
    ///
    /// Info and link commands return their page or URL. While a reply is
    /// streaming only `/clear` is accepted. Commands run one at a time, from
    /// reading the settings to saving them.
    pub fn invoke(&self, name: &str, search_text: &str) -> CommandOutcome {
        let Some(descriptor) = self.inner.registry.get(name) else {
            return CommandOutcome::Failed(ChatError::CommandNotFound(search_text.to_string()));
        };

        let _serialized = self
            .inner
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (config, turn_count, loading) = {
            let state = self.lock();
            (
                Arc::clone(&state.config),
                state.conversation.len(),
                state.phase != Phase::Idle,
            )
        };

        match descriptor.kind() {
            Some(CommandKind::Action) => {}
            Some(CommandKind::Info) => {
                let ctx = CommandContext {
                    config: &config,
                    turn_count,
                };
                if let Some(detail) = descriptor.detail {
                    return CommandOutcome::Info(detail(&ctx));
                }
            }
            Some(CommandKind::Link) => {
                if let Some(link) = descriptor.link {
                    return CommandOutcome::Link(link);
                }
            }
            None => {}
        }

        if loading && descriptor.name != "clear" {
            debug!(command = descriptor.name, "command rejected while loading");
            return CommandOutcome::Busy;
        }

        match self.inner.registry.invoke(name, search_text, &config) {
            Ok(effect) => self.apply(descriptor.name, effect),
            Err(e) => {
                debug!(command = descriptor.name, "command failed: {e}");
                CommandOutcome::Failed(e)
            }
        }
    }

    fn apply(&self, name: &'static str, effect: CommandEffect) -> CommandOutcome {
        match effect {
            CommandEffect::ClearConversation => {
                self.clear();
                CommandOutcome::Applied(name)
            }
            CommandEffect::UpdateConfig(next) => {
                let next = Arc::new(next);
                let adapter = (self.inner.factory)(&next);
                if let Err(e) = &adapter {
                    debug!("no adapter for new settings: {e}");
                }
                {
                    let mut state = self.lock();
                    state.config = Arc::clone(&next);
                    state.adapter = adapter;
                }
                info!(command = name, service = %next.service, "settings updated");

                if let Some(store) = &self.inner.store
                    && let Err(e) = store.save(&next)
                {
                    warn!("failed to save settings: {e:#}");
                    return CommandOutcome::Failed(e.into());
                }
                CommandOutcome::Applied(name)
            }
        }
    }

    /// Drops the conversation, cancelling the reply in flight if any.
    pub fn clear(&self) {
        let mut state = self.lock();
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        state.conversation.clear();
        debug!("conversation cleared");
    }

    /// Stops the reply in flight. Returns `false` if there is none.
    pub fn cancel(&self) -> bool {
        match &self.lock().cancel {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Sends the pending message and streams the reply into the conversation.
    ///
    /// Rejected without waiting if another turn is in flight. Each fragment is
    /// appended and passed to every observer before the next one is read.
    pub async fn commit(&self) -> TurnOutcome {
        let Ok(_permit) = self.inner.turn_slot.try_acquire() else {
            debug!("turn already in flight");
            return TurnOutcome::Rejected;
        };

        let (turn_id, provider, history, cancel, config) = {
            let mut state = self.lock();
            if state.conversation.newest().status() != TurnStatus::Pending {
                return TurnOutcome::Empty;
            }
            let provider = match &state.adapter {
                Ok(provider) => Arc::clone(provider),
                Err(e) => {
                    warn!("turn blocked: {e}");
                    return TurnOutcome::Blocked(e.clone());
                }
            };
            let Some(turn_id) = state.conversation.begin_turn() else {
                return TurnOutcome::Empty;
            };
            let history = state.conversation.build_request_context(&state.config);
            let cancel = CancellationToken::new();
            state.cancel = Some(cancel.clone());
            state.phase = Phase::Sending;
            (turn_id, provider, history, cancel, Arc::clone(&state.config))
        };

        info!(
            turn_id,
            service = %provider.service(),
            model = config.model_name(),
            messages = history.len(),
            "turn started"
        );

        let mut stream = provider.chat_stream(history, cancel.clone());
        let mut fragments = 0;

        let result = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = stream.next() => Some(next),
            };
            let fragment = match next {
                None | Some(None) => break Ok(()),
                Some(Some(Err(e))) => break Err(e),
                Some(Some(Ok(fragment))) => fragment,
            };
            if fragment.is_empty() {
                continue;
            }

            let appended = {
                let mut state = self.lock();
                let appended = state
                    .conversation
                    .append_assistant_fragment(turn_id, &fragment);
                if appended {
                    state.phase = Phase::Streaming;
                }
                appended
            };
            if !appended {
                break Ok(());
            }
            fragments += 1;
            self.notify(&fragment);
        };
        drop(stream);

        self.finish(turn_id, &cancel, result, fragments)
    }

    fn finish(
        &self,
        turn_id: u64,
        cancel: &CancellationToken,
        result: Result<(), ChatError>,
        fragments: usize,
    ) -> TurnOutcome {
        let mut state = self.lock();
        state.phase = Phase::Idle;
        state.cancel = None;

        if cancel.is_cancelled() {
            state.conversation.cancel_turn(turn_id);
            info!(turn_id, fragments, "turn cancelled");
            return TurnOutcome::Cancelled { turn_id };
        }

        match result {
            Ok(()) => {
                state.conversation.complete_turn(turn_id);
                info!(turn_id, fragments, "turn completed");
                TurnOutcome::Completed { turn_id, fragments }
            }
            Err(error) => {
                state.conversation.fail_turn(turn_id, error.kind());
                warn!(turn_id, fragments, kind = ?error.kind(), "turn failed: {error}");
                TurnOutcome::Failed { turn_id, error }
            }
        }
    }
}

fn default_factory() -> ProviderFactory {
    Arc::new(|config: &Config| {
        Adapter::create(config).map(|adapter| Arc::new(adapter) as Arc<dyn ChatProvider>)
    })
}

fn turn_suggestion(turn: &Turn, details: bool) -> Option<Suggestion> {
    let user = turn.user_text();
    let assistant = turn.assistant_text();

    match turn.status() {
        TurnStatus::Draft => None,
        TurnStatus::Pending => Some(Suggestion {
            title: user.to_string(),
            subtitle: PENDING_SUBTITLE.to_string(),
            detail: None,
            kind: SuggestionKind::Pending,
        }),
        TurnStatus::InFlight if assistant.is_empty() => Some(Suggestion {
            title: user.to_string(),
            subtitle: "Waiting for reply".to_string(),
            detail: None,
            kind: SuggestionKind::Response {
                turn_id: turn.id(),
            },
        }),
        TurnStatus::InFlight
        | TurnStatus::Completed
        | TurnStatus::Failed(_)
        | TurnStatus::Cancelled => Some(Suggestion {
            title: assistant.to_string(),
            subtitle: user.to_string(),
            detail: details.then(|| Detail {
                title: user.to_string(),
                body: assistant.to_string(),
            }),
            kind: SuggestionKind::Response {
                turn_id: turn.id(),
            },
        }),
    }
}

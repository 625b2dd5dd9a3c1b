//! Message dispatcher - Routes inbound messages to commands and modules

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::parser::MessageParser;
use crate::application::errors::{BotError, CommandError};
use crate::domain::entities::{keywords, CommandData, Content, Message};
use crate::plugins::ModuleManager;

/// What happened to one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers that ran to completion
    pub handled: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

/// Inbound side of the bot: parses lines, records activity and runs handlers
pub struct MessageDispatcher {
    parser: MessageParser,
    running: AtomicBool,
}

impl MessageDispatcher {
    pub fn new(parser: MessageParser) -> Self {
        Self {
            parser,
            running: AtomicBool::new(true),
        }
    }

    pub fn parser(&self) -> &MessageParser {
        &self.parser
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Make the read loop exit before its next line
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Parse and handle one raw line
    pub fn handle_line(&self, modules: &ModuleManager, line: &str) -> DispatchOutcome {
        let message = self.parser.parse_line(line);
        self.handle(modules, &message)
    }

    /// Handle one message.
    ///
    /// A failing handler never stops the others: errors and panics are
    /// caught per handler. Command failures are reported to the channel
    /// with a single message; listener failures are only logged.
    pub fn handle(&self, modules: &ModuleManager, message: &Message) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if let (Some(sender), Some(recent)) = (&message.sender, modules.recent_data()) {
            if !message.raw.is_empty() {
                recent.store_identity(sender, &message.channel, &message.raw);
            }
        }

        if let (Some(keyword), Some(connection)) = (message.content.keyword(), modules.connection()) {
            connection.events().emit(keyword, message);
        }

        match &message.content {
            Content::Command { name, args } => {
                let Some(entry) = modules.command(name) else {
                    tracing::debug!(cmd = %name, "Unknown command");
                    return outcome;
                };
                let data = CommandData::new(message.channel.clone(), args.clone())
                    .with_sender(message.sender.clone());

                match run_isolated(|| entry.run(modules, &data)) {
                    Ok(()) => outcome.handled += 1,
                    Err(e) => {
                        outcome.failed += 1;
                        tracing::warn!(cmd = %name, "Command failed: {}", e);
                        if let Err(say_err) = modules.say(&message.channel, &format!("error: {}", user_message(&e))) {
                            tracing::error!("Failed to report command error: {}", say_err);
                        }
                    }
                }
            }
            Content::Text(_) => {
                for module in modules.listening(keywords::PRIVMSG) {
                    match run_isolated(|| module.module().on_event(modules, keywords::PRIVMSG, message)) {
                        Ok(()) => outcome.handled += 1,
                        Err(e) => {
                            outcome.failed += 1;
                            tracing::warn!(module = module.name(), "Listener failed: {}", e);
                        }
                    }
                }
            }
            Content::Empty => {}
        }

        outcome
    }

    /// Read lines until EOF or [`MessageDispatcher::stop`], handling each on
    /// a blocking task so slow handlers never stall the reader's runtime
    pub async fn run<R>(self: Arc<Self>, modules: Arc<ModuleManager>, reader: R) -> Result<(), BotError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        tracing::info!("Read loop started");

        while self.is_running() {
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let dispatcher = self.clone();
            let modules = modules.clone();
            tokio::task::spawn_blocking(move || dispatcher.handle_line(&modules, &line))
                .await
                .map_err(|e| BotError::Internal(format!("dispatch task failed: {}", e)))?;
        }

        tracing::info!("Read loop stopped");
        Ok(())
    }
}

fn run_isolated(f: impl FnOnce() -> Result<(), CommandError>) -> Result<(), CommandError> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(CommandError::ExecutionFailed("handler panicked".to_string())))
}

/// Chat-facing wording for a command error
fn user_message(e: &CommandError) -> String {
    match e {
        CommandError::NotFound(what) => format!("{} not found", what),
        CommandError::InvalidArgs(usage) => format!("usage: {}", usage),
        CommandError::ExecutionFailed(reason) => reason.clone(),
        CommandError::PermissionDenied => "permission denied".to_string(),
    }
}

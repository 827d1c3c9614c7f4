use std::sync::Arc;

use futures::future::{self, OptionFuture};
use shared::{
    domain::ScopePath,
    protocol::{LogEntry, RunCommandResponse, SetVariableResponse},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::{
    command_node::CommandNode,
    dispatcher::Dispatcher,
    error::{DescriptionError, PanelError, ValidationError},
    navigation::{FetchTicket, Level, Navigator},
    typed_value::TypedValue,
    Notifier, PanelEvent, RemoteTree,
};

const EVENT_CAPACITY: usize = 256;

fn scope_label(scope: &ScopePath) -> String {
    if scope.is_root() {
        "/".to_string()
    } else {
        scope.to_string()
    }
}

/// Keeps the valid entries of a listing; malformed ones are logged and dropped.
fn convert<D, T>(
    scope: &ScopePath,
    descriptions: Vec<D>,
    build: impl Fn(&D) -> Result<T, DescriptionError>,
) -> Vec<T> {
    descriptions
        .iter()
        .filter_map(|desc| match build(desc) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(scope = %scope, error = %err, "dropping malformed listing entry");
                None
            }
        })
        .collect()
}

/// Interactive controller: navigation state, remote fetches and submissions.
///
/// The navigator lock is never held across a remote call. Results of a fetch
/// are applied only if no newer selection happened at that level meanwhile.
pub struct PanelSession {
    remote: Arc<dyn RemoteTree>,
    notifier: Arc<dyn Notifier>,
    dispatcher: Dispatcher,
    navigator: Mutex<Navigator>,
    events: broadcast::Sender<PanelEvent>,
}

impl PanelSession {
    pub fn new(remote: Arc<dyn RemoteTree>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            dispatcher: Dispatcher::new(Arc::clone(&remote), Arc::clone(&notifier)),
            remote,
            notifier,
            navigator: Mutex::new(Navigator::new()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PanelEvent) {
        let _ = self.events.send(event);
    }

    pub async fn with_navigator<R>(&self, f: impl FnOnce(&Navigator) -> R) -> R {
        let navigator = self.navigator.lock().await;
        f(&navigator)
    }

    /// Returns to the root and fetches the top-level modules and variables.
    /// Returns whether the result was applied.
    pub async fn load_root(&self) -> bool {
        let ticket = self.navigator.lock().await.begin_root_load();
        self.emit(PanelEvent::SelectionCleared {
            level: Level::Module,
        });
        self.fetch_level(&ticket, true).await
    }

    /// Selects a module from the root listing. `Ok(false)` means a newer
    /// selection superseded this one before its listings arrived.
    pub async fn select_module(&self, name: &str) -> Result<bool, PanelError> {
        let ticket = self.navigator.lock().await.select_module(name)?;
        self.emit(PanelEvent::SelectionCleared {
            level: Level::Command,
        });
        Ok(self.fetch_level(&ticket, true).await)
    }

    pub async fn select_command(&self, name: &str) -> Result<bool, PanelError> {
        let ticket = self.navigator.lock().await.select_command(name)?;
        Ok(self.fetch_level(&ticket, false).await)
    }

    async fn fetch_level(&self, ticket: &FetchTicket, with_commands: bool) -> bool {
        debug!(
            level = %ticket.level,
            scope = %ticket.scope,
            generation = ticket.generation.0,
            "fetching listings"
        );
        let commands: OptionFuture<_> = with_commands
            .then(|| self.fetch_commands(&ticket.scope))
            .into();
        let (commands, variables) =
            future::join(commands, self.fetch_variables(&ticket.scope)).await;

        let mut failures = Vec::new();
        let applied = {
            let mut navigator = self.navigator.lock().await;
            if !navigator.is_current(ticket) {
                debug!(
                    level = %ticket.level,
                    scope = %ticket.scope,
                    "selection superseded; discarding listings"
                );
                return false;
            }
            let mut applied = false;
            if let Some(commands) = commands {
                if let Err(err) = &commands {
                    failures.push(("listCommands", err.to_string()));
                }
                applied |= navigator.apply_commands(ticket, commands);
            }
            if let Err(err) = &variables {
                failures.push(("listVariables", err.to_string()));
            }
            applied |= navigator.apply_variables(ticket, variables);
            applied
        };

        for (call, message) in failures {
            warn!(scope = %ticket.scope, call, %message, "listing failed");
            self.notifier.show_dialog(
                &format!("{call} {} failed", scope_label(&ticket.scope)),
                &message,
            );
        }
        if applied {
            self.emit(PanelEvent::ListingUpdated {
                level: ticket.level,
            });
        }
        applied
    }

    async fn fetch_commands(&self, scope: &ScopePath) -> Result<Vec<CommandNode>, PanelError> {
        let descriptions = self.remote.list_commands(scope).await?;
        Ok(convert(scope, descriptions, CommandNode::from_description))
    }

    async fn fetch_variables(&self, scope: &ScopePath) -> Result<Vec<TypedValue>, PanelError> {
        let descriptions = self.remote.list_variables(scope).await?;
        Ok(convert(scope, descriptions, TypedValue::from_description))
    }

    fn report_invalid(&self, result: Result<(), ValidationError>) -> Result<(), ValidationError> {
        if let Err(err) = &result {
            self.notifier
                .show_dialog(&format!("{} not updated", err.field), &err.to_string());
        }
        result
    }

    pub async fn edit_variable(
        &self,
        level: Level,
        name: &str,
        candidate: &str,
    ) -> Result<(), ValidationError> {
        let result = self
            .navigator
            .lock()
            .await
            .edit_variable(level, name, candidate);
        self.report_invalid(result)
    }

    pub async fn edit_argument(&self, name: &str, candidate: &str) -> Result<(), ValidationError> {
        let result = self.navigator.lock().await.edit_argument(name, candidate);
        self.report_invalid(result)
    }

    pub async fn edit_argument_at(
        &self,
        index: usize,
        candidate: &str,
    ) -> Result<(), ValidationError> {
        let result = self
            .navigator
            .lock()
            .await
            .edit_argument_at(index, candidate);
        self.report_invalid(result)
    }

    /// Sends the current value of a variable at `level`, scoped to that level's path.
    pub async fn submit_variable(
        &self,
        level: Level,
        name: &str,
    ) -> Result<SetVariableResponse, PanelError> {
        let (value, scope) = {
            let navigator = self.navigator.lock().await;
            let value = navigator
                .variable(level, name)
                .cloned()
                .ok_or_else(|| PanelError::NotFound {
                    level,
                    name: name.to_string(),
                })?;
            (value, navigator.scope_for(level)?)
        };
        self.dispatcher.submit_variable(&value, &scope).await
    }

    /// Runs the selected command in its module's scope.
    pub async fn submit_command(&self) -> Result<RunCommandResponse, PanelError> {
        let (node, scope) = self.navigator.lock().await.command_for_submit()?;
        let response = self.dispatcher.submit_command(&node, &scope).await?;
        if !response.logs.is_empty() {
            self.emit(PanelEvent::LogsAppended {
                count: response.logs.len(),
            });
        }
        Ok(response)
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.dispatcher.logs().await
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

use std::sync::Arc;

use shared::{
    domain::ScopePath,
    protocol::{LogEntry, RunCommandResponse, SetVariableRequest, SetVariableResponse},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    command_node::CommandNode, error::PanelError, typed_value::TypedValue, Notifier, RemoteTree,
};

/// Turns edited values and commands into remote calls and reports the outcome.
///
/// Local state is never touched on failure; the only state kept here is the
/// append-only log of entries returned by successful command runs.
pub struct Dispatcher {
    remote: Arc<dyn RemoteTree>,
    notifier: Arc<dyn Notifier>,
    logs: Mutex<Vec<LogEntry>>,
}

impl Dispatcher {
    pub fn new(remote: Arc<dyn RemoteTree>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            remote,
            notifier,
            logs: Mutex::new(Vec::new()),
        }
    }

    pub async fn submit_variable(
        &self,
        value: &TypedValue,
        scope: &ScopePath,
    ) -> Result<SetVariableResponse, PanelError> {
        let name = value.name();
        if let Err(err) = value.ensure_modifiable().and_then(|()| value.check()) {
            self.notifier
                .show_dialog(&format!("setVariable {name} invalid"), &err.to_string());
            return Err(err.into());
        }

        let request = SetVariableRequest {
            name: name.to_string(),
            value: value.to_wire_value(),
            type_tag: value.type_tag(),
        };
        match self.remote.set_variable(&request, scope).await {
            Ok(response) if response.accepted => {
                let shown = response
                    .current_value
                    .clone()
                    .or_else(|| response.message.clone())
                    .unwrap_or_else(|| request.value.to_string());
                info!(variable = name, %scope, value = %shown, "variable set");
                self.notifier
                    .show_dialog(&format!("setVariable {name} OK"), &shown);
                Ok(response)
            }
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "request declined".to_string());
                warn!(variable = name, %scope, %message, "variable rejected");
                self.notifier
                    .show_dialog(&format!("setVariable {name} failed"), &message);
                Err(PanelError::RemoteRejected { message })
            }
            Err(err) => {
                warn!(variable = name, %scope, error = %err, "setVariable failed");
                self.notifier
                    .show_dialog(&format!("setVariable {name} failed"), &err.to_string());
                Err(err)
            }
        }
    }

    pub async fn submit_command(
        &self,
        node: &CommandNode,
        scope: &ScopePath,
    ) -> Result<RunCommandResponse, PanelError> {
        let name = node.name();
        let invocation = match node.build_invocation_payload() {
            Ok(invocation) => invocation,
            Err(err) => {
                self.notifier
                    .show_dialog(&format!("runCommand {name} invalid"), &err.to_string());
                return Err(err.into());
            }
        };

        match self.remote.run_command(&invocation, scope).await {
            Ok(response) => {
                info!(command = name, %scope, logs = response.logs.len(), "command ran");
                self.logs.lock().await.extend(response.logs.iter().cloned());
                self.notifier.show_dialog(
                    &format!("runCommand {name} OK"),
                    &response.display.join("\n"),
                );
                Ok(response)
            }
            Err(err) => {
                warn!(command = name, %scope, error = %err, "runCommand failed");
                self.notifier
                    .show_dialog(&format!("runCommand {name} failed"), &err.to_string());
                Err(err)
            }
        }
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().await.clone()
    }
}

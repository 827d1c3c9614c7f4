use async_trait::async_trait;
use shared::{
    domain::ScopePath,
    protocol::{
        CommandDescription, Invocation, RunCommandResponse, SetVariableRequest,
        SetVariableResponse, VariableDescription,
    },
};
use tracing::info;

pub mod command_node;
pub mod dispatcher;
pub mod error;
pub mod navigation;
pub mod session;
pub mod transport;
pub mod typed_value;

pub use command_node::CommandNode;
pub use dispatcher::Dispatcher;
pub use error::{DescriptionError, PanelError, ValidationError};
pub use navigation::{FetchTicket, Level, Listing, LoadState, NavState, Navigator};
pub use session::PanelSession;
pub use transport::HttpRemoteTree;
pub use typed_value::{Bounds, TypedKind, TypedValue};

/// The device's command/variable tree, one level per call.
#[async_trait]
pub trait RemoteTree: Send + Sync {
    async fn list_commands(&self, scope: &ScopePath)
        -> Result<Vec<CommandDescription>, PanelError>;
    async fn list_variables(
        &self,
        scope: &ScopePath,
    ) -> Result<Vec<VariableDescription>, PanelError>;
    async fn set_variable(
        &self,
        request: &SetVariableRequest,
        scope: &ScopePath,
    ) -> Result<SetVariableResponse, PanelError>;
    async fn run_command(
        &self,
        invocation: &Invocation,
        scope: &ScopePath,
    ) -> Result<RunCommandResponse, PanelError>;
}

/// Fire-and-forget user notification.
pub trait Notifier: Send + Sync {
    fn show_dialog(&self, title: &str, body: &str);
}

pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_dialog(&self, title: &str, body: &str) {
        info!(%title, %body, "dialog");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// Fresh listings were applied at this level.
    ListingUpdated { level: Level },
    /// Selection at this level and below was discarded.
    SelectionCleared { level: Level },
    LogsAppended { count: usize },
}

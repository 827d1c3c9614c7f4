//! Three-level navigation over the remote tree: root, module, command.
//!
//! Every level carries a generation counter. Selecting at one level bumps the
//! counter of that level and of every deeper level, so a fetch issued before
//! the selection changed carries a stale [`FetchTicket`] and is discarded by
//! [`Navigator::apply_commands`] / [`Navigator::apply_variables`].

use std::fmt;

use shared::{domain::ScopePath, error::NameError};
use tracing::debug;

use crate::{
    command_node::CommandNode,
    error::{PanelError, ValidationError},
    typed_value::TypedValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Root,
    Module,
    Command,
}

impl Level {
    fn index(self) -> usize {
        match self {
            Level::Root => 0,
            Level::Module => 1,
            Level::Command => 2,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Root => "root",
            Level::Module => "module",
            Level::Command => "command",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

/// Identifies one outgoing fetch; results are applied only while it is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub level: Level,
    pub generation: Generation,
    pub scope: ScopePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// One lazily fetched collection. A failed load exposes no items.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    state: LoadState,
    items: Vec<T>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            state: LoadState::Idle,
            items: Vec::new(),
        }
    }
}

impl<T> Listing<T> {
    fn loading() -> Self {
        Self {
            state: LoadState::Loading,
            items: Vec::new(),
        }
    }

    fn resolve(&mut self, result: Result<Vec<T>, PanelError>) {
        match result {
            Ok(items) => {
                self.state = LoadState::Ready;
                self.items = items;
            }
            Err(err) => {
                self.state = LoadState::Failed(err.to_string());
                self.items = Vec::new();
            }
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Root,
    ModuleSelected,
    CommandSelected,
}

#[derive(Debug, Default)]
pub struct Navigator {
    generations: [u64; 3],
    modules: Listing<CommandNode>,
    root_variables: Listing<TypedValue>,
    selected_module: Option<CommandNode>,
    commands: Listing<CommandNode>,
    module_variables: Listing<TypedValue>,
    selected_command: Option<CommandNode>,
    arguments: LoadState,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NavState {
        match (&self.selected_module, &self.selected_command) {
            (Some(_), Some(_)) => NavState::CommandSelected,
            (Some(_), None) => NavState::ModuleSelected,
            _ => NavState::Root,
        }
    }

    pub fn generation(&self, level: Level) -> Generation {
        Generation(self.generations[level.index()])
    }

    /// Bumps `level` and every deeper level, invalidating their in-flight fetches.
    fn advance_from(&mut self, level: Level) -> Generation {
        for generation in &mut self.generations[level.index()..] {
            *generation += 1;
        }
        self.generation(level)
    }

    fn ticket(&mut self, level: Level, scope: ScopePath) -> FetchTicket {
        FetchTicket {
            level,
            generation: self.advance_from(level),
            scope,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.generation(ticket.level) == ticket.generation
    }

    /// Path of the selections down to `level`, names taken verbatim.
    pub fn scope_for(&self, level: Level) -> Result<ScopePath, NameError> {
        let module = self
            .selected_module
            .as_ref()
            .filter(|_| level != Level::Root);
        let command = self
            .selected_command
            .as_ref()
            .filter(|_| level == Level::Command);
        module
            .into_iter()
            .chain(command)
            .try_fold(ScopePath::root(), |scope, node| scope.child(node.name()))
    }

    fn clear_module_level(&mut self) {
        self.selected_module = None;
        self.commands = Listing::default();
        self.module_variables = Listing::default();
        self.clear_command_level();
    }

    fn clear_command_level(&mut self) {
        self.selected_command = None;
        self.arguments = LoadState::Idle;
    }

    /// Returns to the root and starts (re)loading the root listings.
    pub fn begin_root_load(&mut self) -> FetchTicket {
        self.clear_module_level();
        self.modules = Listing::loading();
        self.root_variables = Listing::loading();
        self.ticket(Level::Root, ScopePath::root())
    }

    pub fn select_module(&mut self, name: &str) -> Result<FetchTicket, PanelError> {
        let module = self
            .modules
            .items()
            .iter()
            .find(|module| module.name() == name)
            .cloned()
            .ok_or_else(|| PanelError::NotFound {
                level: Level::Module,
                name: name.to_string(),
            })?;
        let scope = ScopePath::root().child(module.name())?;

        self.clear_module_level();
        self.selected_module = Some(module);
        self.commands = Listing::loading();
        self.module_variables = Listing::loading();
        Ok(self.ticket(Level::Module, scope))
    }

    pub fn select_command(&mut self, name: &str) -> Result<FetchTicket, PanelError> {
        if self.selected_module.is_none() {
            return Err(PanelError::NoSelection(Level::Module));
        }
        let mut command = self
            .commands
            .items()
            .iter()
            .find(|command| command.name() == name)
            .cloned()
            .ok_or_else(|| PanelError::NotFound {
                level: Level::Command,
                name: name.to_string(),
            })?;
        let scope = self.scope_for(Level::Module)?.child(command.name())?;

        // Arguments come only from the command's own variable listing.
        command.clear_arguments();
        self.clear_command_level();
        self.selected_command = Some(command);
        self.arguments = LoadState::Loading;
        Ok(self.ticket(Level::Command, scope))
    }

    /// Applies a child-command listing. Returns `false` when the ticket is stale.
    pub fn apply_commands(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<CommandNode>, PanelError>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!(level = %ticket.level, scope = %ticket.scope, "discarding superseded command listing");
            return false;
        }
        match ticket.level {
            Level::Root => self.modules.resolve(result),
            Level::Module => self.commands.resolve(result),
            Level::Command => {
                debug!(scope = %ticket.scope, "command level has no child commands");
                return false;
            }
        }
        true
    }

    /// Applies a variable listing; at command level the variables are the arguments.
    pub fn apply_variables(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<TypedValue>, PanelError>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!(level = %ticket.level, scope = %ticket.scope, "discarding superseded variable listing");
            return false;
        }
        match ticket.level {
            Level::Root => self.root_variables.resolve(result),
            Level::Module => self.module_variables.resolve(result),
            Level::Command => {
                let Some(command) = self.selected_command.as_mut() else {
                    return false;
                };
                let outcome = result.and_then(|arguments| {
                    command
                        .replace_arguments(arguments)
                        .map_err(PanelError::from)
                });
                self.arguments = match outcome {
                    Ok(()) => LoadState::Ready,
                    Err(err) => {
                        command.clear_arguments();
                        LoadState::Failed(err.to_string())
                    }
                };
            }
        }
        true
    }

    pub fn modules(&self) -> &Listing<CommandNode> {
        &self.modules
    }

    pub fn root_variables(&self) -> &Listing<TypedValue> {
        &self.root_variables
    }

    pub fn selected_module(&self) -> Option<&CommandNode> {
        self.selected_module.as_ref()
    }

    pub fn commands(&self) -> &Listing<CommandNode> {
        &self.commands
    }

    pub fn module_variables(&self) -> &Listing<TypedValue> {
        &self.module_variables
    }

    pub fn selected_command(&self) -> Option<&CommandNode> {
        self.selected_command.as_ref()
    }

    pub fn arguments_state(&self) -> &LoadState {
        &self.arguments
    }

    /// Arguments of the selected command; empty when nothing is selected.
    pub fn arguments(&self) -> &[TypedValue] {
        self.selected_command
            .as_ref()
            .map(CommandNode::arguments)
            .unwrap_or_default()
    }

    pub fn variables(&self, level: Level) -> &[TypedValue] {
        match level {
            Level::Root => self.root_variables.items(),
            Level::Module => self.module_variables.items(),
            Level::Command => self.arguments(),
        }
    }

    pub fn variable(&self, level: Level, name: &str) -> Option<&TypedValue> {
        self.variables(level)
            .iter()
            .find(|variable| variable.name() == name)
    }

    pub fn edit_variable(
        &mut self,
        level: Level,
        name: &str,
        candidate: &str,
    ) -> Result<(), ValidationError> {
        if level == Level::Command {
            return self.edit_argument(name, candidate);
        }
        let listing = match level {
            Level::Root => &mut self.root_variables,
            _ => &mut self.module_variables,
        };
        let variable = listing
            .items
            .iter_mut()
            .find(|variable| variable.name() == name)
            .ok_or_else(|| ValidationError::new(name, format!("a {level} variable"), candidate))?;
        variable.edit(candidate)
    }

    pub fn edit_argument(&mut self, name: &str, candidate: &str) -> Result<(), ValidationError> {
        match self.selected_command.as_mut() {
            Some(command) => command.edit_argument(name, candidate),
            None => Err(ValidationError::new(name, "a selected command", candidate)),
        }
    }

    pub fn edit_argument_at(&mut self, index: usize, candidate: &str) -> Result<(), ValidationError> {
        match self.selected_command.as_mut() {
            Some(command) => command.edit_argument_at(index, candidate),
            None => Err(ValidationError::new(
                format!("argument #{}", index + 1),
                "a selected command",
                candidate,
            )),
        }
    }

    /// The selected command together with the scope it runs in (its module).
    /// Fails until the command's argument listing has loaded.
    pub fn command_for_submit(&self) -> Result<(CommandNode, ScopePath), PanelError> {
        let command = self
            .selected_command
            .as_ref()
            .ok_or(PanelError::NoSelection(Level::Command))?;
        let reason = match &self.arguments {
            LoadState::Ready => return Ok((command.clone(), self.scope_for(Level::Module)?)),
            LoadState::Idle => "not requested".to_string(),
            LoadState::Loading => "still loading".to_string(),
            LoadState::Failed(message) => message.clone(),
        };
        Err(PanelError::ArgumentsUnavailable {
            command: command.name().to_string(),
            reason,
        })
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;

use std::collections::HashSet;

use shared::{
    domain::validate_name,
    protocol::{CommandDescription, Invocation},
};

use crate::{
    error::{DescriptionError, ValidationError},
    typed_value::TypedValue,
};

/// A remote module or command with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandNode {
    name: String,
    arguments: Vec<TypedValue>,
    has_children: bool,
    confirm: Option<String>,
}

impl CommandNode {
    pub fn new(name: impl Into<String>, has_children: bool) -> Result<Self, DescriptionError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            arguments: Vec::new(),
            has_children,
            confirm: None,
        })
    }

    pub fn from_description(desc: &CommandDescription) -> Result<Self, DescriptionError> {
        if desc.name.is_empty() {
            return Err(DescriptionError::MissingName);
        }
        validate_name(&desc.name)?;

        let arguments = match &desc.args {
            None => Vec::new(),
            Some(args) => args
                .iter()
                .map(TypedValue::from_description)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| DescriptionError::MalformedArguments {
                    name: desc.name.clone(),
                    reason: err.to_string(),
                })?,
        };
        ensure_unique(&desc.name, &arguments)?;

        Ok(Self {
            name: desc.name.clone(),
            arguments,
            has_children: desc.has_children,
            confirm: desc.confirm.clone().filter(|question| !question.is_empty()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[TypedValue] {
        &self.arguments
    }

    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// Question the user must acknowledge before the command runs.
    pub fn confirm(&self) -> Option<&str> {
        self.confirm.as_deref()
    }

    pub fn replace_arguments(&mut self, arguments: Vec<TypedValue>) -> Result<(), DescriptionError> {
        ensure_unique(&self.name, &arguments)?;
        self.arguments = arguments;
        Ok(())
    }

    pub(crate) fn clear_arguments(&mut self) {
        self.arguments.clear();
    }

    pub fn edit_argument(&mut self, name: &str, candidate: &str) -> Result<(), ValidationError> {
        let command = self.name.clone();
        let argument = self
            .arguments
            .iter_mut()
            .find(|argument| argument.name() == name)
            .ok_or_else(|| {
                ValidationError::new(name, format!("an argument of {command}"), candidate)
            })?;
        argument.edit(candidate)
    }

    pub fn edit_argument_at(&mut self, index: usize, candidate: &str) -> Result<(), ValidationError> {
        let count = self.arguments.len();
        let argument = self.arguments.get_mut(index).ok_or_else(|| {
            ValidationError::new(
                format!("argument #{}", index + 1),
                format!("at most {count} arguments"),
                candidate,
            )
        })?;
        argument.edit(candidate)
    }

    /// Serialises the arguments in declaration order. Fails on the first invalid one.
    pub fn build_invocation_payload(&self) -> Result<Invocation, ValidationError> {
        let mut args = Vec::with_capacity(self.arguments.len());
        for argument in &self.arguments {
            argument.check()?;
            args.push(argument.to_wire_value());
        }
        Ok(Invocation {
            name: self.name.clone(),
            args,
        })
    }
}

fn ensure_unique(command: &str, arguments: &[TypedValue]) -> Result<(), DescriptionError> {
    let mut seen = HashSet::new();
    for argument in arguments {
        if !seen.insert(argument.name()) {
            return Err(DescriptionError::MalformedArguments {
                name: command.to_string(),
                reason: format!("duplicate argument '{}'", argument.name()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/command_node_tests.rs"]
mod tests;

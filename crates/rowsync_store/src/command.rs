//! Commands and parameters executed by a store.

use crate::value::{DataType, Value};
use std::time::Duration;

/// Default per-statement timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Statement text.
    Text,
    /// Name of a stored procedure.
    StoredProcedure,
}

/// Direction of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDirection {
    /// Value sent to the store.
    In,
    /// Value assigned by the store.
    Out,
    /// Sent and then reassigned by the store.
    InOut,
    /// Receives the command's return value.
    ReturnValue,
}

impl ParameterDirection {
    /// Returns true if the value is sent to the store.
    #[must_use]
    pub fn is_input(self) -> bool {
        matches!(self, ParameterDirection::In | ParameterDirection::InOut)
    }

    /// Returns true if the store assigns a value after execution.
    #[must_use]
    pub fn is_output(self) -> bool {
        matches!(self, ParameterDirection::Out | ParameterDirection::InOut)
    }
}

/// Which version of a row a templated parameter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceVersion {
    /// The row's current (edited) value.
    Current,
    /// The value the row had when it was loaded.
    Original,
}

/// A named, typed parameter of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Name including the dialect's marker, e.g. `:p1` or `@p1`.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
    /// Direction.
    pub direction: ParameterDirection,
    /// Bound value; outputs hold the store-assigned value after execution.
    pub value: Value,
    /// Column this parameter is bound to when the command is a row template.
    pub source_column: Option<String>,
    /// Version of the source column to read.
    pub source_version: SourceVersion,
}

impl Parameter {
    /// Creates an input parameter with a NULL value.
    pub fn input(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            direction: ParameterDirection::In,
            value: Value::Null,
            source_column: None,
            source_version: SourceVersion::Current,
        }
    }

    /// Creates an output parameter.
    pub fn output(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            direction: ParameterDirection::Out,
            ..Self::input(name, data_type)
        }
    }

    /// Sets the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the bound value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Binds the parameter to a row column.
    #[must_use]
    pub fn bound_to(mut self, column: impl Into<String>, version: SourceVersion) -> Self {
        self.source_column = Some(column.into());
        self.source_version = version;
        self
    }
}

/// A single statement (or stored procedure call) with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// How `text` is interpreted.
    pub kind: CommandKind,
    /// Statement text or procedure name.
    pub text: String,
    /// Parameters in declaration order.
    pub parameters: Vec<Parameter>,
    /// Per-statement timeout. Zero means no limit.
    pub timeout: Duration,
}

impl Command {
    /// Creates a text command.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Text,
            text: text.into(),
            parameters: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Creates a stored procedure call.
    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::StoredProcedure,
            ..Self::text(name)
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Looks up a parameter by name for modification.
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    /// Iterates over parameters the store assigns after execution.
    pub fn outputs(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.direction.is_output())
    }
}

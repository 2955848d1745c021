//! Results of executing a command.

use crate::command::{Command, ParameterDirection};
use crate::value::{DataType, FromValue, Value};

/// Rows returned by a query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Row values, each aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Creates an empty result set with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Returns the position of a column, matching exactly and then
    /// ignoring ASCII case.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
    }

    /// Returns the first value of the first row.
    #[must_use]
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Typed outcome of a scalar read.
///
/// Distinguishes the cases a plain default value would hide.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<T> {
    /// The command produced no rows.
    NoRows,
    /// The first value was NULL.
    Null,
    /// The first value has a type that cannot be read as `T`.
    TypeMismatch {
        /// Type the caller asked for.
        expected: DataType,
        /// Type the store returned.
        found: DataType,
    },
    /// The value.
    Present(T),
}

impl<T> Scalar<T> {
    /// Returns the value if present.
    pub fn present(self) -> Option<T> {
        match self {
            Scalar::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true if a value is present.
    pub fn is_present(&self) -> bool {
        matches!(self, Scalar::Present(_))
    }
}

/// What a store reports after executing a command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Execution {
    /// Rows inserted, updated or deleted across all statements.
    pub rows_affected: u64,
    /// Rows produced by the last statement that returned columns.
    pub result_set: Option<ResultSet>,
}

impl Execution {
    /// Creates an execution for a statement that returned no rows.
    #[must_use]
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            result_set: None,
        }
    }

    /// Reads the first column of the first row as `T`.
    pub fn scalar<T: FromValue>(&self) -> Scalar<T> {
        let Some(value) = self.result_set.as_ref().and_then(ResultSet::first_value) else {
            return Scalar::NoRows;
        };
        let Some(found) = value.data_type() else {
            return Scalar::Null;
        };
        match T::from_value(value) {
            Some(v) => Scalar::Present(v),
            None => Scalar::TypeMismatch {
                expected: T::DATA_TYPE,
                found,
            },
        }
    }

    /// Writes store-assigned values into the command's output parameters.
    ///
    /// The k-th Out/InOut parameter takes column k of the first row of the
    /// result set; ReturnValue parameters take the rows affected. Outputs
    /// with no matching column keep their value.
    pub fn assign_outputs(&self, command: &mut Command) {
        let first_row = self.result_set.as_ref().and_then(|rs| rs.rows.first());
        let mut column = 0;
        for param in &mut command.parameters {
            match param.direction {
                ParameterDirection::Out | ParameterDirection::InOut => {
                    if let Some(value) = first_row.and_then(|row| row.get(column)) {
                        param.value = value.clone();
                    }
                    column += 1;
                }
                ParameterDirection::ReturnValue => {
                    let affected = i64::try_from(self.rows_affected).unwrap_or(i64::MAX);
                    param.value = Value::Integer(affected);
                }
                ParameterDirection::In => {}
            }
        }
    }
}

//! The operation table of a class under analysis.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Translated name of the boolean type.
pub const BOOL_TYPE: &str = "bool";

/// One entry of a class's member table.
///
/// `parameter_types` lists the user-supplied parameters only; the implicit
/// receiver of an instance operation is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Operation {
    /// `Class#method`.
    pub qualified_name: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub parameter_types: Vec<String>,
    /// `None` for operations without a result.
    #[serde(default)]
    pub return_type: Option<String>,
}

impl Operation {
    /// Create an instance operation.
    pub fn new(
        qualified_name: impl Into<String>,
        parameter_types: Vec<String>,
        return_type: Option<&str>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            is_static: false,
            parameter_types,
            return_type: return_type.map(str::to_string),
        }
    }

    /// Name without the class qualifier.
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit_once('#')
            .map_or(self.qualified_name.as_str(), |(_, name)| name)
    }

    pub fn returns_bool(&self) -> bool {
        self.return_type.as_deref() == Some(BOOL_TYPE)
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.simple_name(),
            self.parameter_types.join(", ")
        )
    }
}

/// Pre-built view of a class: its name and its operation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassModel {
    pub name: String,
    pub operations: Vec<Operation>,
}

impl ClassModel {
    pub fn new(name: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            name: name.into(),
            operations,
        }
    }

    /// Qualified name of a member of this class.
    pub fn qualify(&self, member: &str) -> String {
        format!("{}#{}", self.name, member)
    }

    /// Instance operations grouped by qualified name, in declaration order.
    pub fn instance_operations_by_name(&self) -> IndexMap<&str, Vec<&Operation>> {
        let mut groups: IndexMap<&str, Vec<&Operation>> = IndexMap::new();
        for op in self.operations.iter().filter(|op| !op.is_static) {
            groups.entry(op.qualified_name.as_str()).or_default().push(op);
        }
        groups
    }

    pub fn find(&self, qualified_name: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.qualified_name == qualified_name)
    }
}

//! Guarded operations and the class invariant.

use crate::class::Operation;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A guarded operation: the precondition predicate and the operation it guards.
///
/// Both share one parameter signature and the precondition returns a boolean;
/// [`ActionSetBuilder`](crate::ActionSetBuilder) is the only place that checks
/// this. Cloning is an atomic increment.
#[derive(Clone)]
pub struct Action(Arc<ActionInner>);

struct ActionInner {
    precondition: Operation,
    operation: Operation,
}

impl Action {
    pub fn new(precondition: Operation, operation: Operation) -> Self {
        Action(Arc::new(ActionInner {
            precondition,
            operation,
        }))
    }

    pub fn precondition(&self) -> &Operation {
        &self.0.precondition
    }

    pub fn operation(&self) -> &Operation {
        &self.0.operation
    }

    /// Unqualified name of the guarded operation.
    pub fn name(&self) -> &str {
        self.0.operation.simple_name()
    }

    pub fn parameter_types(&self) -> &[String] {
        &self.0.operation.parameter_types
    }

    fn key(&self) -> (&Operation, &Operation) {
        (&self.0.operation, &self.0.precondition)
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.key() == other.key()
    }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.operation.fmt(f)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.0.operation)
    }
}

/// The class invariant: a nullary boolean predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Invariant(Operation);

impl Invariant {
    pub(crate) fn new(operation: Operation) -> Self {
        Invariant(operation)
    }

    pub fn operation(&self) -> &Operation {
        &self.0
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn action(name: &str) -> Action {
        Action::new(
            Operation::new(format!("C#{name}_pre"), vec![], Some("bool")),
            Operation::new(format!("C#{name}"), vec![], None),
        )
    }

    #[test]
    fn test_identity_is_structural() {
        let a1 = action("push");
        let a2 = action("push");
        assert_eq!(a1, a2);

        let mut set = HashSet::new();
        set.insert(a1);
        assert!(!set.insert(a2));
        assert!(set.insert(action("pop")));
    }

    #[test]
    fn test_ordering_by_operation_name() {
        let mut actions = vec![action("push"), action("clear"), action("pop")];
        actions.sort();
        let names: Vec<_> = actions.iter().map(Action::name).collect();
        assert_eq!(names, ["clear", "pop", "push"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(action("push").to_string(), "push()");
        assert_eq!(format!("{:?}", action("push")), "Action(push())");
    }
}

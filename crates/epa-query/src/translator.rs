//! The bytecode-to-verification-language collaborator.

use epa_model::{ClassModel, Operation};

/// Produces verification-program text for a class and its operations.
///
/// The construction core treats the output as opaque text; it only relies on
/// [`procedure_name`](Translator::procedure_name) to call the translated
/// operations from query procedures.
pub trait Translator: Send + Sync {
    /// Preamble establishing the heap, array and exception model.
    fn translate_base_class(&self, class: &ClassModel) -> String;

    /// Procedure implementing one operation.
    fn translate_method(&self, operation: &Operation) -> String;

    /// Name of the procedure produced by `translate_method`.
    fn procedure_name(&self, operation: &Operation) -> String {
        operation.qualified_name.replace('#', "$")
    }

    /// Global variables a query procedure may modify.
    fn modified_globals(&self) -> Vec<String> {
        Vec::new()
    }

    /// Preamble followed by every operation of the class.
    fn base_translation(&self, class: &ClassModel) -> String {
        let mut out = self.translate_base_class(class);
        for op in &class.operations {
            out.push('\n');
            out.push_str(&self.translate_method(op));
        }
        out
    }
}

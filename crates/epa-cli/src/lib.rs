//! Support library for the `epa` binary.

pub mod class_file;

pub use class_file::{ClassDescription, ClassFileError, FileTranslator};

//! JSON class descriptions and the translator backed by them.
//!
//! A description carries the operation table of the class, the
//! verification-language preamble, one pre-translated procedure per
//! operation and the initially enabled actions:
//!
//! ```json
//! {
//!   "class": "Door",
//!   "operations": [{ "qualified_name": "Door#open", "parameter_types": [] }],
//!   "preamble": "var $Exception: Ref;",
//!   "fragments": { "Door#open": "procedure Door$open(this: Ref) { }" },
//!   "modifies": ["$Exception"],
//!   "initial_state": ["open"]
//! }
//! ```

use epa_model::{ActionSet, ClassModel, Operation, State};
use epa_query::Translator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid class description {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("operation '{name}' has no translated fragment")]
    MissingFragment { name: String },

    #[error("unknown action '{name}' in initial state")]
    UnknownInitialAction { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescription {
    pub class: String,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub preamble: String,
    /// Procedure text keyed by qualified operation name.
    #[serde(default)]
    pub fragments: BTreeMap<String, String>,
    /// Globals the translated operations modify.
    #[serde(default)]
    pub modifies: Vec<String>,
    /// Names of the initially enabled actions.
    #[serde(default)]
    pub initial_state: Vec<String>,
}

impl ClassDescription {
    pub fn load(path: &Path) -> Result<Self, ClassFileError> {
        let text = fs::read_to_string(path).map_err(|source| ClassFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ClassFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn class_model(&self) -> ClassModel {
        ClassModel::new(self.class.clone(), self.operations.clone())
    }

    /// Translator serving this description's fragments.
    /// Every operation must have one.
    pub fn translator(&self) -> Result<FileTranslator, ClassFileError> {
        if let Some(op) = self
            .operations
            .iter()
            .find(|op| !self.fragments.contains_key(&op.qualified_name))
        {
            return Err(ClassFileError::MissingFragment {
                name: op.qualified_name.clone(),
            });
        }
        Ok(FileTranslator {
            preamble: self.preamble.clone(),
            fragments: self.fragments.clone(),
            modifies: self.modifies.clone(),
        })
    }

    pub fn initial_state(&self, actions: &ActionSet) -> Result<State, ClassFileError> {
        actions
            .state_of(self.initial_state.iter().map(String::as_str))
            .map_err(|name| ClassFileError::UnknownInitialAction {
                name: name.to_string(),
            })
    }
}

/// [`Translator`] returning pre-translated text verbatim.
#[derive(Debug, Clone)]
pub struct FileTranslator {
    preamble: String,
    fragments: BTreeMap<String, String>,
    modifies: Vec<String>,
}

impl Translator for FileTranslator {
    fn translate_base_class(&self, _class: &ClassModel) -> String {
        self.preamble.clone()
    }

    fn translate_method(&self, operation: &Operation) -> String {
        self.fragments
            .get(&operation.qualified_name)
            .cloned()
            .unwrap_or_default()
    }

    fn modified_globals(&self) -> Vec<String> {
        self.modifies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHT: &str = r#"{
        "class": "Light",
        "operations": [
            { "qualified_name": "Light#inv", "return_type": "bool" },
            { "qualified_name": "Light#on" },
            { "qualified_name": "Light#on_pre", "return_type": "bool" }
        ],
        "preamble": "var $Exception: Ref;",
        "fragments": {
            "Light#inv": "procedure Light$inv(this: Ref) returns (r: bool) { r := true; }",
            "Light#on": "procedure Light$on(this: Ref) { }",
            "Light#on_pre": "procedure Light$on_pre(this: Ref) returns (r: bool) { r := true; }"
        },
        "modifies": ["$Exception"],
        "initial_state": ["on"]
    }"#;

    #[test]
    fn test_parse_and_translate() {
        let desc = ClassDescription::from_json(LIGHT).unwrap();
        let class = desc.class_model();
        assert_eq!(class.name, "Light");
        assert_eq!(class.operations.len(), 3);

        let translator = desc.translator().unwrap();
        let base = translator.base_translation(&class);
        assert!(base.starts_with("var $Exception: Ref;"));
        assert!(base.contains("procedure Light$on(this: Ref) { }"));
        assert_eq!(translator.modified_globals(), vec!["$Exception"]);

        let actions = ActionSet::extract(&class).unwrap();
        let initial = desc.initial_state(&actions).unwrap();
        assert_eq!(initial.to_string(), "{on()}");
    }

    #[test]
    fn test_missing_fragment() {
        let mut desc = ClassDescription::from_json(LIGHT).unwrap();
        desc.fragments.remove("Light#on_pre");
        let err = desc.translator().unwrap_err();
        assert!(matches!(err, ClassFileError::MissingFragment { name } if name == "Light#on_pre"));
    }

    #[test]
    fn test_unknown_initial_action() {
        let mut desc = ClassDescription::from_json(LIGHT).unwrap();
        desc.initial_state = vec!["off".into()];
        let actions = ActionSet::extract(&desc.class_model()).unwrap();
        let err = desc.initial_state(&actions).unwrap_err();
        assert_eq!(err.to_string(), "unknown action 'off' in initial state");
    }

    #[test]
    fn test_empty_initial_state_defaults() {
        let text = r#"{ "class": "Empty", "operations": [] }"#;
        let desc = ClassDescription::from_json(text).unwrap();
        assert!(desc.initial_state.is_empty());
        assert!(desc.preamble.is_empty());
    }

    #[test]
    fn test_load_reports_path() {
        let err = ClassDescription::load(Path::new("/nonexistent/class.json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read /nonexistent/class.json"));
    }
}

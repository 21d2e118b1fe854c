//! A worker's growing verification program.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// One appended piece of program text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Procedure name for query fragments, `None` for the base translation.
    pub name: Option<String>,
    pub text: String,
}

/// Ordered log of program fragments mirrored to a temporary file.
///
/// The file always equals the concatenation of [`fragments`](Self::fragments),
/// so the program can be replayed from the log. Appending a query whose
/// procedure is already present is a no-op.
pub struct ProgramBuffer {
    file: NamedTempFile,
    fragments: Vec<Fragment>,
    names: HashSet<String>,
}

impl ProgramBuffer {
    /// Start a program from the base translation, in the system temp dir.
    pub fn new(base: &str) -> io::Result<Self> {
        Self::create(base, None)
    }

    /// Like [`new`](Self::new), placing the file under `dir` if given.
    pub fn create(base: &str, dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("epa-").suffix(".bpl");
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let mut buffer = Self {
            file,
            fragments: Vec::new(),
            names: HashSet::new(),
        };
        buffer.write_fragment(Fragment {
            name: None,
            text: base.to_string(),
        })?;
        debug!(path = %buffer.path().display(), "program created");
        Ok(buffer)
    }

    /// Append a query procedure. Returns false if `name` was already present.
    pub fn append(&mut self, name: &str, text: &str) -> io::Result<bool> {
        if self.names.contains(name) {
            return Ok(false);
        }
        self.write_fragment(Fragment {
            name: Some(name.to_string()),
            text: text.to_string(),
        })?;
        self.names.insert(name.to_string());
        Ok(true)
    }

    fn write_fragment(&mut self, fragment: Fragment) -> io::Result<()> {
        let file = self.file.as_file_mut();
        file.write_all(b"\n")?;
        file.write_all(fragment.text.as_bytes())?;
        file.flush()?;
        self.fragments.push(fragment);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of query procedures appended so far.
    pub fn query_count(&self) -> usize {
        self.names.len()
    }

    /// Full program text, as written to the file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            out.push('\n');
            out.push_str(&fragment.text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mirrors_fragments() {
        let mut p = ProgramBuffer::new("var $Heap: int;").unwrap();
        assert!(p.append("q1", "procedure q1() {}").unwrap());
        assert!(p.append("q2", "procedure q2() {}").unwrap());

        let on_disk = std::fs::read_to_string(p.path()).unwrap();
        assert_eq!(on_disk, p.render());
        assert_eq!(p.fragments().len(), 3);
        assert_eq!(p.fragments()[0].name, None);
        assert_eq!(p.fragments()[2].name.as_deref(), Some("q2"));
        assert_eq!(p.query_count(), 2);
    }

    #[test]
    fn test_duplicate_procedure_is_skipped() {
        let mut p = ProgramBuffer::new("").unwrap();
        assert!(p.append("q", "procedure q() {}").unwrap());
        assert!(!p.append("q", "procedure q() { assert false; }").unwrap());
        assert_eq!(p.query_count(), 1);
        assert!(!p.render().contains("assert false"));
    }

    #[test]
    fn test_create_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let p = ProgramBuffer::create("", Some(dir.path())).unwrap();
        assert!(p.path().starts_with(dir.path()));
        assert!(p.path().extension().is_some_and(|e| e == "bpl"));
    }
}

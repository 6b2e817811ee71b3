use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::{ChangeToken, SourceProvider, TemplateSource};
use crate::error::{Error, Result};

/// Loads templates from a base directory.
///
/// Template names map to `<base_dir>/<name>.<extension>`; names may use `/`
/// as a separator but must stay inside the base directory.
#[derive(Debug, Clone)]
pub struct FileSystemProvider {
    base_dir: PathBuf,
    extension: String,
}

impl FileSystemProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: "html".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.starts_with('/')
            || name.contains('\\')
            || name.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(Error::TemplateNotFound(name.to_string()));
        }
        let mut path = self.base_dir.clone();
        for seg in name.split('/') {
            path.push(seg);
        }
        let file_name = match path.file_name() {
            Some(stem) => format!("{}.{}", stem.to_string_lossy(), self.extension),
            None => return Err(Error::TemplateNotFound(name.to_string())),
        };
        path.set_file_name(file_name);
        Ok(path)
    }

    fn mtime_secs(path: &Path) -> Option<u64> {
        std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
    }
}

impl SourceProvider for FileSystemProvider {
    fn fetch(&self, name: &str) -> Result<TemplateSource> {
        let path = self.resolve_path(name)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::TemplateNotFound(name.to_string()));
            }
            Err(err) => {
                return Err(Error::Io(format!(
                    "reading '{}': {}",
                    path.display(),
                    err
                )));
            }
        };
        let change_token = match Self::mtime_secs(&path) {
            Some(mtime) => ChangeToken::Stamp(mtime),
            None => ChangeToken::Always,
        };
        Ok(TemplateSource {
            name: name.to_string(),
            text,
            change_token,
        })
    }

    fn change_token(&self, name: &str) -> ChangeToken {
        match self.resolve_path(name) {
            Ok(path) => match Self::mtime_secs(&path) {
                Some(mtime) => ChangeToken::Stamp(mtime),
                None => ChangeToken::Always,
            },
            Err(_) => ChangeToken::Always,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "hello").unwrap();

        let provider = FileSystemProvider::new(dir.path());
        let source = provider.fetch("page").unwrap();
        assert_eq!(source.text, "hello");
        match source.change_token {
            ChangeToken::Stamp(_) => {}
            other => panic!("Expected Stamp, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_names_use_slash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("admin")).unwrap();
        std::fs::write(dir.path().join("admin/index.html"), "admin").unwrap();

        let provider = FileSystemProvider::new(dir.path());
        assert_eq!(provider.fetch("admin/index").unwrap().text, "admin");
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSystemProvider::new(dir.path());
        for name in ["../secret", "a/../../b", "/etc/passwd", "a\\b", ""] {
            match provider.fetch(name) {
                Err(Error::TemplateNotFound(_)) => {}
                other => panic!("Expected TemplateNotFound for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_missing_file_is_not_found_and_always_stale() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSystemProvider::new(dir.path());
        match provider.fetch("missing") {
            Err(Error::TemplateNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("Expected TemplateNotFound, got {:?}", other),
        }
        assert_eq!(provider.change_token("missing"), ChangeToken::Always);
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.tpl"), "x").unwrap();
        let provider = FileSystemProvider::new(dir.path()).with_extension(".tpl");
        assert_eq!(provider.fetch("page").unwrap().text, "x");
    }
}

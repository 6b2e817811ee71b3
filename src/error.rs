use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sablon template engine.
///
/// Every variant carries owned data so the enum can derive `Clone`; a failed
/// resolution is handed verbatim to every concurrent request that joined the
/// in-flight resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("syntax error in '{name}' at {line}:{column}: {message}")]
    Syntax {
        name: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("'{name}' line {line}: extends must be the first statement of the template")]
    MisplacedExtends { name: String, line: usize },

    #[error("'{name}' line {line}: a template may only extend a single parent")]
    MultipleInheritance { name: String, line: usize },

    #[error(
        "'{name}' line {line}: block '{block}' must be at the top level \
         or inside another block"
    )]
    InvalidBlockPlacement {
        name: String,
        block: String,
        line: usize,
    },

    #[error("'{name}' line {line}: block '{block}' is declared more than once")]
    DuplicateBlockName {
        name: String,
        block: String,
        line: usize,
    },

    #[error("circular inheritance: {}", .path.join(" -> "))]
    CircularInheritance { path: Vec<String> },

    #[error(
        "super({requested}) in block '{block}': only {available} ancestor \
         override(s) available"
    )]
    SuperOutOfRange {
        block: String,
        requested: usize,
        available: usize,
    },

    #[error("render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// True for structural errors detected before rendering starts.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Syntax { .. }
                | Error::MisplacedExtends { .. }
                | Error::MultipleInheritance { .. }
                | Error::InvalidBlockPlacement { .. }
                | Error::DuplicateBlockName { .. }
                | Error::CircularInheritance { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_position() {
        let err = Error::Syntax {
            name: "page".to_string(),
            line: 3,
            column: 7,
            message: "unterminated expression".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "syntax error in 'page' at 3:7: unterminated expression"
        );
    }

    #[test]
    fn test_circular_display_joins_path() {
        let err = Error::CircularInheritance {
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "circular inheritance: a -> b -> a");
    }

    #[test]
    fn test_structural_classification() {
        assert!(Error::MisplacedExtends {
            name: "x".to_string(),
            line: 1
        }
        .is_structural());
        assert!(!Error::SuperOutOfRange {
            block: "x".to_string(),
            requested: 2,
            available: 1
        }
        .is_structural());
        assert!(!Error::TemplateNotFound("x".to_string()).is_structural());
    }
}

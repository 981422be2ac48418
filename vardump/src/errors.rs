///
/// Error types for the export engine.
///
/// Import resolution, closure source recovery and configuration loading each
/// have their own enum. Value export itself never fails.
///

use std::path::PathBuf;
use thiserror::Error;

use crate::source::Span;

#[derive(Debug, Error)]
pub enum UseError {
    #[error("File \"{}\" does not exist.", path.display())]
    FileNotFound { path: PathBuf },

    #[error("File \"{}\" is not readable.", path.display())]
    FileUnreadable { path: PathBuf },
}

impl UseError {
    pub fn path(&self) -> &PathBuf {
        match self {
            UseError::FileNotFound { path } | UseError::FileUnreadable { path } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClosureError {
    #[error("Failed to resolve imports: {0}")]
    Resolve(#[from] UseError),

    #[error("Position {line}:{column} is outside of {}", path.display())]
    PositionOutOfRange {
        path: PathBuf,
        line: u32,
        column: u32,
    },

    #[error("No closure found on line {line} of {}", path.display())]
    NotFound { path: PathBuf, line: u32, span: Span },

    #[error("Closure starting in {} is never closed", path.display())]
    Unterminated { path: PathBuf, span: Span },
}

impl ClosureError {
    /// Source span the error points at, when there is one.
    pub fn span(&self) -> Option<Span> {
        match self {
            ClosureError::NotFound { span, .. } | ClosureError::Unterminated { span, .. } => {
                Some(*span)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = UseError::FileNotFound {
            path: PathBuf::from("/tmp/missing.php"),
        };
        assert_eq!(err.to_string(), "File \"/tmp/missing.php\" does not exist.");

        let err = UseError::FileUnreadable {
            path: PathBuf::from("/tmp/locked.php"),
        };
        assert_eq!(err.to_string(), "File \"/tmp/locked.php\" is not readable.");

        let err = ClosureError::NotFound {
            path: PathBuf::from("src/app.php"),
            line: 12,
            span: Span::new(40, 41),
        };
        assert!(err.to_string().contains("line 12"));
        assert!(err.to_string().contains("src/app.php"));
        assert_eq!(err.span(), Some(Span::new(40, 41)));

        let err = ClosureError::from(UseError::FileNotFound {
            path: PathBuf::from("gone.php"),
        });
        assert!(err.to_string().contains("gone.php"));
        assert!(err.span().is_none());

        let err = ClosureError::PositionOutOfRange {
            path: PathBuf::from("a.php"),
            line: 99,
            column: 1,
        };
        assert!(err.to_string().contains("99:1"));
    }
}

///
/// # Configuration
///
/// Export and dump settings loaded from a `vardump.toml` file. Every field
/// has a default, so an empty file (or no file at all) is valid.
///
/// ## Example vardump.toml
///
/// ```toml
/// [export]
/// depth = 10
/// pretty = true
/// grammar = "native"   # or "ordinal"
///
/// [dump]
/// highlight = "auto"   # "auto", "always" or "never"
/// ```
///

use serde::Deserialize;
use std::path::Path;

use crate::errors::ConfigError;
use crate::export::{DEFAULT_DEPTH, GrammarTarget};

pub const CONFIG_FILE_NAME: &str = "vardump.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DumperConfig {
    pub export: ExportConfig,
    pub dump: DumpConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub depth: i32,
    pub pretty: bool,
    pub grammar: GrammarTarget,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            pretty: true,
            grammar: GrammarTarget::Native,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    pub highlight: Highlight,
}

/// When dumped output is wrapped in HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    /// Highlight only when running under a CGI-style gateway.
    #[default]
    Auto,
    Always,
    Never,
}

impl Highlight {
    pub fn resolve(self) -> bool {
        match self {
            Highlight::Auto => in_html_context(),
            Highlight::Always => true,
            Highlight::Never => false,
        }
    }
}

/// True when the process serves a web request rather than a terminal.
pub fn in_html_context() -> bool {
    std::env::var_os("GATEWAY_INTERFACE").is_some()
}

pub fn load_config(path: &Path) -> Result<DumperConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<DumperConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[export]
depth = 3
pretty = false
grammar = "ordinal"

[dump]
highlight = "never"
"#;
        let config = parse_config_str(toml).unwrap();
        assert_eq!(config.export.depth, 3);
        assert!(!config.export.pretty);
        assert_eq!(config.export.grammar, GrammarTarget::Ordinal);
        assert_eq!(config.dump.highlight, Highlight::Never);
        assert!(!config.dump.highlight.resolve());
    }

    #[test]
    fn test_defaults() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config, DumperConfig::default());
        assert_eq!(config.export.depth, 10);
        assert!(config.export.pretty);
        assert_eq!(config.export.grammar, GrammarTarget::Native);
        assert_eq!(config.dump.highlight, Highlight::Auto);

        let config = parse_config_str("[export]\ndepth = 2\n").unwrap();
        assert_eq!(config.export.depth, 2);
        assert!(config.export.pretty);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_config_str("[export]\ngrammar = \"binary\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dump]\nhighlight = \"always\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.dump.highlight, Highlight::Always);

        let err = load_config(Path::new("/nonexistent/vardump.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/vardump.toml"));
    }
}

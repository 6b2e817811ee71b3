use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory searched by the filesystem provider
    #[serde(default = "default_directory")]
    pub directory: String,

    /// File extension appended to template names
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Cache resolved templates between renders
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Revalidate cached templates against source change tokens.
    /// When false, cached entries are trusted until explicitly invalidated.
    #[serde(default = "default_true")]
    pub auto_reload: bool,
}

fn default_directory() -> String {
    "templates".to_string()
}

fn default_extension() -> String {
    "html".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            extension: default_extension(),
            cache_enabled: true,
            auto_reload: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.directory, "templates");
        assert_eq!(config.extension, "html");
        assert!(config.cache_enabled);
        assert!(config.auto_reload);
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let config: EngineConfig = serde_json::from_str(r#"{"directory": "views"}"#).unwrap();
        assert_eq!(config.directory, "views");
        assert_eq!(config.extension, "html");
        assert!(config.auto_reload);
    }
}

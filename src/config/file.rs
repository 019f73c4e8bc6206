//! Configuration file loading and updating.
//!
//! This module handles loading acton-model configuration from TOML files
//! at XDG-compliant locations, and rewriting a provider's base URL after
//! endpoint fallback.

use crate::config::types::ModelFileConfig;
use crate::llm::ModelError;
use std::path::{Path, PathBuf};

/// Default configuration file name for project-local config.
const LOCAL_CONFIG_NAME: &str = "acton-model.toml";

/// Default configuration file name within XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "acton-model";

/// Loads configuration from the default search paths.
///
/// Search order:
/// 1. `./acton-model.toml` (project-local)
/// 2. `~/.config/acton-model/config.toml` (XDG config)
///
/// Returns an empty configuration if no config file is found.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be parsed.
pub fn load() -> Result<ModelFileConfig, ModelError> {
    match find_config() {
        Some(path) => from_path(&path),
        None => Ok(ModelFileConfig::default()),
    }
}

/// Returns the first configuration file that exists on the search path.
#[must_use]
pub fn find_config() -> Option<PathBuf> {
    search_paths().into_iter().find(|path| path.exists())
}

/// Loads configuration from a specific file path.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file contains invalid TOML
/// - The TOML doesn't match the expected schema
pub fn from_path(path: &Path) -> Result<ModelFileConfig, ModelError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ModelError::invalid_config(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;

    from_str(&contents).map_err(|e| {
        ModelError::invalid_config(
            "config_file",
            format!("failed to parse '{}': {}", path.display(), e),
        )
    })
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or doesn't match the schema.
pub fn from_str(toml_str: &str) -> Result<ModelFileConfig, ModelError> {
    toml::from_str(toml_str)
        .map_err(|e| ModelError::invalid_config("config", format!("invalid TOML: {e}")))
}

/// Returns the paths that would be searched for configuration files.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];

    if let Some(config_dir) = xdg_config_dir() {
        paths.push(config_dir.join(XDG_CONFIG_NAME));
    }

    paths
}

/// Returns the path to the XDG config directory for acton-model.
///
/// This is `~/.config/acton-model` on most systems.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}

/// Rewrites `base_url` of provider `provider_name` in the file at `path`.
///
/// Only that one value changes; comments, ordering and formatting of the
/// rest of the file are kept.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or written, or has
/// no such provider.
pub fn persist_base_url(
    path: &Path,
    provider_name: &str,
    base_url: &str,
) -> Result<(), ModelError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ModelError::invalid_config(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;
    let mut document: toml_edit::DocumentMut = contents
        .parse()
        .map_err(|e| ModelError::invalid_config("config", format!("invalid TOML: {e}")))?;

    let provider = document
        .get_mut("providers")
        .and_then(toml_edit::Item::as_table_like_mut)
        .and_then(|providers| providers.get_mut(provider_name))
        .and_then(toml_edit::Item::as_table_like_mut)
        .ok_or_else(|| {
            ModelError::invalid_config(
                "providers",
                format!(
                    "no provider named '{}' in '{}'",
                    provider_name,
                    path.display()
                ),
            )
        })?;
    provider.insert("base_url", toml_edit::value(base_url));

    std::fs::write(path, document.to_string()).map_err(|e| {
        ModelError::invalid_config(
            "config_file",
            format!("failed to write '{}': {}", path.display(), e),
        )
    })?;

    tracing::info!(path = %path.display(), provider = provider_name, base_url, "updated base URL in config file");
    Ok(())
}

/// Returns an `on_base_url_persist` callback that saves to `path`.
///
/// Failures are logged, never raised.
pub fn base_url_persister(
    path: impl Into<PathBuf>,
    provider_name: impl Into<String>,
) -> impl Fn(&str) + Send + Sync + 'static {
    let path = path.into();
    let provider_name = provider_name.into();
    move |base_url: &str| {
        if let Err(e) = persist_base_url(&path, &provider_name, base_url) {
            tracing::warn!(error = %e, "could not persist base URL");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const ZAI_CONFIG: &str = r#"
default_provider = "glm"

[providers.glm]
type = "zai"
model = "glm-5"
base_url = "https://api.z.ai/api/paas/v4"
thinking_type = "enabled"

[providers.claude]
type = "anthropic"
model = "claude-sonnet-4-5"
"#;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn from_str_parses_multiple_providers() {
        let config = from_str(ZAI_CONFIG).unwrap();

        assert_eq!(config.default_provider, Some("glm".to_string()));
        assert_eq!(config.providers.len(), 2);
        assert_eq!(
            config.providers["glm"].thinking_type.as_deref(),
            Some("enabled")
        );
    }

    #[test]
    fn from_str_error_on_invalid_toml() {
        let err = from_str("this is not valid toml [[[").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn from_str_error_on_missing_model() {
        let err = from_str("[providers.x]\ntype = \"openai\"\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn from_path_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, ZAI_CONFIG);

        let config = from_path(&path).unwrap();

        assert!(config.providers.contains_key("claude"));
    }

    #[test]
    fn from_path_error_on_missing_file() {
        let err = from_path(Path::new("/nonexistent/path/config.toml")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn persist_base_url_rewrites_one_provider() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, ZAI_CONFIG);

        persist_base_url(&path, "glm", "https://api.z.ai/api/coding/paas/v4").unwrap();

        let config = from_path(&path).unwrap();
        assert_eq!(
            config.providers["glm"].base_url.as_deref(),
            Some("https://api.z.ai/api/coding/paas/v4")
        );
        assert_eq!(config.providers["glm"].thinking_type.as_deref(), Some("enabled"));
        assert!(config.providers["claude"].base_url.is_none());
        assert_eq!(config.default_provider.as_deref(), Some("glm"));
    }

    #[test]
    fn persist_base_url_keeps_comments_and_layout() {
        let temp_dir = TempDir::new().unwrap();
        let original = "# my models\ndefault_provider = \"glm\"\n\n[providers.glm]\ntype = \"zai\" # coding plan\nmodel = \"glm-5\"\nbase_url = \"https://api.z.ai/api/paas/v4\"\n";
        let path = write_config(&temp_dir, original);

        persist_base_url(&path, "glm", "https://api.z.ai/api/coding/paas/v4").unwrap();

        let updated = std::fs::read_to_string(&path).unwrap();
        assert!(updated.starts_with("# my models\n"));
        assert!(updated.contains("type = \"zai\" # coding plan\n"));
        assert!(updated.contains("base_url = \"https://api.z.ai/api/coding/paas/v4\""));
        assert!(!updated.contains("/api/paas/v4"));
    }

    #[test]
    fn persist_base_url_adds_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "[providers.glm]\ntype = \"zai\"\nmodel = \"glm-5\"\n");

        persist_base_url(&path, "glm", "https://api.z.ai/api/coding/paas/v4").unwrap();

        let config = from_path(&path).unwrap();
        assert_eq!(
            config.providers["glm"].base_url.as_deref(),
            Some("https://api.z.ai/api/coding/paas/v4")
        );
    }

    #[test]
    fn persist_base_url_unknown_provider_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, ZAI_CONFIG);

        let err = persist_base_url(&path, "nope", "https://x").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn base_url_persister_swallows_errors() {
        let persist = base_url_persister("/nonexistent/path/config.toml", "glm");
        persist("https://api.z.ai/api/coding/paas/v4");
    }

    #[test]
    fn search_paths_includes_local() {
        let paths = search_paths();

        assert!(paths
            .iter()
            .any(|p| p.file_name() == Some(std::ffi::OsStr::new(LOCAL_CONFIG_NAME))));
    }

    #[test]
    fn xdg_config_dir_returns_path() {
        if let Some(dir) = xdg_config_dir() {
            assert!(dir.ends_with(APP_NAME));
        }
    }
}

//! Configuration management for acton-model.
//!
//! This module loads named model providers from TOML files and turns them
//! into runtime [`ModelConfig`](crate::llm::ModelConfig)s.
//!
//! # Configuration File Format
//!
//! Configuration is stored in TOML format. The search order is:
//! 1. `./acton-model.toml` (project-local)
//! 2. `~/.config/acton-model/config.toml` (XDG config)
//!
//! # Example Configuration
//!
//! ```toml
//! default_provider = "glm"
//!
//! [providers.claude]
//! type = "anthropic"
//! model = "claude-opus-4-6"
//! api_key_env = "ANTHROPIC_API_KEY"
//! reasoning_effort = "high"
//!
//! [providers.glm]
//! type = "zai"
//! model = "glm-5"
//! base_url = "https://api.z.ai/api/coding/paas/v4"
//! thinking_type = "enabled"
//!
//! [providers.local]
//! type = "ollama"
//! model = "qwen2.5:7b"
//! first_byte_timeout_secs = 60
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use acton_model::config;
//!
//! let path = config::find_config();
//! let file = config::load()?;
//! let mut model_config = file.model_config(None)?;
//! if let Some(path) = path {
//!     let name = file.effective_default().unwrap_or_default().to_string();
//!     model_config = model_config.on_base_url_persist(config::base_url_persister(path, name));
//! }
//! let model = create_model(model_config)?;
//! ```

mod file;
mod types;

pub use file::{
    base_url_persister, find_config, from_path, from_str, load, persist_base_url, search_paths,
    xdg_config_dir,
};

pub use types::{ModelFileConfig, NamedModelConfig};

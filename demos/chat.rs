//! Example: Terminal Chat
//!
//! Streams answers from the default configured provider, keeping the
//! whole exchange in one conversation. Type a line to send it; an empty
//! line or EOF ends the session.
//!
//! # Configuration
//!
//! Create an `acton-model.toml` file in the project root or at
//! `~/.config/acton-model/config.toml`:
//!
//! ```toml
//! default_provider = "glm"
//!
//! [providers.glm]
//! type = "zai"
//! model = "glm-5"
//! api_key_env = "ZAI_API_KEY"
//! thinking_type = "enabled"
//! ```
//!
//! If the provider's endpoint moves, the new base URL is written back to
//! the file the configuration was loaded from.
//!
//! # Usage
//!
//! ```bash
//! ACTON_MODEL_LOG=acton_model=debug cargo run --example chat
//! ```

use acton_model::config;
use acton_model::prelude::*;
use std::io::{BufRead, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logging = init_logging(&LoggingConfig::new().with_level(LogLevel::Warn))?;

    let file = config::load()?;
    let name = file
        .effective_default()
        .ok_or_else(|| anyhow::anyhow!("No default provider configured"))?
        .to_string();

    let mut model_config = file.model_config(Some(&name))?.on_content_delta(print_text_delta);
    if let Some(path) = config::find_config() {
        model_config = model_config.on_base_url_persist(config::base_url_persister(path, &name));
    }
    let model = create_model(model_config)?;
    eprintln!("Chatting with '{}' at {}", name, model.base_url());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut conversation: Option<Conversation> = None;

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        let conv = match conversation.as_mut() {
            Some(conv) => {
                conv.push_user(line);
                conv
            }
            None => conversation.insert(model.create_conversation("You are a helpful assistant.", line)),
        };

        match model.complete(conv).await {
            Ok(turn) => {
                let tokens = turn.usage.map(|u| u.total()).unwrap_or_default();
                println!("\n[{:?}, {} tokens]", turn.stop_reason, tokens);
            }
            Err(e) if e.is_rate_limit() => {
                eprintln!("\nrate limited: {e}");
                // History ends with an unanswered user message; start fresh
                conversation = None;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

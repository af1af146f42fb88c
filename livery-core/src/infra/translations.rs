use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};

use crate::ports::Translator;

/// Flat key/value message catalog.
#[derive(Debug, Default, Clone)]
pub struct CatalogTranslator {
    messages: HashMap<String, String>,
}

impl CatalogTranslator {
    /// Catalog over an existing message map.
    pub fn new(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }

    /// Loads a JSON object of `key -> message`.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| {
                format!("failed to read catalog {}", path.display())
            })?;
        let messages = serde_json::from_slice(&bytes)
            .with_context(|| {
                format!("failed to parse catalog {}", path.display())
            })?;
        Ok(Self { messages })
    }

    /// Adds or replaces one message.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.messages.insert(key.into(), message.into());
    }
}

impl Translator for CatalogTranslator {
    fn translate(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

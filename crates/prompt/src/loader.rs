//! Prompt store: strategy name to template text.

use crate::types::{CONDENSE_PROMPT, REWRITE_PROMPT};
use ragchat_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const BUILTIN_TEMPLATES: &str = include_str!("../templates/default.yaml");

/// A named collection of prompt templates.
#[derive(Debug, Clone)]
pub struct PromptStore {
    source: Option<PathBuf>,
    templates: BTreeMap<String, String>,
}

impl PromptStore {
    /// Load templates from a YAML or JSON file mapping names to template strings.
    ///
    /// A missing file is a configuration error naming the path.
    ///
    /// # Example
    /// ```no_run
    /// use ragchat_prompt::PromptStore;
    /// use std::path::Path;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = PromptStore::load(Path::new("prompts/prompt_templates.json"))?;
    /// let template = store.get("zero_shot")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(path: &Path) -> AppResult<Self> {
        tracing::debug!("Loading prompts from: {:?}", path);

        if !path.exists() {
            return Err(AppError::Config(format!(
                "Prompt file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e))
        })?;

        let is_json = path.extension().and_then(|s| s.to_str()) == Some("json");
        let templates: BTreeMap<String, String> = if is_json {
            serde_json::from_str(&contents).map_err(|e| {
                AppError::Prompt(format!("Failed to parse prompt JSON {:?}: {}", path, e))
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e))
            })?
        };

        let store = Self {
            source: Some(path.to_path_buf()),
            templates,
        };
        store.validate()?;

        tracing::info!("Loaded {} prompt templates from {}", store.templates.len(), path.display());
        Ok(store)
    }

    /// The template set shipped with the binary.
    pub fn builtin() -> AppResult<Self> {
        let templates: BTreeMap<String, String> = serde_yaml::from_str(BUILTIN_TEMPLATES)
            .map_err(|e| AppError::Prompt(format!("Failed to parse builtin prompts: {}", e)))?;
        let store = Self {
            source: None,
            templates,
        };
        store.validate()?;
        Ok(store)
    }

    /// Load `path` when given, otherwise fall back to the builtin set.
    pub fn load_or_builtin(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    /// Build a store from an in-memory map.
    pub fn from_templates<I, K, V>(templates: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self {
            source: None,
            templates: templates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        };
        store.validate()?;
        Ok(store)
    }

    /// Template text for `name`, placeholders left for rendering.
    pub fn get(&self, name: &str) -> AppResult<String> {
        let template = self
            .templates
            .get(name)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Config(format!("Unknown prompt type: {}", name)))?;

        Ok(template.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// Names usable as answer strategies (everything but the helper templates).
    pub fn strategies(&self) -> Vec<&str> {
        self.names()
            .into_iter()
            .filter(|n| *n != REWRITE_PROMPT && *n != CONDENSE_PROMPT)
            .collect()
    }

    /// File the templates were read from; `None` for builtin or in-memory sets.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn validate(&self) -> AppResult<()> {
        if self.templates.is_empty() {
            return Err(AppError::Prompt("Prompt file contains no templates".to_string()));
        }

        if let Some((name, _)) = self.templates.iter().find(|(_, t)| t.trim().is_empty()) {
            return Err(AppError::Prompt(format!(
                "Prompt template cannot be empty: {}",
                name
            )));
        }

        Ok(())
    }
}

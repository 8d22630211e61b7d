/*!
# Decompile options

Options recognized by the decompiler, loadable from TOML, YAML or JSON the
same way analyzer rule configurations are.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Параметры декомпиляции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompileOptions {
    /// Не оборачивать код верхнего уровня в блок "on start"
    #[serde(default)]
    pub snippet_mode: bool,

    /// Выводить "on start" даже если он пуст
    #[serde(default)]
    pub always_emit_on_start: bool,

    /// Любой серый блок считается фатальной ошибкой
    #[serde(default)]
    pub error_on_grey_blocks: bool,

    /// Типы, допустимые для параметров пользовательских функций
    #[serde(default = "default_allowed_argument_types")]
    pub allowed_argument_types: Vec<String>,

    #[serde(default)]
    pub generate_source_map: bool,

    /// Встраивать причину отказа в серые блоки (отладка)
    #[serde(default)]
    pub include_grey_block_messages: bool,

    /// Предел количества блоков в одном файле
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,

    /// Однобуквенные имена, которые не переименовываются по алфавиту
    #[serde(default = "default_rename_skip")]
    pub rename_single_letter_skip: Vec<char>,
}

fn default_allowed_argument_types() -> Vec<String> {
    vec![
        "number".to_string(),
        "boolean".to_string(),
        "string".to_string(),
    ]
}

fn default_max_blocks() -> usize {
    1500
}

fn default_rename_skip() -> Vec<char> {
    vec!['x', 'y', 'z']
}

impl Default for DecompileOptions {
    fn default() -> Self {
        Self {
            snippet_mode: false,
            always_emit_on_start: false,
            error_on_grey_blocks: false,
            allowed_argument_types: default_allowed_argument_types(),
            generate_source_map: false,
            include_grey_block_messages: false,
            max_blocks: default_max_blocks(),
            rename_single_letter_skip: default_rename_skip(),
        }
    }
}

impl DecompileOptions {
    /// Настройки для строгой проверки: серые блоки запрещены
    pub fn strict() -> Self {
        Self {
            error_on_grey_blocks: true,
            ..Self::default()
        }
    }

    pub fn with_snippet_mode(mut self, snippet_mode: bool) -> Self {
        self.snippet_mode = snippet_mode;
        self
    }

    pub fn with_source_map(mut self, generate: bool) -> Self {
        self.generate_source_map = generate;
        self
    }

    pub fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    pub fn is_argument_type_allowed(&self, type_name: &str) -> bool {
        self.allowed_argument_types.iter().any(|t| t == type_name)
    }

    /// Load options, picking the format from the file extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read decompiler options from {}", path.display()))?;

        let options: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML options from {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON options from {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML options from {}", path.display()))?,
        };

        options.validate()?;
        Ok(options)
    }

    /// Save options to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize decompiler options to TOML")?;

        std::fs::write(&path, content).with_context(|| {
            format!(
                "Failed to write decompiler options to {}",
                path.as_ref().display()
            )
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_blocks == 0 {
            anyhow::bail!("maxBlocks must be greater than zero");
        }
        if let Some(c) = self
            .rename_single_letter_skip
            .iter()
            .find(|c| !c.is_ascii_lowercase())
        {
            anyhow::bail!("renameSingleLetterSkip accepts lowercase ASCII letters only, got {:?}", c);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::Builder;

    #[test]
    fn test_default_options() {
        let options = DecompileOptions::default();
        assert_eq!(options.max_blocks, 1500);
        assert!(options.is_argument_type_allowed("number"));
        assert!(!options.is_argument_type_allowed("number[]"));
        assert_eq!(options.rename_single_letter_skip, vec!['x', 'y', 'z']);
    }

    #[test]
    fn test_options_file_roundtrip() {
        let options = DecompileOptions::strict().with_max_blocks(20);
        let file = Builder::new().suffix(".toml").tempfile().unwrap();
        options.save_to_file(file.path()).unwrap();

        let loaded = DecompileOptions::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, options);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let file = Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(file.path(), "snippetMode: true\nrenameSingleLetterSkip: [q]\n").unwrap();

        let loaded = DecompileOptions::load_from_file(file.path()).unwrap();
        assert!(loaded.snippet_mode);
        assert_eq!(loaded.max_blocks, 1500);
        assert_eq!(loaded.rename_single_letter_skip, vec!['q']);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let file = Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(file.path(), r#"{"maxBlocks": 0}"#).unwrap();
        assert!(DecompileOptions::load_from_file(file.path()).is_err());
    }
}

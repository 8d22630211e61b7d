//! File system utility helpers (BOM-aware readers, JSON input loading)
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a text file as UTF-8, stripping UTF-8 BOM if present.
pub fn read_text_file(path: &Path) -> std::io::Result<String> {
    let mut content = fs::read_to_string(path)?;
    if content.starts_with('\u{FEFF}') {
        content = content.trim_start_matches('\u{FEFF}').to_string();
    }
    Ok(content)
}

/// Load a JSON document (syntax tree, metadata table) from disk.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_text_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bom_is_stripped() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("\u{FEFF}{\"a\": 1}".as_bytes()).unwrap();
        let text = read_text_file(file.path()).unwrap();
        assert_eq!(text, "{\"a\": 1}");
        let value: serde_json::Value = read_json_file(file.path()).unwrap();
        assert_eq!(value["a"], 1);
    }
}

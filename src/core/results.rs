/*!
# Decompile Results

Структуры результата декомпиляции одного файла: сгенерированная разметка,
диагностики и необязательная карта исходников.
*/

use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Связь блока с фрагментом исходного текста
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapEntry {
    pub id: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

/// Результат декомпиляции одного файла
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompileResult {
    /// Имя выходного файла -> разметка блоков
    pub output_files: BTreeMap<String, String>,
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<Vec<SourceMapEntry>>,
}

impl DecompileResult {
    /// Успешный результат с единственным выходным файлом
    pub fn with_output(file_name: String, text: String) -> Self {
        let mut output_files = BTreeMap::new();
        output_files.insert(file_name, text);
        Self {
            output_files,
            diagnostics: Vec::new(),
            success: true,
            source_map: None,
        }
    }

    /// Неуспешный результат без выходных файлов
    pub fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            output_files: BTreeMap::new(),
            diagnostics: vec![diagnostic],
            success: false,
            source_map: None,
        }
    }

    /// Текст первого выходного файла
    pub fn output_text(&self) -> Option<&str> {
        self.output_files.values().next().map(String::as_str)
    }

    /// Возвращает количество ошибок
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Проверяет наличие диагностики с указанным кодом
    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

impl fmt::Display for DecompileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "OK" } else { "FAILED" };
        writeln!(
            f,
            "{} ({} file(s), {} diagnostic(s))",
            status,
            self.output_files.len(),
            self.diagnostics.len()
        )?;
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

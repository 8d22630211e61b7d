//! Структуры для диагностических сообщений декомпилятора

use crate::core::errors::DecompileError;
use crate::core::position::{LineIndex, TextSpan};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Уровень серьезности диагностики
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "ERROR"),
            DiagnosticSeverity::Warning => write!(f, "WARNING"),
            DiagnosticSeverity::Info => write!(f, "INFO"),
        }
    }
}

/// Местоположение в исходном коде
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl Location {
    pub fn new(file: String, line: usize, column: usize, offset: usize, length: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset,
            length,
        }
    }

    /// Местоположение целого файла (для ошибок без позиции)
    pub fn file_start(file: impl Into<String>) -> Self {
        Self::new(file.into(), 0, 0, 0, 0)
    }

    pub fn from_span(file: impl Into<String>, span: TextSpan, lines: &LineIndex) -> Self {
        let start = lines.to_position(span.start);
        Self::new(file.into(), start.line, start.column, span.start, span.len())
    }
}

/// Детали диагностики
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticDetails {
    /// Найденная конструкция
    pub found: Option<String>,
    /// Предлагаемое исправление
    pub suggestion: Option<String>,
}

/// Диагностическое сообщение
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub location: Location,
    pub code: String,
    pub message: String,
    pub details: DiagnosticDetails,
}

impl Diagnostic {
    /// Создает новую диагностику
    pub fn new(
        severity: DiagnosticSeverity,
        location: Location,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            location,
            code: code.into(),
            message: message.into(),
            details: DiagnosticDetails::default(),
        }
    }

    /// Переводит ошибку декомпиляции в диагностику, указывающую на исходный фрагмент
    pub fn from_error(error: &DecompileError, file: &str, lines: &LineIndex) -> Self {
        let location = match error.span() {
            Some(span) => Location::from_span(file, span, lines),
            None => Location::file_start(file),
        };
        Self::new(DiagnosticSeverity::Error, location, error.code(), error.to_string())
    }

    /// Добавляет информацию о найденной конструкции
    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.details.found = Some(found.into());
        self
    }

    /// Добавляет предложение по исправлению
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.details.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}:{}:{}: {} ({})",
            self.severity,
            self.location.file,
            self.location.line + 1,
            self.location.column + 1,
            self.message,
            self.code
        )?;
        if let Some(suggestion) = &self.details.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

/// Коды диагностик
pub mod codes {
    /// Конструкция не имеет блочного представления
    pub const UNSUPPORTED_SYNTAX: &str = "DCMP001";
    /// Обязательная конструкция (enum, kind) некорректна
    pub const STRUCTURAL_FAILURE: &str = "DCMP002";
    /// Превышен лимит количества блоков
    pub const PROGRAM_TOO_LARGE: &str = "DCMP003";
    /// Непредвиденная внутренняя ошибка
    pub const INTERNAL_ERROR: &str = "DCMP004";
    /// Серый блок в строгом режиме
    pub const GREY_BLOCK_IN_STRICT_MODE: &str = "DCMP005";
    /// Некорректная конфигурация
    pub const INVALID_CONFIGURATION: &str = "DCMP006";
}

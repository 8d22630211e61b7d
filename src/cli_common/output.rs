//! Модуль для форматирования и вывода результатов

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

use crate::diagnostics::Diagnostic;

/// Формат вывода результатов
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow::anyhow!("Unknown output format: {}", s)),
        }
    }
}

/// Writer для вывода результатов
pub struct OutputWriter {
    writer: Box<dyn Write>,
    format: OutputFormat,
    pretty: bool,
}

impl OutputWriter {
    /// Создает writer для stdout
    pub fn stdout(format: OutputFormat) -> Self {
        Self {
            writer: Box::new(io::stdout()),
            format,
            pretty: true,
        }
    }

    /// Writer поверх произвольного приёмника
    pub fn from_writer(writer: Box<dyn Write>, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            pretty: true,
        }
    }

    /// Включает pretty-печать для JSON
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Записывает сериализуемый объект
    pub fn write_object<T: Serialize>(&mut self, obj: &T) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(obj)?
        } else {
            serde_json::to_string(obj)?
        };
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Записывает строку
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    /// Записывает заголовок
    pub fn write_header(&mut self, header: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.writer, "\n{}", header.bold().blue())?;
                writeln!(self.writer, "{}", "=".repeat(header.chars().count()).blue())?;
            }
            OutputFormat::Json => {}
        }
        Ok(())
    }

    /// Записывает диагностики: по строке в тексте или массивом в JSON
    pub fn write_diagnostics(&mut self, diagnostics: &[Diagnostic]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.write_object(&diagnostics),
            OutputFormat::Text => {
                for diagnostic in diagnostics {
                    writeln!(self.writer, "  • {}", diagnostic)?;
                    if let Some(found) = &diagnostic.details.found {
                        writeln!(self.writer, "      {}", found.dimmed())?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Завершает запись и сбрасывает буфер
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Итог декомпиляции набора файлов
#[derive(Debug, Default, Serialize)]
pub struct DecompileSummary {
    pub files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub grey_blocks: usize,
    pub duration: Option<String>,
}

impl DecompileSummary {
    /// Выводит итог в указанный writer
    pub fn write(&self, writer: &mut OutputWriter) -> Result<()> {
        match writer.format {
            OutputFormat::Json => writer.write_object(self),
            OutputFormat::Text => {
                writer.write_header("Summary")?;
                writer.write_line(&format!("Files: {}", self.files))?;
                writer.write_line(&format!("  succeeded: {}", self.succeeded.to_string().green()))?;
                if self.failed > 0 {
                    writer.write_line(&format!("  failed: {}", self.failed.to_string().red()))?;
                }
                if self.grey_blocks > 0 {
                    writer.write_line(&format!("Grey blocks: {}", self.grey_blocks.to_string().yellow()))?;
                }
                if let Some(duration) = &self.duration {
                    writer.write_line(&format!("Duration: {}", duration))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{codes, DiagnosticSeverity, Location};
    use std::sync::{Arc, Mutex};

    /// Приёмник, доступный после передачи writer'у
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_json_diagnostics() {
        let buffer = SharedBuffer::default();
        let mut writer = OutputWriter::from_writer(Box::new(buffer.clone()), OutputFormat::Json).with_pretty(false);
        let diagnostic = Diagnostic::new(
            DiagnosticSeverity::Warning,
            Location::file_start("main.ts"),
            codes::UNSUPPORTED_SYNTAX,
            "Unsupported statement in block: class",
        );
        writer.write_diagnostics(&[diagnostic]).unwrap();

        let value: serde_json::Value = serde_json::from_str(buffer.contents().trim()).unwrap();
        assert_eq!(value[0]["code"], codes::UNSUPPORTED_SYNTAX);
    }
}

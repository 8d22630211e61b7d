//! Общий модуль для CLI
//!
//! Содержит общую функциональность командной строки:
//! - Инициализация логирования
//! - Загрузка входных файлов
//! - Форматирование вывода

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::decompiler::DecompileOptions;
use crate::diagnostics::{Diagnostic, DiagnosticSeverity};
use crate::metadata::SymbolMetadataTable;
use crate::syntax::SourceFile;

pub mod args;
pub mod output;

pub use args::{CommonArgs, InputArgs, OptionArgs};
pub use output::{DecompileSummary, OutputFormat, OutputWriter};

/// Инициализирует систему логирования с указанным уровнем
pub fn init_logging(level: tracing::Level) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Инициализирует минимальное логирование (только WARN и ERROR)
pub fn init_minimal_logging() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Выводит заголовок CLI утилиты
pub fn print_header(name: &str, version: &str, description: &str) {
    println!("{} {} - {}", "🔧".blue(), name.bold().blue(), version.dimmed());
    println!("{}\n", description.dimmed());
}

/// Выводит успешное завершение операции
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message.green());
}

/// Выводит предупреждение
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠️".yellow(), message.yellow());
}

/// Выводит ошибку
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

/// Выводит информационное сообщение
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ️".blue(), message);
}

/// Выводит диагностику с цветом по важности
pub fn print_diagnostic(diagnostic: &Diagnostic) {
    let text = diagnostic.to_string();
    match diagnostic.severity {
        DiagnosticSeverity::Error => eprintln!("{}", text.red()),
        DiagnosticSeverity::Warning => println!("{}", text.yellow()),
        DiagnosticSeverity::Info => println!("{}", text.dimmed()),
    }
    if let Some(found) = &diagnostic.details.found {
        println!("    {} {}", "found:".dimmed(), found);
    }
}

/// Проверяет существование файла или директории
pub fn validate_path(path: &Path, description: &str) -> Result<()> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "{} does not exist: {}",
            description,
            path.display()
        ));
    }
    Ok(())
}

/// Создает директорию если она не существует
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Загружает синтаксическое дерево файла из JSON
pub fn load_source_file(path: &Path) -> Result<SourceFile> {
    validate_path(path, "Syntax tree")?;
    crate::core::read_json_file(path)
}

/// Загружает метаданные API
pub fn load_metadata(path: &Path) -> Result<SymbolMetadataTable> {
    validate_path(path, "Symbol metadata")?;
    SymbolMetadataTable::load_from_file(path)
}

/// Загружает настройки декомпиляции или берёт значения по умолчанию
pub fn load_options(path: Option<&Path>) -> Result<DecompileOptions> {
    let options = match path {
        Some(path) => {
            validate_path(path, "Options file")?;
            DecompileOptions::load_from_file(path)?
        }
        None => DecompileOptions::default(),
    };
    options.validate()?;
    Ok(options)
}

/// Форматирует продолжительность в человекочитаемый вид
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{:03}s", secs, millis)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// Trait для CLI команд
pub trait CliCommand {
    /// Выполняет команду
    fn execute(&self) -> Result<()>;

    /// Возвращает имя команды
    fn name(&self) -> &str;

    /// Возвращает описание команды
    fn description(&self) -> &str;
}

/// Запускает CLI команду с обработкой ошибок
pub fn run_command<C: CliCommand>(command: C, quiet: bool) -> Result<()> {
    if !quiet {
        print_header(command.name(), env!("CARGO_PKG_VERSION"), command.description());
    }

    match command.execute() {
        Ok(()) => {
            if !quiet {
                print_success(&format!("{} completed successfully", command.name()));
            }
            Ok(())
        }
        Err(e) => {
            print_error(&format!("{} failed: {:#}", command.name(), e));
            Err(e)
        }
    }
}

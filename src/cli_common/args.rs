//! Общие аргументы командной строки

use clap::Args;
use std::path::PathBuf;

use crate::decompiler::DecompileOptions;

/// Общие аргументы для всех команд
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format for diagnostics (text, json)
    #[arg(long, global = true, default_value = "text")]
    pub format: String,
}

/// Входные файлы: синтаксические деревья и метаданные API
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Syntax tree JSON files, decompiled in the given order
    #[arg(short, long = "input", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Symbol metadata JSON
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Decompiler options file (TOML, YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Флаги, переопределяющие файл настроек
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Do not wrap top-level code into "on start"
    #[arg(long)]
    pub snippet: bool,

    /// Emit block ids and a source map
    #[arg(long)]
    pub source_map: bool,

    /// Fail instead of emitting grey blocks
    #[arg(long)]
    pub strict: bool,

    /// Override the block ceiling
    #[arg(long)]
    pub max_blocks: Option<usize>,
}

impl CommonArgs {
    /// Определяет уровень логирования на основе флагов
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Проверяет, нужно ли выводить информацию
    pub fn should_print(&self) -> bool {
        !self.quiet
    }
}

impl OptionArgs {
    /// Накладывает флаги командной строки на загруженные настройки
    pub fn apply(&self, mut options: DecompileOptions) -> DecompileOptions {
        options.snippet_mode |= self.snippet;
        options.generate_source_map |= self.source_map;
        options.error_on_grey_blocks |= self.strict;
        if let Some(max_blocks) = self.max_blocks {
            options.max_blocks = max_blocks;
        }
        options
    }
}

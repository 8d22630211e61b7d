/*!
# Blocks Decompiler CLI

Command-line interface for decompiling host syntax trees into Blockly XML.
*/

use anyhow::{Context, Result};
use blocks_decompiler::cli_common::{
    self, CliCommand, CommonArgs, DecompileSummary, InputArgs, OptionArgs, OutputFormat,
    OutputWriter,
};
use blocks_decompiler::decompiler::{DecompileOptions, Decompiler, TakenNames};
use blocks_decompiler::diagnostics::Diagnostic;
use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "blocks-decompiler",
    version = env!("CARGO_PKG_VERSION"),
    about = "Decompiles typed syntax trees into Blockly workspace XML"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompile syntax tree files into .blocks files
    Decompile {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        flags: OptionArgs,

        /// Output directory for .blocks files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Run only the feasibility checks and report what would become grey blocks
    Check {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        flags: OptionArgs,
    },

    /// Decompiler options file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default options file
    Init {
        /// Output path (.toml, .yaml or .json)
        #[arg(short, long, default_value = "decompiler.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Инициализация логирования
    if cli.common.should_print() {
        cli_common::init_logging(cli.common.log_level())?;
    } else {
        cli_common::init_minimal_logging()?;
    }

    let format: OutputFormat = cli.common.format.parse()?;
    let quiet = cli.common.quiet || format == OutputFormat::Json;

    match cli.command {
        Commands::Decompile { input, flags, output } => {
            let cmd = DecompileCommand {
                input,
                flags,
                output,
                format,
                quiet,
            };
            cli_common::run_command(cmd, quiet)?;
        }

        Commands::Check { input, flags } => {
            let cmd = CheckCommand {
                input,
                flags,
                format,
            };
            cli_common::run_command(cmd, quiet)?;
        }

        Commands::Config {
            command: ConfigCommands::Init { output },
        } => {
            let cmd = ConfigInitCommand { output };
            cli_common::run_command(cmd, quiet)?;
        }
    }

    Ok(())
}

fn load_options(input: &InputArgs, flags: &OptionArgs) -> Result<DecompileOptions> {
    let options = cli_common::load_options(input.config.as_deref())?;
    Ok(flags.apply(options))
}

// ================================================================================
// Команда Decompile
// ================================================================================

struct DecompileCommand {
    input: InputArgs,
    flags: OptionArgs,
    output: PathBuf,
    format: OutputFormat,
    quiet: bool,
}

impl CliCommand for DecompileCommand {
    fn name(&self) -> &str {
        "decompile"
    }

    fn description(&self) -> &str {
        "Decompile syntax trees into Blockly XML"
    }

    fn execute(&self) -> Result<()> {
        let started = Instant::now();
        let options = load_options(&self.input, &self.flags)?;
        let metadata = cli_common::load_metadata(&self.input.metadata)?;
        cli_common::ensure_dir_exists(&self.output)?;

        let decompiler = Decompiler::new(&metadata, options);
        let mut taken = TakenNames::new();
        let mut summary = DecompileSummary {
            files: self.input.inputs.len(),
            ..DecompileSummary::default()
        };
        let mut all_diagnostics: Vec<Diagnostic> = Vec::new();

        let progress = self.progress_bar()?;
        for path in &self.input.inputs {
            progress.set_message(path.display().to_string());
            let file = cli_common::load_source_file(path)?;
            let result = decompiler.decompile_file(&file, &mut taken);
            progress.inc(1);

            if result.success {
                summary.succeeded += 1;
                for (name, text) in &result.output_files {
                    let target = self.output.join(name);
                    std::fs::write(&target, text)
                        .with_context(|| format!("Failed to write {}", target.display()))?;
                    tracing::info!("wrote {}", target.display());
                }
                if let (Some(source_map), Some(name)) = (&result.source_map, result.output_files.keys().next()) {
                    let target = self.output.join(format!("{}.map.json", name));
                    let json = serde_json::to_string_pretty(source_map)?;
                    std::fs::write(&target, json)
                        .with_context(|| format!("Failed to write {}", target.display()))?;
                }
            } else {
                summary.failed += 1;
            }
            summary.grey_blocks += result
                .diagnostics
                .iter()
                .filter(|d| !d.is_error())
                .count();

            if !self.quiet {
                self.print_file_status(&file.file_name, &result.diagnostics, result.success)?;
            }
            all_diagnostics.extend(result.diagnostics);
        }
        progress.finish_and_clear();
        summary.duration = Some(cli_common::format_duration(started.elapsed()));

        let mut writer = OutputWriter::stdout(self.format);
        if self.format == OutputFormat::Json {
            writer.write_object(&serde_json::json!({
                "summary": &summary,
                "diagnostics": &all_diagnostics,
            }))?;
        } else if !self.quiet {
            summary.write(&mut writer)?;
        }
        writer.flush()?;

        if summary.failed > 0 {
            anyhow::bail!("{} of {} file(s) failed to decompile", summary.failed, summary.files);
        }
        Ok(())
    }
}

impl DecompileCommand {
    fn progress_bar(&self) -> Result<ProgressBar> {
        if self.quiet || self.input.inputs.len() < 2 {
            return Ok(ProgressBar::hidden());
        }
        let progress = ProgressBar::new(self.input.inputs.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .context("Failed to set progress style")?,
        );
        Ok(progress)
    }

    fn print_file_status(&self, file_name: &str, diagnostics: &[Diagnostic], success: bool) -> Result<()> {
        let term = Term::stdout();
        let status = if success {
            style("OK").green()
        } else {
            style("FAILED").red()
        };
        term.write_line(&format!("{} {}", status, style(file_name).bold()))?;
        for diagnostic in diagnostics {
            cli_common::print_diagnostic(diagnostic);
        }
        Ok(())
    }
}

// ================================================================================
// Команда Check
// ================================================================================

struct CheckCommand {
    input: InputArgs,
    flags: OptionArgs,
    format: OutputFormat,
}

impl CliCommand for CheckCommand {
    fn name(&self) -> &str {
        "check"
    }

    fn description(&self) -> &str {
        "Report statements that cannot be decompiled into blocks"
    }

    fn execute(&self) -> Result<()> {
        let options = load_options(&self.input, &self.flags)?;
        let metadata = cli_common::load_metadata(&self.input.metadata)?;
        let decompiler = Decompiler::new(&metadata, options);

        let mut writer = OutputWriter::stdout(self.format);
        let mut all_diagnostics = Vec::new();
        for path in &self.input.inputs {
            let file = cli_common::load_source_file(path)?;
            let diagnostics = decompiler.check_file(&file);
            if self.format == OutputFormat::Text {
                writer.write_header(&format!("{} ({} issue(s))", file.file_name, diagnostics.len()))?;
                writer.write_diagnostics(&diagnostics)?;
            }
            all_diagnostics.extend(diagnostics);
        }
        if self.format == OutputFormat::Json {
            writer.write_diagnostics(&all_diagnostics)?;
        }
        writer.flush()?;

        let errors = all_diagnostics.iter().filter(|d| d.is_error()).count();
        if errors > 0 {
            anyhow::bail!("{} statement(s) cannot be decompiled", errors);
        }
        if all_diagnostics.is_empty() {
            cli_common::print_info("All top-level statements can be decompiled");
        } else {
            cli_common::print_warning(&format!(
                "{} statement(s) would become grey blocks",
                all_diagnostics.len()
            ));
        }
        Ok(())
    }
}

// ================================================================================
// Команда Config Init
// ================================================================================

struct ConfigInitCommand {
    output: PathBuf,
}

impl CliCommand for ConfigInitCommand {
    fn name(&self) -> &str {
        "config init"
    }

    fn description(&self) -> &str {
        "Write default decompiler options"
    }

    fn execute(&self) -> Result<()> {
        DecompileOptions::default().save_to_file(&self.output)?;
        cli_common::print_info(&format!("Options written to {}", self.output.display()));
        Ok(())
    }
}

/*!
# Decompiler

Converts a typed syntax tree into Blockly XML.

Pipeline for one file:

1. comment scanning over the raw source text;
2. rename resolution against the caller's taken-names set;
3. collection of the file's own functions, enums and kinds;
4. a single building walk with inline feasibility checks and comment
   attachment;
5. serialization.

Recoverable problems become grey blocks with warning diagnostics. Structural
failures, the block ceiling, strict-mode grey blocks and internal errors
fail the whole file: the result then carries one error diagnostic and no
output.
*/

pub mod attach;
pub mod builder;
pub mod builtins;
pub mod comments;
pub mod declarations;
pub mod feasibility;
pub mod ids;
pub mod nodes;
pub mod options;
pub mod rename;
pub mod serializer;

use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::errors::{BuildResult, DecompileError};
use crate::core::position::LineIndex;
use crate::core::results::DecompileResult;
use crate::diagnostics::{codes, Diagnostic, DiagnosticSeverity, Location};
use crate::metadata::SymbolMetadataTable;
use crate::syntax::SourceFile;

pub use builder::{BuildOutput, DecompilerContext, VariableEntry};
pub use feasibility::{Feasibility, Scope};
pub use ids::{IdGenerator, ON_START_ID};
pub use options::DecompileOptions;
pub use rename::{
    resolve_renames, BindingReferenceFinder, ReferenceFinder, RenameEdit, RenameMap, RenamePolicy,
    TakenNames,
};

use declarations::FileDeclarations;

static OUTPUT_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\.blocks)?\.\w*$").expect("valid extension regex"));

/// Name of the markup file produced for `file_name`.
pub fn output_file_name(file_name: &str) -> String {
    format!("{}.blocks", OUTPUT_EXTENSION.replace(file_name, ""))
}

/// Декомпилятор: метаданные API и настройки на время серии вызовов
pub struct Decompiler<'m> {
    metadata: &'m SymbolMetadataTable,
    options: DecompileOptions,
}

impl<'m> Decompiler<'m> {
    pub fn new(metadata: &'m SymbolMetadataTable, options: DecompileOptions) -> Self {
        Self { metadata, options }
    }

    pub fn options(&self) -> &DecompileOptions {
        &self.options
    }

    /// Decompiles one file. Names claimed by this file are added to `taken`
    /// so the next file of the same project does not reuse them.
    pub fn decompile_file(&self, file: &SourceFile, taken: &mut TakenNames) -> DecompileResult {
        let lines = LineIndex::new(&file.text);
        tracing::debug!("decompiling {} ({} statements)", file.file_name, file.statements.len());

        let built = panic::catch_unwind(AssertUnwindSafe(|| self.build(file, taken, &lines)))
            .unwrap_or_else(|payload| Err(DecompileError::Internal(panic_message(payload.as_ref()))));

        let (output, text) = match built {
            Ok(built) => built,
            Err(error) => {
                tracing::warn!("failed to decompile {}: {}", file.file_name, error);
                return DecompileResult::failed(Diagnostic::from_error(&error, &file.file_name, &lines));
            }
        };

        let mut result = DecompileResult::with_output(output_file_name(&file.file_name), text);
        if self.options.generate_source_map {
            result.source_map = Some(output.source_map);
        }
        tracing::info!(
            "decompiled {}: {} block(s), {} grey block warning(s)",
            file.file_name,
            output.block_count,
            output.diagnostics.len()
        );
        result.diagnostics = output.diagnostics;
        result
    }

    fn build(
        &self,
        file: &SourceFile,
        taken: &mut TakenNames,
        lines: &LineIndex,
    ) -> BuildResult<(BuildOutput, String)> {
        self.options
            .validate()
            .map_err(|error| DecompileError::Config(error.to_string()))?;

        // 1. Комментарии
        let comments = comments::scan_comments(&file.text);

        // 2. Переименования
        let finder = BindingReferenceFinder::new(file);
        let policy = RenamePolicy::new(self.options.rename_single_letter_skip.iter().copied());
        let renames = resolve_renames(file, taken, &finder, &policy);
        if !renames.is_empty() {
            tracing::debug!("{} rename edit(s) in {}", renames.len(), file.file_name);
        }

        // 3. Собственные объявления файла
        let mut ids = IdGenerator::new();
        let declarations = FileDeclarations::collect(file, self.metadata, &mut ids)?;

        // 4. Построение дерева блоков
        let context = DecompilerContext::new(
            file,
            self.metadata,
            &self.options,
            &declarations,
            &renames,
            comments,
            lines.clone(),
            ids,
        );
        let output = context.build()?;

        // 5. Разметка
        let text = serializer::serialize(&output)?;
        Ok((output, text))
    }

    /// Runs only the feasibility checks over the top-level statements and
    /// reports every rejection.
    pub fn check_file(&self, file: &SourceFile) -> Vec<Diagnostic> {
        let lines = LineIndex::new(&file.text);
        let mut ids = IdGenerator::new();
        let declarations = match FileDeclarations::collect(file, self.metadata, &mut ids) {
            Ok(declarations) => declarations,
            Err(error) => return vec![Diagnostic::from_error(&error, &file.file_name, &lines)],
        };
        let checker = Feasibility::new(self.metadata, &self.options, &declarations);

        let mut diagnostics = Vec::new();
        for stmt in &file.statements {
            let Err(reason) = checker.check_statement(stmt, Scope::top_level()) else {
                continue;
            };
            let severity = if self.options.error_on_grey_blocks {
                DiagnosticSeverity::Error
            } else {
                DiagnosticSeverity::Warning
            };
            let code = if self.options.error_on_grey_blocks {
                codes::GREY_BLOCK_IN_STRICT_MODE
            } else {
                codes::UNSUPPORTED_SYNTAX
            };
            let found = file.text_of(stmt.span).lines().next().unwrap_or("").trim().to_string();
            let mut diagnostic = Diagnostic::new(
                severity,
                Location::from_span(file.file_name.clone(), stmt.span, &lines),
                code,
                reason,
            )
            .with_found(found);
            if self.options.error_on_grey_blocks {
                diagnostic = diagnostic.with_suggestion("Rewrite the statement or allow grey blocks");
            }
            diagnostics.push(diagnostic);
        }
        diagnostics
    }
}

/// Decompiles a single file with a fresh taken-names set.
pub fn decompile(file: &SourceFile, metadata: &SymbolMetadataTable, options: DecompileOptions) -> DecompileResult {
    let mut taken = TakenNames::new();
    Decompiler::new(metadata, options).decompile_file(file, &mut taken)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("unexpected failure: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("unexpected failure: {}", message)
    } else {
        "unexpected failure".to_string()
    }
}

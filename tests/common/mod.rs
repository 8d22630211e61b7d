//! Общие помощники интеграционных тестов: метаданные API и построители программ

#![allow(dead_code)]

use blocks_decompiler::metadata::{ParameterInfo, SymbolInfo, SymbolKind, SymbolMetadataTable};
use blocks_decompiler::syntax::{
    BinaryOperator, Expression, SourceFile, Statement, SyntaxFactory, Type, UnaryOperator,
};
use blocks_decompiler::{decompile, DecompileOptions, DecompileResult};

/// Small API surface: a number display, an event loop and a button event.
pub fn api_metadata() -> SymbolMetadataTable {
    SymbolMetadataTable::new()
        .with_symbol(
            SymbolInfo::new("basic.showNumber", SymbolKind::Function)
                .with_block("basic_show_number", "show number %number")
                .with_parameter(ParameterInfo::new("number", "number")),
        )
        .with_symbol(
            SymbolInfo::new("loops.forever", SymbolKind::Function)
                .with_block("device_forever", "forever")
                .with_parameter(ParameterInfo::new("body", "() => void")),
        )
        .with_symbol(
            SymbolInfo::new("input.onButtonPressed", SymbolKind::Function)
                .with_block("device_button_event", "on button %button|pressed")
                .with_parameter(ParameterInfo {
                    is_enum: true,
                    ..ParameterInfo::new("button", "Button")
                })
                .with_parameter(ParameterInfo::new("body", "() => void")),
        )
        .with_symbol(SymbolInfo::new("Button.A", SymbolKind::EnumMember))
}

/// `basic.showNumber(argument);` where the call is the `nth` one in the text.
pub fn show_number(f: &SyntaxFactory, nth: usize, argument: Expression) -> Statement {
    f.expr_stmt(f.call(
        f.path("basic.showNumber", nth, Some("basic.showNumber"), Type::Void),
        vec![argument],
        Some("basic.showNumber"),
        Type::Void,
    ))
}

/// `for (let <index> = 0; <index> <op> <bound>; <index>++) body`; `first`
/// is the whole-word occurrence of the index in the loop header.
pub fn counting_loop(
    f: &SyntaxFactory,
    index: &str,
    first: usize,
    operator: BinaryOperator,
    bound: Expression,
    zero_nth: usize,
    body: impl FnOnce(&SyntaxFactory) -> Vec<Statement>,
) -> Statement {
    let declaration = f.declaration(f.declare(index, first), Some(f.num("0", zero_nth)));
    let condition = f.binary(f.ident(index, first + 1, Type::Number), operator, bound, Type::Boolean);
    let incrementor = f.postfix(f.ident(index, first + 2, Type::Number), UnaryOperator::Increment);
    let body = f.block(body(f));
    f.for_stmt(declaration, condition, incrementor, body)
}

pub fn decompile_with(file: &SourceFile, options: DecompileOptions) -> DecompileResult {
    decompile(file, &api_metadata(), options)
}

/// Decompiled markup; panics with the diagnostics when the file failed.
pub fn markup(file: &SourceFile, options: DecompileOptions) -> String {
    let result = decompile_with(file, options);
    assert!(result.success, "decompilation failed: {:?}", result.diagnostics);
    result
        .output_text()
        .map(str::to_string)
        .unwrap_or_default()
}

/// Markup with indentation removed, for single-line fragment checks.
pub fn compact(xml: &str) -> String {
    xml.lines().map(str::trim).collect()
}

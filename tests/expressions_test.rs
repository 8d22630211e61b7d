/*!
# Expression and loop form tests

Operators, lists, literal shadows from metadata and tagged templates.
*/

mod common;

use blocks_decompiler::metadata::{ParameterInfo, ShadowBlockInfo, SymbolInfo, SymbolKind};
use blocks_decompiler::syntax::{BinaryOperator, SyntaxFactory, Type, UnaryOperator};
use blocks_decompiler::{decompile, DecompileOptions, SourceFile};
use common::{api_metadata, compact, markup, show_number};
use pretty_assertions::assert_eq;

fn extended_markup(file: &SourceFile) -> String {
    let metadata = api_metadata()
        .with_symbol(
            SymbolInfo::new("basic.setColor", SymbolKind::Function)
                .with_block("basic_set_color", "set color %color=colorNumberPicker")
                .with_parameter(ParameterInfo::new("color", "number")),
        )
        .with_shadow_block(ShadowBlockInfo {
            block_id: "colorNumberPicker".to_string(),
            field_name: "value".to_string(),
            decompile_literals: true,
        })
        .with_symbol(
            SymbolInfo::new("images.createImage", SymbolKind::Function)
                .with_block("images_create_image", "create image %leds")
                .with_parameter(ParameterInfo::new("leds", "string"))
                .with_return_type("Image"),
        )
        .with_symbol(
            SymbolInfo::new("timer.after", SymbolKind::Function)
                .with_block("timer_after", "after %ms|ms")
                .with_parameter(ParameterInfo::new("body", "() => void"))
                .with_parameter(ParameterInfo::new("ms", "number")),
        );
    let result = decompile(file, &metadata, DecompileOptions::default());
    assert!(result.success, "decompilation failed: {:?}", result.diagnostics);
    compact(result.output_text().unwrap_or_default())
}

#[test]
fn test_arithmetic_argument() {
    let f = SyntaxFactory::new("main.ts", "let n = 5;\nbasic.showNumber(n + 1);\n");
    let declaration = f.let_stmt("n", 0, f.num("5", 0));
    let sum = f.binary(f.ident("n", 1, Type::Number), BinaryOperator::Add, f.num("1", 0), Type::Number);
    let file = f.file(vec![declaration, show_number(&f, 0, sum)]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(concat!(
        r#"<value name="number">"#,
        r#"<shadow type="math_number"><field name="NUM">0</field></shadow>"#,
        r#"<block type="math_arithmetic"><field name="OP">ADD</field>"#,
    )));
}

#[test]
fn test_while_with_parenthesized_condition_and_break() {
    let f = SyntaxFactory::new("main.ts", "while ((true)) {\n    break;\n}\n");
    let condition = f.paren(f.boolean(true, 0));
    let body = f.block(vec![f.keyword_stmt("break", 0)]);
    let file = f.file(vec![f.while_stmt(condition, body)]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(concat!(
        r#"<block type="device_while">"#,
        r#"<value name="COND"><shadow type="logic_boolean"><field name="BOOL">TRUE</field></shadow></value>"#,
        r#"<statement name="DO"><block type="break_keyword">"#,
    )));
}

#[test]
fn test_for_of_over_list_variable() {
    let text = "let list = [1, 2];\nfor (let value of list) {\n    basic.showNumber(value);\n}\n";
    let f = SyntaxFactory::new("main.ts", text);
    let numbers = Type::array_of(Type::Number);
    let declaration = f.let_stmt(
        "list",
        0,
        f.array(vec![f.num("1", 0), f.num("2", 0)], 0, numbers.clone()),
    );
    let variable = f.declare("value", 0);
    let body = f.block(vec![show_number(&f, 0, f.ident("value", 1, Type::Number))]);
    let for_of = f.for_of(variable, f.ident("list", 1, numbers), body);
    let file = f.file(vec![declaration, for_of]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(r#"<block type="lists_create_with"><mutation items="2"/>"#));
    assert!(xml.contains(concat!(
        r#"<block type="pxt_controls_for_of">"#,
        r#"<value name="VAR"><shadow type="variables_get_reporter"><field name="VAR">value</field></shadow></value>"#,
        r#"<value name="LIST"><block type="variables_get"><field name="VAR">list</field></block></value>"#,
    )));
}

#[test]
fn test_literal_uses_metadata_shadow() {
    let f = SyntaxFactory::new("main.ts", "basic.setColor(255);\n");
    let call = f.call(
        f.path("basic.setColor", 0, Some("basic.setColor"), Type::Void),
        vec![f.num("255", 0)],
        Some("basic.setColor"),
        Type::Void,
    );
    let file = f.file(vec![f.expr_stmt(call)]);

    let xml = extended_markup(&file);
    assert!(xml.contains(concat!(
        r#"<block type="basic_set_color">"#,
        r#"<value name="color"><shadow type="colorNumberPicker"><field name="value">255</field></shadow></value>"#,
    )));
}

#[test]
fn test_tagged_template_becomes_field() {
    let f = SyntaxFactory::new("main.ts", "let pic = img`# . #`;\n");
    let image = f.tagged_template("img", "# . #", "images.createImage");
    let file = f.file(vec![f.let_stmt("pic", 0, image)]);

    let xml = extended_markup(&file);
    assert!(xml.contains(r#"<block type="images_create_image"><field name="leds"># . #</field></block>"#));
}

#[test]
fn test_function_with_if_else_returns() {
    let text = "function sign(value: number) {\n    if (value < 0) {\n        return -1;\n    } else {\n        return 1;\n    }\n}\n";
    let f = SyntaxFactory::new("main.ts", text);
    let parameter = f.param("value", 0, Type::Number);
    let condition = f.binary(
        f.ident("value", 1, Type::Number),
        BinaryOperator::Less,
        f.num("0", 0),
        Type::Boolean,
    );
    let negative = f.block(vec![f.return_stmt(f.prefix(UnaryOperator::Minus, f.num("1", 0)))]);
    let positive = f.block(vec![f.return_stmt(f.num("1", 1))]);
    let body = f.block(vec![f.if_stmt(condition, negative, Some(positive))]);
    let file = f.file(vec![f.function("sign", 0, vec![parameter], body)]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.starts_with(r#"<xml xmlns="https://developers.google.com/blockly/xml">"#));
    assert!(xml.contains(r#"<block type="function_definition">"#));
    assert!(xml.contains(r#"<block type="controls_if"><mutation elseif="0" else="1"/>"#));
    assert!(xml.contains(r#"<block type="logic_compare"><field name="OP">LT</field>"#));
    assert_eq!(xml.matches(r#"<block type="function_return">"#).count(), 2);
    assert!(!xml.contains("pxt-on-start"));
}

#[test]
fn test_argument_after_handler_uses_first_slot() {
    let text = "timer.after(() => {\n    basic.showNumber(1);\n}, 100);\n";
    let f = SyntaxFactory::new("main.ts", text);
    let body = f.block(vec![show_number(&f, 0, f.num("1", 0))]);
    let call = f.call(
        f.path("timer.after", 0, Some("timer.after"), Type::Void),
        vec![f.arrow(Vec::new(), body), f.num("100", 0)],
        Some("timer.after"),
        Type::Void,
    );
    let file = f.file(vec![f.expr_stmt(call)]);

    let xml = extended_markup(&file);
    assert!(xml.contains(concat!(
        r#"<block type="timer_after">"#,
        r#"<value name="ms"><shadow type="math_number"><field name="NUM">100</field></shadow></value>"#,
        r#"<statement name="HANDLER"><block type="basic_show_number">"#,
    )));
    assert!(!xml.contains("typescript_statement"));
}

/*!
# Decompilation tests

Whole-file decompilation of small programs built with the syntax factory:
block layout, shadows, loops, events, snippet mode and source maps.
*/

mod common;

use blocks_decompiler::syntax::{BinaryOperator, SyntaxFactory, Type};
use blocks_decompiler::DecompileOptions;
use common::{compact, counting_loop, markup, show_number};
use pretty_assertions::assert_eq;

#[test]
fn test_single_call_inside_on_start() {
    let f = SyntaxFactory::new("main.ts", "basic.showNumber(5);\n");
    let file = f.file(vec![show_number(&f, 0, f.num("5", 0))]);

    let xml = markup(&file, DecompileOptions::default());
    assert_eq!(
        compact(&xml),
        concat!(
            r#"<xml xmlns="https://developers.google.com/blockly/xml">"#,
            r#"<block type="pxt-on-start" id="on-start">"#,
            r#"<statement name="HANDLER">"#,
            r#"<block type="basic_show_number">"#,
            r#"<value name="number"><shadow type="math_number"><field name="NUM">5</field></shadow></value>"#,
            r#"</block>"#,
            r#"</statement>"#,
            r#"</block>"#,
            r#"</xml>"#,
        )
    );
}

#[test]
fn test_literal_written_once_as_shadow() {
    let f = SyntaxFactory::new("main.ts", "basic.showNumber(42);\n");
    let file = f.file(vec![show_number(&f, 0, f.num("42", 0))]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert_eq!(xml.matches(r#"<shadow type="math_number">"#).count(), 1);
    assert!(!xml.contains(r#"<block type="math_number">"#));
}

#[test]
fn test_variable_argument_keeps_default_shadow() {
    let f = SyntaxFactory::new("main.ts", "let n = 5;\nbasic.showNumber(n);\n");
    let file = f.file(vec![
        f.let_stmt("n", 0, f.num("5", 0)),
        show_number(&f, 0, f.ident("n", 1, Type::Number)),
    ]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(concat!(
        r#"<block type="variables_set"><field name="VAR">n</field>"#,
        r#"<value name="VALUE"><shadow type="math_number"><field name="NUM">5</field></shadow></value>"#,
    )));
    assert!(xml.contains(concat!(
        r#"<value name="number">"#,
        r#"<shadow type="math_number"><field name="NUM">0</field></shadow>"#,
        r#"<block type="variables_get"><field name="VAR">n</field></block>"#,
        r#"</value>"#,
    )));
}

#[test]
fn test_unused_index_becomes_repeat() {
    let text = "for (let i = 0; i < 4; i++) {\n    basic.showNumber(7);\n}\n";
    let f = SyntaxFactory::new("main.ts", text);
    let repeat = counting_loop(&f, "i", 0, BinaryOperator::Less, f.num("4", 0), 0, |f| {
        vec![show_number(f, 0, f.num("7", 0))]
    });
    let file = f.file(vec![repeat]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(concat!(
        r#"<block type="controls_repeat_ext">"#,
        r#"<value name="TIMES"><shadow type="math_number"><field name="NUM">4</field></shadow></value>"#,
        r#"<statement name="DO"><block type="basic_show_number">"#,
    )));
    assert!(!xml.contains("pxt_controls_for"));
}

#[test]
fn test_used_index_becomes_for_with_inclusive_bound() {
    let text = "for (let i = 0; i < 4; i++) {\n    basic.showNumber(i);\n}\n";
    let f = SyntaxFactory::new("main.ts", text);
    let counting = counting_loop(&f, "i", 0, BinaryOperator::Less, f.num("4", 0), 0, |f| {
        vec![show_number(f, 0, f.ident("i", 3, Type::Number))]
    });
    let file = f.file(vec![counting]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(concat!(
        r#"<block type="pxt_controls_for">"#,
        r#"<value name="VAR"><shadow type="variables_get_reporter"><field name="VAR">i</field></shadow></value>"#,
        r#"<value name="TO"><shadow type="math_number"><field name="NUM">3</field></shadow></value>"#,
    )));
    assert!(xml.contains(r#"<block type="variables_get"><field name="VAR">i</field></block>"#));
}

#[test]
fn test_less_or_equal_keeps_bound() {
    let text = "for (let k = 0; k <= 4; k++) {\n    basic.showNumber(k);\n}\n";
    let f = SyntaxFactory::new("main.ts", text);
    let counting = counting_loop(&f, "k", 0, BinaryOperator::LessEqual, f.num("4", 0), 0, |f| {
        vec![show_number(f, 0, f.ident("k", 3, Type::Number))]
    });
    let file = f.file(vec![counting]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(
        r#"<value name="TO"><shadow type="math_number"><field name="NUM">4</field></shadow></value>"#
    ));
}

#[test]
fn test_event_is_separate_top_level_block() {
    let text = "loops.forever(() => {\n    basic.showNumber(1);\n});\nbasic.showNumber(2);\n";
    let f = SyntaxFactory::new("main.ts", text);
    let body = f.block(vec![show_number(&f, 0, f.num("1", 0))]);
    let forever = f.expr_stmt(f.call(
        f.path("loops.forever", 0, Some("loops.forever"), Type::Void),
        vec![f.arrow(Vec::new(), body)],
        Some("loops.forever"),
        Type::Void,
    ));
    let file = f.file(vec![forever, show_number(&f, 1, f.num("2", 0))]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    let event = xml.find(r#"<block type="device_forever">"#).expect("event block");
    let on_start = xml.find(r#"<block type="pxt-on-start""#).expect("on start block");
    assert!(event < on_start);
    assert!(xml.contains(concat!(
        r#"<block type="device_forever"><statement name="HANDLER"><block type="basic_show_number">"#,
        r#"<value name="number"><shadow type="math_number"><field name="NUM">1</field></shadow></value>"#,
    )));
}

#[test]
fn test_enum_argument_becomes_field() {
    let text = "input.onButtonPressed(Button.A, () => {\n    basic.showNumber(1);\n});\n";
    let f = SyntaxFactory::new("main.ts", text);
    let body = f.block(vec![show_number(&f, 0, f.num("1", 0))]);
    let button = f.path(
        "Button.A",
        0,
        Some("Button.A"),
        Type::Enum {
            name: "Button".to_string(),
        },
    );
    let event = f.expr_stmt(f.call(
        f.path("input.onButtonPressed", 0, Some("input.onButtonPressed"), Type::Void),
        vec![button, f.arrow(Vec::new(), body)],
        Some("input.onButtonPressed"),
        Type::Void,
    ));
    let file = f.file(vec![event]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(r#"<block type="device_button_event"><field name="button">Button.A</field>"#));
    assert!(!xml.contains("pxt-on-start"));
}

#[test]
fn test_snippet_mode_has_no_on_start() {
    let f = SyntaxFactory::new("main.ts", "basic.showNumber(5);\n");
    let file = f.file(vec![show_number(&f, 0, f.num("5", 0))]);

    let xml = compact(&markup(&file, DecompileOptions::default().with_snippet_mode(true)));
    assert!(!xml.contains("pxt-on-start"));
    assert!(xml.contains(r#"<xml xmlns="https://developers.google.com/blockly/xml"><block type="basic_show_number">"#));
}

#[test]
fn test_empty_program_can_force_on_start() {
    let f = SyntaxFactory::new("main.ts", "");
    let file = f.file(Vec::new());

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert_eq!(xml, r#"<xml xmlns="https://developers.google.com/blockly/xml"></xml>"#);

    let options = DecompileOptions {
        always_emit_on_start: true,
        ..DecompileOptions::default()
    };
    let xml = compact(&markup(&file, options));
    assert!(xml.contains(r#"<block type="pxt-on-start" id="on-start">"#));
}

#[test]
fn test_decompilation_is_deterministic() {
    let text = "let n = 5;\nfor (let i = 0; i < 4; i++) {\n    basic.showNumber(n);\n}\n";
    let build = || {
        let f = SyntaxFactory::new("main.ts", text);
        let declaration = f.let_stmt("n", 0, f.num("5", 0));
        let repeat = counting_loop(&f, "i", 0, BinaryOperator::Less, f.num("4", 0), 0, |f| {
            vec![show_number(f, 0, f.ident("n", 1, Type::Number))]
        });
        f.file(vec![declaration, repeat])
    };

    let first = markup(&build(), DecompileOptions::default());
    let second = markup(&build(), DecompileOptions::default());
    assert_eq!(first, second);
}

#[test]
fn test_source_map_ids_appear_in_markup() {
    let f = SyntaxFactory::new("main.ts", "basic.showNumber(5);\nbasic.showNumber(6);\n");
    let file = f.file(vec![
        show_number(&f, 0, f.num("5", 0)),
        show_number(&f, 1, f.num("6", 0)),
    ]);

    let result = common::decompile_with(&file, DecompileOptions::default().with_source_map(true));
    let xml = result.output_text().expect("markup").to_string();
    let source_map = result.source_map.expect("source map");
    assert_eq!(source_map.len(), 2);
    assert_eq!((source_map[0].start_pos, source_map[0].end_pos), (0, 20));
    assert_eq!((source_map[1].start_pos, source_map[1].end_pos), (21, 41));
    for entry in &source_map {
        assert!(xml.contains(&format!(r#"id="{}""#, entry.id)));
    }
}

#[test]
fn test_output_file_named_after_source() {
    let f = SyntaxFactory::new("main.ts", "basic.showNumber(5);\n");
    let file = f.file(vec![show_number(&f, 0, f.num("5", 0))]);

    let result = common::decompile_with(&file, DecompileOptions::default());
    assert_eq!(result.output_files.keys().collect::<Vec<_>>(), vec!["main.blocks"]);
}

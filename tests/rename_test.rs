/*!
# Rename resolution tests

Collisions between lexically scoped declarations and already taken names,
within one file and across the files of a project.
*/

mod common;

use blocks_decompiler::decompiler::{resolve_renames, BindingReferenceFinder, RenamePolicy};
use blocks_decompiler::syntax::{BinaryOperator, SyntaxFactory, Type};
use blocks_decompiler::{DecompileOptions, Decompiler, TakenNames};
use common::{api_metadata, compact, counting_loop, show_number};
use pretty_assertions::assert_eq;

const NESTED_LOOPS: &str = "for (let i = 0; i < 4; i++) {\n    for (let i = 0; i < 4; i++) {\n        basic.showNumber(i);\n    }\n}\n";

fn nested_loops() -> blocks_decompiler::SourceFile {
    let f = SyntaxFactory::new("main.ts", NESTED_LOOPS);
    let outer = counting_loop(&f, "i", 0, BinaryOperator::Less, f.num("4", 0), 0, |f| {
        vec![counting_loop(f, "i", 3, BinaryOperator::Less, f.num("4", 1), 1, |f| {
            vec![show_number(f, 0, f.ident("i", 6, Type::Number))]
        })]
    });
    f.file(vec![outer])
}

#[test]
fn test_no_collisions_produce_no_edits() {
    let f = SyntaxFactory::new("main.ts", "let n = 5;\nbasic.showNumber(n);\n");
    let file = f.file(vec![
        f.let_stmt("n", 0, f.num("5", 0)),
        show_number(&f, 0, f.ident("n", 1, Type::Number)),
    ]);
    let mut taken: TakenNames = ["a"].into_iter().collect();

    let renames = resolve_renames(
        &file,
        &mut taken,
        &BindingReferenceFinder::new(&file),
        &RenamePolicy::default(),
    );
    assert!(renames.is_empty());

    let mut names: Vec<&str> = taken.iter().collect();
    names.sort();
    assert_eq!(names, vec!["a", "n"]);
}

#[test]
fn test_nested_declaration_renamed_to_next_letter() {
    let file = nested_loops();
    let mut taken = TakenNames::new();

    let renames = resolve_renames(
        &file,
        &mut taken,
        &BindingReferenceFinder::new(&file),
        &RenamePolicy::default(),
    );

    // объявление, условие, инкремент и аргумент вызова
    assert_eq!(renames.len(), 4);
    for edit in renames.edits() {
        assert_eq!(edit.name, "j");
        assert_eq!(edit.diff, 0);
        assert_eq!(file.text_of(edit.span), "i");
    }
    assert!(taken.contains("i"));
    assert!(taken.contains("j"));
}

#[test]
fn test_nested_loops_use_renamed_index() {
    let file = nested_loops();
    let xml = compact(&common::markup(&file, DecompileOptions::default()));

    // внешний индекс не используется в теле
    assert!(xml.contains(r#"<block type="controls_repeat_ext">"#));
    assert!(xml.contains(
        r#"<value name="VAR"><shadow type="variables_get_reporter"><field name="VAR">j</field></shadow></value>"#
    ));
    assert!(xml.contains(r#"<block type="variables_get"><field name="VAR">j</field></block>"#));
}

#[test]
fn test_suffix_rename_reports_length_diff() {
    let text = "let item = 1;\nbasic.showNumber(item);\n";
    let f = SyntaxFactory::new("main.ts", text);
    let file = f.file(vec![
        f.let_stmt("item", 0, f.num("1", 0)),
        show_number(&f, 0, f.ident("item", 1, Type::Number)),
    ]);
    let mut taken: TakenNames = ["item"].into_iter().collect();

    let renames = resolve_renames(
        &file,
        &mut taken,
        &BindingReferenceFinder::new(&file),
        &RenamePolicy::default(),
    );
    assert_eq!(renames.len(), 2);
    assert!(renames.edits().iter().all(|e| e.name == "item2" && e.diff == 1));
    assert!(taken.contains("item2"));
}

#[test]
fn test_names_carry_across_project_files() {
    let metadata = api_metadata();
    let decompiler = Decompiler::new(&metadata, DecompileOptions::default());
    let mut taken = TakenNames::new();

    let build = |name: &str| {
        let f = SyntaxFactory::new(name, "let i = 1;\nbasic.showNumber(i);\n");
        f.file(vec![
            f.let_stmt("i", 0, f.num("1", 0)),
            show_number(&f, 0, f.ident("i", 1, Type::Number)),
        ])
    };

    let first = decompiler.decompile_file(&build("main.ts"), &mut taken);
    let second = decompiler.decompile_file(&build("util.ts"), &mut taken);

    let first = compact(first.output_text().expect("first file"));
    let second = compact(second.output_text().expect("second file"));
    assert!(first.contains(r#"<field name="VAR">i</field>"#));
    assert!(second.contains(r#"<field name="VAR">j</field>"#));
    assert!(!second.contains(r#"<field name="VAR">i</field>"#));
}

#[test]
fn test_grey_block_text_uses_new_names() {
    let text = "let i = 1;\nfoo(i);\n";
    let f = SyntaxFactory::new("main.ts", text);
    let declaration = f.let_stmt("i", 0, f.num("1", 0));
    let unknown = f.call(
        f.ident("foo", 0, Type::Unknown),
        vec![f.ident("i", 1, Type::Number)],
        None,
        Type::Void,
    );
    let file = f.file(vec![declaration, f.expr_stmt(unknown)]);
    let mut taken: TakenNames = ["i"].into_iter().collect();

    let metadata = api_metadata();
    let result = Decompiler::new(&metadata, DecompileOptions::default()).decompile_file(&file, &mut taken);
    let xml = result.output_text().expect("markup");
    assert!(xml.contains(r#"line0="foo(j);""#));
}

/*!
# Comment placement tests

Leading, trailing and free-standing comments around top-level and nested
statements.
*/

mod common;

use blocks_decompiler::syntax::{SyntaxFactory, Type};
use blocks_decompiler::DecompileOptions;
use common::{compact, markup, show_number};
use pretty_assertions::assert_eq;

/// Id referenced by the first workspace comment of `xml`.
fn workspace_comment_id(xml: &str) -> Option<&str> {
    let start = xml.find(" data=\"")? + " data=\"".len();
    let end = start + xml[start..].find('"')?;
    Some(&xml[start..end])
}

#[test]
fn test_adjacent_comment_attaches_to_statement() {
    let f = SyntaxFactory::new("main.ts", "// show five\nbasic.showNumber(5);\n");
    let file = f.file(vec![show_number(&f, 0, f.num("5", 0))]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(r#"<comment pinned="false">show five</comment>"#));
    assert!(workspace_comment_id(&xml).is_none());
}

#[test]
fn test_blank_line_makes_workspace_comment() {
    let f = SyntaxFactory::new("main.ts", "// floating\n\nbasic.showNumber(5);\n");
    let file = f.file(vec![show_number(&f, 0, f.num("5", 0))]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(!xml.contains(r#"pinned="false""#));
    let id = workspace_comment_id(&xml).expect("workspace comment");
    assert!(xml.contains(&format!(r#"data="{}">floating</comment>"#, id)));
    assert!(xml.contains(&format!("<data>{}</data>", id)));
}

#[test]
fn test_trailing_comment_on_same_line() {
    let f = SyntaxFactory::new("main.ts", "basic.showNumber(5); // five\nbasic.showNumber(6);\n");
    let file = f.file(vec![
        show_number(&f, 0, f.num("5", 0)),
        show_number(&f, 1, f.num("6", 0)),
    ]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(concat!(
        r#"<field name="NUM">5</field></shadow></value>"#,
        r#"<next><block type="basic_show_number">"#,
    )));
    assert_eq!(xml.matches(r#"<comment pinned="false">five</comment>"#).count(), 1);
    // комментарий первого оператора идёт после его <next>
    let comment = xml.find("five</comment>").expect("comment");
    let second = xml.find(r#"<field name="NUM">6</field>"#).expect("second call");
    assert!(second < comment);
}

#[test]
fn test_comments_after_last_statement_float() {
    let f = SyntaxFactory::new("main.ts", "basic.showNumber(5);\n\n// the end\n");
    let file = f.file(vec![show_number(&f, 0, f.num("5", 0))]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(">the end</comment></xml>"));
    assert!(!xml.contains(r#"pinned="false""#));
}

#[test]
fn test_nested_comments_stay_on_statements() {
    let text = "loops.forever(() => {\n    // inside\n\n    basic.showNumber(1);\n});\n";
    let f = SyntaxFactory::new("main.ts", text);
    let body = f.block(vec![show_number(&f, 0, f.num("1", 0))]);
    let forever = f.expr_stmt(f.call(
        f.path("loops.forever", 0, Some("loops.forever"), Type::Void),
        vec![f.arrow(Vec::new(), body)],
        Some("loops.forever"),
        Type::Void,
    ));
    let file = f.file(vec![forever]);

    let xml = compact(&markup(&file, DecompileOptions::default()));
    assert!(xml.contains(r#"<comment pinned="false">inside</comment>"#));
    assert!(workspace_comment_id(&xml).is_none());
}

/*!
# CLI input tests

Syntax trees, metadata and options loaded from files the way the command
line tool reads them.
*/

mod common;

use blocks_decompiler::cli_common::{self, OptionArgs};
use blocks_decompiler::syntax::{SyntaxFactory, Type};
use blocks_decompiler::{decompile, DecompileOptions, SourceFile};
use common::{api_metadata, show_number};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn sample_program() -> SourceFile {
    let f = SyntaxFactory::new("main.ts", "let n = 5;\nbasic.showNumber(n);\n");
    f.file(vec![
        f.let_stmt("n", 0, f.num("5", 0)),
        show_number(&f, 0, f.ident("n", 1, Type::Number)),
    ])
}

#[test]
fn test_tree_and_metadata_from_json_files() {
    let temp_dir = TempDir::new().unwrap();
    let tree_path = temp_dir.path().join("main.json");
    let metadata_path = temp_dir.path().join("api.json");

    let program = sample_program();
    fs::write(&tree_path, serde_json::to_string_pretty(&program).unwrap()).unwrap();
    fs::write(&metadata_path, serde_json::to_string(&api_metadata()).unwrap()).unwrap();

    let loaded = cli_common::load_source_file(&tree_path).unwrap();
    assert_eq!(loaded, program);
    let metadata = cli_common::load_metadata(&metadata_path).unwrap();

    let from_files = decompile(&loaded, &metadata, DecompileOptions::default());
    let in_memory = decompile(&program, &api_metadata(), DecompileOptions::default());
    assert!(from_files.success);
    assert_eq!(from_files.output_text(), in_memory.output_text());
}

#[test]
fn test_options_file_with_flag_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("decompiler.toml");
    DecompileOptions::default()
        .with_snippet_mode(true)
        .save_to_file(&config_path)
        .unwrap();

    let options = cli_common::load_options(Some(&config_path)).unwrap();
    assert!(options.snippet_mode);

    let flags = OptionArgs {
        source_map: true,
        max_blocks: Some(50),
        ..OptionArgs::default()
    };
    let options = flags.apply(options);
    assert!(options.snippet_mode);
    assert!(options.generate_source_map);
    assert_eq!(options.max_blocks, 50);

    let result = decompile(&sample_program(), &api_metadata(), options);
    let xml = result.output_text().unwrap();
    assert!(!xml.contains("pxt-on-start"));
    assert_eq!(result.source_map.map(|m| m.len()), Some(2));
}

#[test]
fn test_invalid_options_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("decompiler.yaml");
    fs::write(&config_path, "renameSingleLetterSkip: ['X']\n").unwrap();

    let error = cli_common::load_options(Some(&config_path)).unwrap_err();
    assert!(format!("{:#}", error).contains("lowercase"));
}

#[test]
fn test_malformed_tree_reports_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let tree_path = temp_dir.path().join("broken.json");
    fs::write(&tree_path, r#"{"fileName": "main.ts", "text": ""}"#).unwrap();

    assert!(cli_common::load_source_file(&tree_path).is_err());
}

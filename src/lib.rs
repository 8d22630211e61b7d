/*!
# Blocks Decompiler

Decompiler from a typed, restricted TypeScript syntax tree back into a
Blockly workspace (`.blocks` XML). The host front-end parses and type-checks
the program and hands over the tree and the API symbol metadata as JSON;
this crate decides what can be shown as blocks, builds the block tree and
serializes it.

## Features

- **Feasibility checking** per statement and expression, with grey
  (opaque) blocks for everything that cannot be represented faithfully
- **Rename resolution** for lexically scoped variables that collide in the
  global block variable namespace
- **Comment attachment** to statements or free workspace comments
- **Shadow-aware serialization** with deterministic ids
- **Strict mode** that turns every grey block into an error
- **Block ceiling** for oversized programs

## Architecture

```text
Blocks Decompiler
├── Syntax       - Input tree model, visitor, test factory
├── Metadata     - API symbol metadata table
├── Decompiler   - Checker, renames, builder, comments, serializer
├── Diagnostics  - Errors, warnings, codes
├── Core         - Error types, positions, results
└── CLI          - decompile / check / config
```

## Usage

### CLI
```bash
# Decompile a project, carrying variable names across files
blocks-decompiler decompile -i main.json -i util.json -m api.json -o out/

# Strict check: report statements that would become grey blocks
blocks-decompiler check -i main.json -m api.json --strict

# Default options file
blocks-decompiler config init --output decompiler.toml
```

### Library
```rust,no_run
use blocks_decompiler::{decompile, DecompileOptions, SourceFile, SymbolMetadataTable};

# fn main() -> anyhow::Result<()> {
let file: SourceFile = serde_json::from_str(&std::fs::read_to_string("main.json")?)?;
let metadata = SymbolMetadataTable::load_from_file("api.json")?;
let result = decompile(&file, &metadata, DecompileOptions::default());
if let Some(xml) = result.output_text() {
    println!("{}", xml);
}
# Ok(())
# }
```
*/

pub mod cli_common;
pub mod core;
pub mod decompiler;
pub mod diagnostics;
pub mod metadata;
pub mod syntax;

// Re-export main types for convenience
pub use core::{BuildResult, DecompileError, DecompileResult, LineIndex, SourceMapEntry, TextSpan};
pub use decompiler::{decompile, output_file_name, DecompileOptions, Decompiler, TakenNames};
pub use diagnostics::{Diagnostic, DiagnosticSeverity};
pub use metadata::SymbolMetadataTable;
pub use syntax::SourceFile;

/*!
# Core Module

Core functionality for the blocks decompiler: error types, source
positions, result objects and file helpers.
*/

pub mod errors;
pub mod results;
pub mod position;
pub mod fs_utils;

pub use errors::{BuildResult, DecompileError};
pub use results::{DecompileResult, SourceMapEntry};
pub use position::{LineIndex, Position, TextSpan};
pub use fs_utils::{read_json_file, read_text_file};

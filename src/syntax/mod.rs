/*!
# Syntax model

Immutable, already type-checked syntax tree produced by the host compiler
front-end. The decompiler reads positions, kinds, types, binding ids and
resolved symbol names; it never parses or mutates source code.
*/

pub mod ast;
#[cfg(any(test, feature = "test-support"))]
pub mod factory;
pub mod visit;

pub use ast::*;
#[cfg(any(test, feature = "test-support"))]
pub use factory::SyntaxFactory;
pub use visit::{
    collect_expression_identifiers, collect_identifiers, walk_expression, walk_statement,
    walk_statements, NodeRef, VisitControl, Visitor,
};

#![allow(clippy::result_large_err)]
//! mscript-core: front end for block-structured material scripts.
//!
//! Turns script text into a fully resolved tree: imports spliced in,
//! inheritance overlaid, variables expanded. Stages, in order:
//!
//! - [`lexer`] -- text to tokens
//! - [`parser`] -- tokens to a concrete node forest ([`cst`])
//! - [`builder`] -- concrete forest to the typed [`ast`]
//! - [`pass1_imports`] -- `import` resolution and the session import table
//! - [`pass2_overlay`] -- multi-base inheritance
//! - [`pass3_variables`] -- `$variable` expansion
//!
//! [`Session`] runs them for single files and batches; [`serialize`]
//! renders the result as JSON for downstream emitters.

pub mod ast;
pub mod builder;
pub mod compile;
pub mod cst;
pub mod error;
pub mod glob;
pub mod ids;
pub mod lexer;
pub mod parser;
pub mod pass1_imports;
pub mod pass2_overlay;
pub mod pass3_variables;
pub mod serialize;
pub mod source;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{AbstractNode, AtomNode, Env, ObjectNode, PropertyNode};
pub use error::{CompileError, ErrorKind, Severity};
pub use ids::IdTable;
pub use source::{FileSystemProvider, InMemoryProvider, SourceProvider};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use compile::{build_tree, BatchReport, CompileOutput, FileResult, Session};
pub use lexer::lex;
pub use parser::parse;

//! Surface formula language: `lexer` → `parser` → bind/fold/lower (`compile`) → stack `vm`.

pub(crate) mod ast;
pub(crate) mod bytecode;
pub(crate) mod compile;
pub(crate) mod error;
pub(crate) mod lexer;
pub(crate) mod parser;
pub(crate) mod vm;

pub use compile::{FORMULA_PARAMETERS, SurfaceProgram};

//! Mutation compiler
//!
//! Turns a schema plus a batch of row maps into positional-parameter
//! INSERT/UPDATE/DELETE statements. Compilation is all-or-nothing per
//! call: the first failing row discards every statement compiled so far.

mod errors;
mod statements;

pub use errors::{CompileError, CompileResult};
pub use statements::{
    compile_delete, compile_insert, compile_update, CompiledBatch, CompiledStatement, WHERE_KEY,
};

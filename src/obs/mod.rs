//! Structured logging
//!
//! The execution coordinator and query runner emit one JSON line per
//! failure or rollback; there is no fatal path, every failure is a
//! returned result.

mod logger;

pub use logger::{Logger, Severity};

//! checkgen: compile doc-comment validation annotations on Rust structs
//! into generated validator source.
//!
//! Pipeline: scan → bootstrap → extract → synthesize.
//! - Scan source files statically (no execution) for struct declarations,
//!   type-level override directives, and custom-hook methods.
//! - Synthesize a throwaway driver crate that links the scanned package and
//!   this library, and run it through cargo; the driver carries compile-time
//!   type probes so every discovered record is checked at its resolved
//!   import path before any generation happens.
//! - Inside the driver, build a field tree per record and render one
//!   `<name>_validate.rs` companion file per record, recursing into nested
//!   records and deduplicating the files actually written.

pub mod bootstrap;
pub mod cli;
pub mod emit;
pub mod error;
pub mod generate;
pub mod model;
pub mod pipeline;
pub mod rules;
pub mod scan;
pub mod workspace;

pub use error::{Error, Result};

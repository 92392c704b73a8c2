// Unsafe code should not be used.
// Hard to reason about correctness, and maintainability.
#![forbid(unsafe_code)]
// Ensure that all lint names are valid.
#![deny(unknown_lints)]
// Fail-fast lints: correctness, safety, and API surface
#![deny(
    clippy::panic, // forbid explicit panic! macro
    clippy::todo, // blocks remaining todo! placeholders
    clippy::unimplemented, // blocks unimplemented! placeholders
    clippy::unwrap_used, // reject Result/Option unwraps
    clippy::expect_used, // reject expect with panic messages
    dead_code, // ban unused items
    nonstandard_style, // enforce idiomatic naming/style
    unreachable_patterns, // catch unreachable match arms
    trivial_casts, // block needless casts
    unused_import_braces, // avoid unused braces in imports
)]
// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod builder;
mod coerce;
mod errors;
mod interpreter;
mod ops;
mod rule;
mod strings;
mod value;

pub use coerce::{falsy, truthy};
pub use errors::Error;
pub use interpreter::VariableAccessor;
pub use rule::{apply, build, data_accessor, positional_accessor, Rule};
pub use value::Value;

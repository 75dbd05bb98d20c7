pub mod repl;
pub mod tokenizer;
pub mod parser;
pub mod ast;
pub mod expander;
pub mod executor;
pub mod environment;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;

pub use repl::{LineOutcome, Shell};

//! Task Dispatch - natural-language tasks over a sandboxed data directory

pub mod command;
pub mod core;
pub mod llm;
pub mod operations;
pub mod process;
pub mod server;
pub mod synthesis;

//! Task execution pipeline
//!
//! Converts free-text tasks into operation calls:
//! TaskRequest -> classify -> validate -> ValidatedCall -> operation / synthesis

pub mod dispatcher;
pub mod validator;

pub use dispatcher::Dispatcher;
pub use validator::{validate, ValidatedCall};

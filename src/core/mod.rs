pub mod config;
pub mod error;
pub mod sandbox;
pub mod types;

pub use config::{DispatchConfig, NoMatchPolicy};
pub use error::{DispatchError, Result};
pub use sandbox::Sandbox;

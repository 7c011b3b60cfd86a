//! Common types for the opsdeck client workspace

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};

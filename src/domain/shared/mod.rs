//! Shared kernel - Common types used by every layer

pub mod error;
pub mod result;
pub mod value_objects;

pub use error::RelayError;
pub use result::Result;
pub use value_objects::*;

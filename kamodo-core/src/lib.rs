//! Kamodo Core - Fundamental types
//!
//! This crate provides the core types used throughout Kamodo:
//! - `Number`: Exact rational numbers for literals and unit scales
//! - `Array`: N-dimensional arrays with broadcasting
//! - `KamodoError`: Structured errors with machine-readable codes

mod number;
mod array;
mod broadcast;
mod error;

pub use number::{Number, NumberError};
pub use array::{Array, ArrayError};
pub use broadcast::{broadcast_shape, BroadcastPlan};
pub use error::{KamodoError, ErrorContext, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Array, Number, KamodoError};
    pub use crate::error::codes;
}

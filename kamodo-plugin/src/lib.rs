//! Kamodo Plugin System
//!
//! Provides the seams through which numeric code enters the registry:
//! - `NumericFn`: any callable over arrays with named parameters
//! - `kamodofy`: attach units, citation, equation and hidden args
//! - `Interpolator`: adapt an external interpolation routine

mod traits;
mod context;
mod kamodofy;
mod interp;

pub use traits::{NumericFn, bind_positional, bind_named};
pub use context::EvalContext;
pub use kamodofy::{kamodofy, snapshot, FnPlugin, Kamodofied, KamodofyBuilder, Meta};
pub use interp::{Interpolated, Interpolator};

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{
        kamodofy, EvalContext, FnPlugin, Interpolated, Interpolator, Kamodofied, Meta, NumericFn,
    };
    pub use kamodo_core::prelude::*;
}

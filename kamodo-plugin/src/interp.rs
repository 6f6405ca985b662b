//! Interpolator seam
//!
//! Gridded model output enters the registry through an external
//! interpolation routine. Only the capability is defined here.

use indexmap::IndexMap;
use kamodo_core::{Array, KamodoError};

use crate::{EvalContext, NumericFn};

/// Interpolation over a fixed set of coordinate dimensions
pub trait Interpolator: Send + Sync {
    /// Coordinate names, in argument order
    fn dims(&self) -> &[String];

    /// Interpolate at the given coordinates. Points outside the domain
    /// take `fill_value`.
    fn interpolate(&self, coords: &[Array], fill_value: f64) -> Result<Array, KamodoError>;
}

/// Adapts an [`Interpolator`] to [`NumericFn`]
pub struct Interpolated<I> {
    interp: I,
    defaults: IndexMap<String, Array>,
}

impl<I: Interpolator> Interpolated<I> {
    pub fn new(interp: I) -> Self {
        Self { interp, defaults: IndexMap::new() }
    }

    /// Builder: default coordinate array, typically the native grid
    pub fn with_default(mut self, dim: &str, value: impl Into<Array>) -> Self {
        self.defaults.insert(dim.to_string(), value.into());
        self
    }

    pub fn inner(&self) -> &I {
        &self.interp
    }
}

impl<I: Interpolator> NumericFn for Interpolated<I> {
    fn params(&self) -> &[String] {
        self.interp.dims()
    }

    fn defaults(&self) -> &IndexMap<String, Array> {
        &self.defaults
    }

    fn call(&self, args: &[Array], ctx: &EvalContext) -> Result<Array, KamodoError> {
        let dims = self.interp.dims();
        if args.len() != dims.len() {
            return Err(KamodoError::arg_count("interpolator", dims.len(), args.len()));
        }
        self.interp.interpolate(args, ctx.fill_value)
    }
}

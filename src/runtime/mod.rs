//! Environment-emulation support consumed during symbolic execution.
//!
//! The pipeline itself never executes library code; when execution would
//! leave the image, a [`StubRegistry`] handler rewrites the symbolic state
//! the way the missing routine would have; the registry documents the exact
//! per-entry effects.

mod stubs;

pub use stubs::{StubFn, StubRegistry};

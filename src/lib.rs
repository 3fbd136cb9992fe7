//! SIMD-packed forward-mode automatic differentiation.
//!
//! [`MDiff`] carries the exact gradient with respect to every independent
//! variable through lazy expression graphs evaluated lane-block by
//! lane-block; [`SDiff`] is the single-direction counterpart used for
//! directional derivatives. Gradient buffers live in a thread-local bump
//! arena scoped by a [`Context`].

pub mod alloc;
pub mod api;
pub mod arena;
pub mod expr;
pub mod float;
pub mod mdiff;
pub mod pack;
pub mod scalar;
pub mod sdiff;
mod traits;

pub use api::gradient;
pub use arena::Context;
pub use expr::{exp, Expr, MdExpr, MAX_SIMD_TEMPS};
pub use float::Float;
pub use mdiff::{independents, MDiff};
pub use pack::{next_multiple_of_lanes, SimdPack};
pub use scalar::Scalar;
pub use sdiff::SDiff;

use std::fmt::{Debug, Display, LowerExp};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

use crate::pack::SimdPack;

/// Marker trait for base floating-point types (`f32`, `f64`).
///
/// Bundles the numeric and utility traits needed throughout tenrec and
/// selects the SIMD vector type that carries packed derivative lanes.
/// Only primitive float types implement this — AD wrapper types do not.
pub trait Float:
    NumFloat
    + FloatConst
    + FromPrimitive
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + LowerExp
    + 'static
{
    /// The SIMD vector holding [`SimdPack::LANES`] values of this type.
    type Pack: SimdPack<Self>;
}

impl Float for f32 {
    type Pack = wide::f32x8;
}

impl Float for f64 {
    type Pack = wide::f64x4;
}

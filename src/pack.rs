//! SIMD pack facade over the `wide` vector types.
//!
//! Gradient storage is always sized to a multiple of the lane count, so
//! every packed loop in the crate walks full lanes without remainders.

use std::ops::{Add, Div, Mul, Neg, Sub};

use wide::{f32x8, f64x4};

use crate::float::Float;

/// Fixed-width packed float: elementwise arithmetic plus load/store on
/// lane-aligned slices.
pub trait SimdPack<F>:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Number of scalar lanes in one pack.
    const LANES: usize;

    /// Broadcast a scalar into every lane.
    fn splat(v: F) -> Self;

    /// All lanes zero.
    fn zero() -> Self;

    /// Read `LANES` values from the front of `src`.
    fn load(src: &[F]) -> Self;

    /// Write all lanes to the front of `dst`.
    fn store(self, dst: &mut [F]);
}

macro_rules! impl_simd_pack {
    ($pack:ty, $f:ty, $lanes:expr) => {
        impl SimdPack<$f> for $pack {
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(v: $f) -> Self {
                <$pack>::splat(v)
            }

            #[inline(always)]
            fn zero() -> Self {
                <$pack>::ZERO
            }

            #[inline(always)]
            fn load(src: &[$f]) -> Self {
                let mut lanes = [0.0; $lanes];
                lanes.copy_from_slice(&src[..$lanes]);
                Self::from(lanes)
            }

            #[inline(always)]
            fn store(self, dst: &mut [$f]) {
                let lanes: [$f; $lanes] = self.into();
                dst[..$lanes].copy_from_slice(&lanes);
            }
        }
    };
}

impl_simd_pack!(f64x4, f64, 4);
impl_simd_pack!(f32x8, f32, 8);

/// Round `n` up to the next multiple of the lane count of `F`.
#[inline]
pub fn next_multiple_of_lanes<F: Float>(n: usize) -> usize {
    let w = F::Pack::LANES;
    (n + w - 1) / w * w
}

/// Fill a lane-sized slice with a broadcast value.
///
/// `dst.len()` must be a multiple of the lane count.
#[inline]
pub fn fill_packed<F: Float>(dst: &mut [F], v: F) {
    debug_assert_eq!(dst.len() % F::Pack::LANES, 0);
    let p = F::Pack::splat(v);
    let mut i = 0;
    while i < dst.len() {
        p.store(&mut dst[i..]);
        i += F::Pack::LANES;
    }
}

/// `dst = -src`, lane-major.
#[inline]
pub fn negate_into<F: Float>(dst: &mut [F], src: &[F]) {
    debug_assert_eq!(dst.len(), src.len());
    debug_assert_eq!(dst.len() % F::Pack::LANES, 0);
    let mut i = 0;
    while i < dst.len() {
        (-F::Pack::load(&src[i..])).store(&mut dst[i..]);
        i += F::Pack::LANES;
    }
}

/// `dst += src`, lane-major.
#[inline]
pub fn add_assign_packed<F: Float>(dst: &mut [F], src: &[F]) {
    debug_assert_eq!(dst.len(), src.len());
    debug_assert_eq!(dst.len() % F::Pack::LANES, 0);
    let mut i = 0;
    while i < dst.len() {
        (F::Pack::load(&dst[i..]) + F::Pack::load(&src[i..])).store(&mut dst[i..]);
        i += F::Pack::LANES;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splat_load_store_roundtrip() {
        let src = [1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let p = <f64 as Float>::Pack::load(&src);
        let mut dst = [0.0; 8];
        p.store(&mut dst);
        assert_eq!(&dst[..4], &src[..4]);
        assert_eq!(&dst[4..], &[0.0; 4]);
    }

    #[test]
    fn pack_arithmetic() {
        let a = <f64 as Float>::Pack::splat(3.0);
        let b = <f64 as Float>::Pack::splat(2.0);
        let mut out = [0.0_f64; 4];
        (a * b + a - b).store(&mut out);
        assert_eq!(out, [7.0; 4]);
        (a / b).store(&mut out);
        assert_eq!(out, [1.5; 4]);
        (-a).store(&mut out);
        assert_eq!(out, [-3.0; 4]);
    }

    #[test]
    fn rounding_to_lanes() {
        assert_eq!(next_multiple_of_lanes::<f64>(0), 0);
        assert_eq!(next_multiple_of_lanes::<f64>(1), 4);
        assert_eq!(next_multiple_of_lanes::<f64>(4), 4);
        assert_eq!(next_multiple_of_lanes::<f64>(5), 8);
        assert_eq!(next_multiple_of_lanes::<f32>(3), 8);
        assert_eq!(next_multiple_of_lanes::<f32>(9), 16);
    }

    #[test]
    fn packed_helpers() {
        let mut a = vec![0.0_f64; 8];
        fill_packed(&mut a, 2.5);
        assert!(a.iter().all(|&v| v == 2.5));

        let mut b = vec![0.0_f64; 8];
        negate_into(&mut b, &a);
        assert!(b.iter().all(|&v| v == -2.5));

        add_assign_packed(&mut b, &a);
        assert!(b.iter().all(|&v| v == 0.0));
    }
}

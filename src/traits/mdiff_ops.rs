//! Operator impls for [`MDiff`] and expression proxies.
//!
//! Borrowed operands (`&MDiff`, [`Expr`]) build lazy nodes that fuse into
//! the enclosing expression. Owned operands evaluate eagerly through the
//! same nodes, which is what the AD-generic [`Scalar`](crate::Scalar)
//! algebra requires. Scalar mixing is implemented per float type, since a
//! generic right-hand side would collide with the expression impls.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::expr::{
    Expr, MdAdd, MdConstAdd, MdConstDiv, MdConstMul, MdConstSub, MdDiv, MdDivConst, MdExp, MdExpr,
    MdMul, MdNeg, MdSub,
};
use crate::float::Float;
use crate::mdiff::MDiff;

// ── Negation ──

impl<'a, F: Float> Neg for &'a MDiff<F> {
    type Output = Expr<F, MdNeg<&'a MDiff<F>>>;
    #[inline]
    fn neg(self) -> Self::Output {
        Expr::wrap(MdNeg::new(self))
    }
}

impl<F: Float, E: MdExpr<F>> Neg for Expr<F, E> {
    type Output = Expr<F, MdNeg<Expr<F, E>>>;
    #[inline]
    fn neg(self) -> Self::Output {
        Expr::wrap(MdNeg::new(self))
    }
}

impl<F: Float> Neg for MDiff<F> {
    type Output = MDiff<F>;
    #[inline]
    fn neg(self) -> MDiff<F> {
        MDiff::from_node(&MdNeg::new(&self))
    }
}

// ── Binary operators between differentiable operands ──

macro_rules! impl_md_binary_ops {
    ($Op:ident, $method:ident, $Node:ident) => {
        impl<'a, 'b, F: Float> $Op<&'b MDiff<F>> for &'a MDiff<F> {
            type Output = Expr<F, $Node<F, &'a MDiff<F>, &'b MDiff<F>>>;
            #[inline]
            fn $method(self, rhs: &'b MDiff<F>) -> Self::Output {
                Expr::wrap($Node::new(self, rhs))
            }
        }

        impl<'a, F: Float, R: MdExpr<F>> $Op<Expr<F, R>> for &'a MDiff<F> {
            type Output = Expr<F, $Node<F, &'a MDiff<F>, Expr<F, R>>>;
            #[inline]
            fn $method(self, rhs: Expr<F, R>) -> Self::Output {
                Expr::wrap($Node::new(self, rhs))
            }
        }

        impl<'a, F: Float, L: MdExpr<F>> $Op<&'a MDiff<F>> for Expr<F, L> {
            type Output = Expr<F, $Node<F, Expr<F, L>, &'a MDiff<F>>>;
            #[inline]
            fn $method(self, rhs: &'a MDiff<F>) -> Self::Output {
                Expr::wrap($Node::new(self, rhs))
            }
        }

        impl<F: Float, L: MdExpr<F>, R: MdExpr<F>> $Op<Expr<F, R>> for Expr<F, L> {
            type Output = Expr<F, $Node<F, Expr<F, L>, Expr<F, R>>>;
            #[inline]
            fn $method(self, rhs: Expr<F, R>) -> Self::Output {
                Expr::wrap($Node::new(self, rhs))
            }
        }

        // Owned operands: evaluate now, recycling both buffers.
        impl<F: Float> $Op for MDiff<F> {
            type Output = MDiff<F>;
            #[inline]
            fn $method(self, rhs: MDiff<F>) -> MDiff<F> {
                MDiff::from_node(&$Node::new(&self, &rhs))
            }
        }
    };
}

impl_md_binary_ops!(Add, add, MdAdd);
impl_md_binary_ops!(Sub, sub, MdSub);
impl_md_binary_ops!(Mul, mul, MdMul);
impl_md_binary_ops!(Div, div, MdDiv);

// ── Compound assignment: `x op= y` is `x = x op y` with a fresh buffer ──

macro_rules! impl_md_assign_ops {
    ($OpAssign:ident, $method:ident, $Node:ident) => {
        impl<F: Float> $OpAssign for MDiff<F> {
            #[inline]
            fn $method(&mut self, rhs: MDiff<F>) {
                let out = MDiff::from_node(&$Node::new(&*self, &rhs));
                *self = out;
            }
        }

        impl<'a, F: Float> $OpAssign<&'a MDiff<F>> for MDiff<F> {
            #[inline]
            fn $method(&mut self, rhs: &'a MDiff<F>) {
                let out = MDiff::from_node(&$Node::new(&*self, rhs));
                *self = out;
            }
        }

        impl<F: Float, E: MdExpr<F>> $OpAssign<Expr<F, E>> for MDiff<F> {
            #[inline]
            fn $method(&mut self, rhs: Expr<F, E>) {
                let out = MDiff::from_node(&$Node::new(&*self, rhs));
                *self = out;
            }
        }
    };
}

impl_md_assign_ops!(AddAssign, add_assign, MdAdd);
impl_md_assign_ops!(SubAssign, sub_assign, MdSub);
impl_md_assign_ops!(MulAssign, mul_assign, MdMul);
impl_md_assign_ops!(DivAssign, div_assign, MdDiv);

// ── Scalar mixing, per float type ──

macro_rules! impl_md_scalar_ops {
    ($f:ty) => {
        // x + c, c + x
        impl<'a> Add<$f> for &'a MDiff<$f> {
            type Output = Expr<$f, MdConstAdd<$f, &'a MDiff<$f>>>;
            #[inline]
            fn add(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdConstAdd::new(rhs, self))
            }
        }

        impl<'a> Add<&'a MDiff<$f>> for $f {
            type Output = Expr<$f, MdConstAdd<$f, &'a MDiff<$f>>>;
            #[inline]
            fn add(self, rhs: &'a MDiff<$f>) -> Self::Output {
                Expr::wrap(MdConstAdd::new(self, rhs))
            }
        }

        impl<E: MdExpr<$f>> Add<$f> for Expr<$f, E> {
            type Output = Expr<$f, MdConstAdd<$f, Expr<$f, E>>>;
            #[inline]
            fn add(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdConstAdd::new(rhs, self))
            }
        }

        impl<E: MdExpr<$f>> Add<Expr<$f, E>> for $f {
            type Output = Expr<$f, MdConstAdd<$f, Expr<$f, E>>>;
            #[inline]
            fn add(self, rhs: Expr<$f, E>) -> Self::Output {
                Expr::wrap(MdConstAdd::new(self, rhs))
            }
        }

        impl Add<$f> for MDiff<$f> {
            type Output = MDiff<$f>;
            #[inline]
            fn add(self, rhs: $f) -> MDiff<$f> {
                MDiff::from_node(&MdConstAdd::new(rhs, &self))
            }
        }

        impl Add<MDiff<$f>> for $f {
            type Output = MDiff<$f>;
            #[inline]
            fn add(self, rhs: MDiff<$f>) -> MDiff<$f> {
                MDiff::from_node(&MdConstAdd::new(self, &rhs))
            }
        }

        // x − c folds into the addition node; c − x negates the derivative.
        impl<'a> Sub<$f> for &'a MDiff<$f> {
            type Output = Expr<$f, MdConstAdd<$f, &'a MDiff<$f>>>;
            #[inline]
            fn sub(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdConstAdd::new(-rhs, self))
            }
        }

        impl<'a> Sub<&'a MDiff<$f>> for $f {
            type Output = Expr<$f, MdConstSub<$f, &'a MDiff<$f>>>;
            #[inline]
            fn sub(self, rhs: &'a MDiff<$f>) -> Self::Output {
                Expr::wrap(MdConstSub::new(self, rhs))
            }
        }

        impl<E: MdExpr<$f>> Sub<$f> for Expr<$f, E> {
            type Output = Expr<$f, MdConstAdd<$f, Expr<$f, E>>>;
            #[inline]
            fn sub(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdConstAdd::new(-rhs, self))
            }
        }

        impl<E: MdExpr<$f>> Sub<Expr<$f, E>> for $f {
            type Output = Expr<$f, MdConstSub<$f, Expr<$f, E>>>;
            #[inline]
            fn sub(self, rhs: Expr<$f, E>) -> Self::Output {
                Expr::wrap(MdConstSub::new(self, rhs))
            }
        }

        impl Sub<$f> for MDiff<$f> {
            type Output = MDiff<$f>;
            #[inline]
            fn sub(self, rhs: $f) -> MDiff<$f> {
                MDiff::from_node(&MdConstAdd::new(-rhs, &self))
            }
        }

        impl Sub<MDiff<$f>> for $f {
            type Output = MDiff<$f>;
            #[inline]
            fn sub(self, rhs: MDiff<$f>) -> MDiff<$f> {
                MDiff::from_node(&MdConstSub::new(self, &rhs))
            }
        }

        // c · x, x · c
        impl<'a> Mul<$f> for &'a MDiff<$f> {
            type Output = Expr<$f, MdConstMul<$f, &'a MDiff<$f>>>;
            #[inline]
            fn mul(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdConstMul::new(rhs, self))
            }
        }

        impl<'a> Mul<&'a MDiff<$f>> for $f {
            type Output = Expr<$f, MdConstMul<$f, &'a MDiff<$f>>>;
            #[inline]
            fn mul(self, rhs: &'a MDiff<$f>) -> Self::Output {
                Expr::wrap(MdConstMul::new(self, rhs))
            }
        }

        impl<E: MdExpr<$f>> Mul<$f> for Expr<$f, E> {
            type Output = Expr<$f, MdConstMul<$f, Expr<$f, E>>>;
            #[inline]
            fn mul(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdConstMul::new(rhs, self))
            }
        }

        impl<E: MdExpr<$f>> Mul<Expr<$f, E>> for $f {
            type Output = Expr<$f, MdConstMul<$f, Expr<$f, E>>>;
            #[inline]
            fn mul(self, rhs: Expr<$f, E>) -> Self::Output {
                Expr::wrap(MdConstMul::new(self, rhs))
            }
        }

        impl Mul<$f> for MDiff<$f> {
            type Output = MDiff<$f>;
            #[inline]
            fn mul(self, rhs: $f) -> MDiff<$f> {
                MDiff::from_node(&MdConstMul::new(rhs, &self))
            }
        }

        impl Mul<MDiff<$f>> for $f {
            type Output = MDiff<$f>;
            #[inline]
            fn mul(self, rhs: MDiff<$f>) -> MDiff<$f> {
                MDiff::from_node(&MdConstMul::new(self, &rhs))
            }
        }

        // x / c, c / x
        impl<'a> Div<$f> for &'a MDiff<$f> {
            type Output = Expr<$f, MdDivConst<$f, &'a MDiff<$f>>>;
            #[inline]
            fn div(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdDivConst::new(rhs, self))
            }
        }

        impl<'a> Div<&'a MDiff<$f>> for $f {
            type Output = Expr<$f, MdConstDiv<$f, &'a MDiff<$f>>>;
            #[inline]
            fn div(self, rhs: &'a MDiff<$f>) -> Self::Output {
                Expr::wrap(MdConstDiv::new(self, rhs))
            }
        }

        impl<E: MdExpr<$f>> Div<$f> for Expr<$f, E> {
            type Output = Expr<$f, MdDivConst<$f, Expr<$f, E>>>;
            #[inline]
            fn div(self, rhs: $f) -> Self::Output {
                Expr::wrap(MdDivConst::new(rhs, self))
            }
        }

        impl<E: MdExpr<$f>> Div<Expr<$f, E>> for $f {
            type Output = Expr<$f, MdConstDiv<$f, Expr<$f, E>>>;
            #[inline]
            fn div(self, rhs: Expr<$f, E>) -> Self::Output {
                Expr::wrap(MdConstDiv::new(self, rhs))
            }
        }

        impl Div<$f> for MDiff<$f> {
            type Output = MDiff<$f>;
            #[inline]
            fn div(self, rhs: $f) -> MDiff<$f> {
                MDiff::from_node(&MdDivConst::new(rhs, &self))
            }
        }

        impl Div<MDiff<$f>> for $f {
            type Output = MDiff<$f>;
            #[inline]
            fn div(self, rhs: MDiff<$f>) -> MDiff<$f> {
                MDiff::from_node(&MdConstDiv::new(self, &rhs))
            }
        }
    };
}

impl_md_scalar_ops!(f32);
impl_md_scalar_ops!(f64);

// Owned-operand exponential, used by the AD-generic algebra.
impl<F: Float> MDiff<F> {
    /// Exponential, evaluated eagerly. For fused lazy evaluation use
    /// [`exp`](crate::exp) on a borrowed operand.
    #[inline]
    pub fn exp(self) -> MDiff<F> {
        MDiff::from_node(&MdExp::new(&self))
    }
}

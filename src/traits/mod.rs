pub mod mdiff_ops;
pub mod sdiff_ops;

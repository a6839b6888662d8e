pub mod exposure;
pub mod normalize;
pub mod rollup;

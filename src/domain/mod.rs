pub mod entities;
pub mod errors;
pub mod services;

#[cfg(test)]
mod normalize_tests;
#[cfg(test)]
mod exposure_tests;
#[cfg(test)]
mod rollup_tests;

//! CLI command implementations

pub mod normalize;
pub mod providers;
pub mod run;

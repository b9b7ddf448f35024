pub mod backend;
pub mod builder;
pub mod model;
pub mod report;
mod solve;
mod sweep;

pub use solve::*;
pub use sweep::*;

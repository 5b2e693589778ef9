pub mod response;
pub mod validation;

pub use validation::*;

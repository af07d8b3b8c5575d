pub mod marginal;
pub mod random;

pub use marginal::*;
pub use random::*;

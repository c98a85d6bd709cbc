pub mod preprocessing;
pub mod tracing;
pub mod filtering;

pub use preprocessing::*;
pub use tracing::*;
pub use filtering::*;

pub mod error;
pub mod report;

pub use error::*;
pub use report::*;

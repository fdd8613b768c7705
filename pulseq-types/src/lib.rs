pub mod block;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod shape;
pub mod version;

pub use block::*;
pub use diagnostics::*;
pub use error::*;
pub use events::*;
pub use shape::*;
pub use version::*;

pub mod line;
pub mod scan;

pub use line::*;
pub use scan::*;

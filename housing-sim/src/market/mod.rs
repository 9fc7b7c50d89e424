pub mod clearing;
pub mod offers;

pub use clearing::*;
pub use offers::*;

pub mod landlord;
pub mod tenant;

pub use landlord::*;
pub use tenant::*;

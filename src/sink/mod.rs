pub mod primary;
pub mod secondary;

pub use primary::*;
pub use secondary::*;

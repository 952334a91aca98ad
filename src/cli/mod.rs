pub mod convert;
pub mod history;
pub mod key;

pub use convert::*;
pub use history::*;
pub use key::*;

pub mod enums;
pub mod lab;

pub use enums::*;
pub use lab::*;

//! 공통 타입.

mod decimal;
mod symbol;

pub use decimal::*;
pub use symbol::*;

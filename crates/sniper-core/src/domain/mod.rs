//! 상장 스나이핑 도메인 모델.

mod clock;
mod filters;
mod market_data;
mod order;

pub use clock::*;
pub use filters::*;
pub use market_data::*;
pub use order::*;

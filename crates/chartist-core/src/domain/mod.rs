//! 패턴 엔진의 도메인 모델.

mod candle;
mod params;
mod series;

pub use candle::*;
pub use params::*;
pub use series::*;

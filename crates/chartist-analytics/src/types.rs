//! 여러 감지기가 공유하는 타입.

use serde::{Deserialize, Serialize};

/// 예상 가격 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// 상승
    Bullish,
    /// 하락
    Bearish,
}

//! 잉태형 (Harami).

use chartist_core::Candle;
use rust_decimal::Decimal;

use super::{is_valid_pair, CandlePairType, Detection, PairContext, PatternDetector};
use crate::numeric::{safe_div, to_f64};
use crate::types::Direction;

/// 잉태형 감지기.
#[derive(Debug, Clone, Copy)]
pub struct HaramiDetector {
    direction: Direction,
    max_body_ratio: Decimal,
}

impl HaramiDetector {
    /// `max_body_ratio`: 앞 몸통 대비 뒤 몸통의 최대 비율
    pub fn new(direction: Direction, max_body_ratio: Decimal) -> Self {
        Self {
            direction,
            max_body_ratio,
        }
    }
}

impl PatternDetector for HaramiDetector {
    fn pattern_type(&self) -> CandlePairType {
        match self.direction {
            Direction::Bullish => CandlePairType::BullishHarami,
            Direction::Bearish => CandlePairType::BearishHarami,
        }
    }

    fn detect(&self, first: &Candle, second: &Candle, _ctx: &PairContext) -> Detection {
        match self.direction {
            Direction::Bullish => bullish_harami(first, second, self.max_body_ratio),
            Direction::Bearish => bearish_harami(first, second, self.max_body_ratio),
        }
    }
}

/// 상승 잉태형: 큰 음봉의 몸통 안에 작은 양봉.
pub fn bullish_harami(first: &Candle, second: &Candle, max_body_ratio: Decimal) -> Detection {
    if !is_valid_pair(first, second) || !first.is_bearish() || !second.is_bullish() {
        return Detection::none();
    }
    inside_body(first, second, max_body_ratio)
}

/// 하락 잉태형: 큰 양봉의 몸통 안에 작은 음봉.
pub fn bearish_harami(first: &Candle, second: &Candle, max_body_ratio: Decimal) -> Detection {
    if !is_valid_pair(first, second) || !first.is_bullish() || !second.is_bearish() {
        return Detection::none();
    }
    inside_body(first, second, max_body_ratio)
}

fn inside_body(first: &Candle, second: &Candle, max_body_ratio: Decimal) -> Detection {
    if second.body_top() > first.body_top() || second.body_bottom() < first.body_bottom() {
        return Detection::none();
    }
    match safe_div(second.body_size(), first.body_size()) {
        Some(ratio) if ratio <= max_body_ratio => Detection::hit(to_f64(Decimal::ONE - ratio)),
        _ => Detection::none(),
    }
}

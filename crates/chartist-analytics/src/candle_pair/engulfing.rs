//! 장악형 (Engulfing).

use chartist_core::Candle;
use rust_decimal::Decimal;

use super::{is_valid_pair, CandlePairType, Detection, PairContext, PatternDetector};
use crate::numeric::{safe_div, to_f64};
use crate::types::Direction;

/// 장악형 감지기.
#[derive(Debug, Clone, Copy)]
pub struct EngulfingDetector {
    direction: Direction,
}

impl EngulfingDetector {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl PatternDetector for EngulfingDetector {
    fn pattern_type(&self) -> CandlePairType {
        match self.direction {
            Direction::Bullish => CandlePairType::BullishEngulfing,
            Direction::Bearish => CandlePairType::BearishEngulfing,
        }
    }

    fn detect(&self, first: &Candle, second: &Candle, _ctx: &PairContext) -> Detection {
        match self.direction {
            Direction::Bullish => bullish_engulfing(first, second),
            Direction::Bearish => bearish_engulfing(first, second),
        }
    }
}

/// 상승 장악형: 음봉 다음 양봉이 앞 몸통을 감쌈.
///
/// 강도는 `min(ratio / 2, 1)`, `ratio`는 두 종가 차이를 앞 몸통으로 나눈 값입니다.
pub fn bullish_engulfing(first: &Candle, second: &Candle) -> Detection {
    if !is_valid_pair(first, second) || !first.is_bearish() || !second.is_bullish() {
        return Detection::none();
    }
    if second.open > first.close || second.close < first.open {
        return Detection::none();
    }
    strength(first, second)
}

/// 하락 장악형: 양봉 다음 음봉이 앞 몸통을 감쌈.
pub fn bearish_engulfing(first: &Candle, second: &Candle) -> Detection {
    if !is_valid_pair(first, second) || !first.is_bullish() || !second.is_bearish() {
        return Detection::none();
    }
    if second.open < first.close || second.close > first.open {
        return Detection::none();
    }
    strength(first, second)
}

fn strength(first: &Candle, second: &Candle) -> Detection {
    match safe_div((second.close - first.close).abs(), first.body_size()) {
        Some(ratio) => Detection::hit(to_f64(ratio / Decimal::TWO)),
        None => Detection::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candle(open: Decimal, close: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle::new(t, open, open.max(close) + dec!(0.5), open.min(close) - dec!(0.5), close)
    }

    #[test]
    fn test_bullish_engulfing_strength() {
        let result = bullish_engulfing(&candle(dec!(100), dec!(90)), &candle(dec!(88), dec!(102)));
        assert!(result.detected);
        assert_eq!(result.strength, 0.6);
    }

    #[test]
    fn test_bullish_engulfing_caps_strength() {
        let result = bullish_engulfing(&candle(dec!(100), dec!(98)), &candle(dec!(97), dec!(110)));
        assert!(result.detected);
        assert_eq!(result.strength, 1.0);
    }

    #[test]
    fn test_bullish_engulfing_requires_containment() {
        let result = bullish_engulfing(&candle(dec!(100), dec!(90)), &candle(dec!(91), dec!(102)));
        assert!(!result.detected);
        let same_color = bullish_engulfing(&candle(dec!(90), dec!(100)), &candle(dec!(88), dec!(102)));
        assert!(!same_color.detected);
    }

    #[test]
    fn test_bearish_engulfing() {
        let result = bearish_engulfing(&candle(dec!(90), dec!(100)), &candle(dec!(102), dec!(88)));
        assert!(result.detected);
        assert_eq!(result.strength, 0.6);
    }

    #[test]
    fn test_degenerate_candles() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let flat = Candle::new(t, dec!(100), dec!(100), dec!(100), dec!(100));
        assert!(!bullish_engulfing(&flat, &flat).detected);
        let broken = Candle::new(t, dec!(100), dec!(90), dec!(95), dec!(92));
        assert!(!bullish_engulfing(&broken, &candle(dec!(88), dec!(102))).detected);
    }
}

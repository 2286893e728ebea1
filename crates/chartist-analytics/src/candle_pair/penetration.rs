//! 먹구름형 (Dark cloud cover) / 관통형 (Piercing line).

use chartist_core::Candle;
use rust_decimal::Decimal;

use super::{is_valid_pair, CandlePairType, Detection, PairContext, PatternDetector};
use crate::numeric::{safe_div, to_f64};
use crate::types::Direction;

/// 몸통 관통 패턴 감지기.
#[derive(Debug, Clone, Copy)]
pub struct PenetrationDetector {
    direction: Direction,
    /// 앞 몸통이 평균 몸통의 몇 배 이상이어야 하는지
    min_body_multiple: Decimal,
    /// 갭 허용 오차 (앞 몸통 대비)
    gap_tolerance: Decimal,
}

impl PenetrationDetector {
    /// 하락 반전 (먹구름형).
    pub fn dark_cloud_cover(min_body_multiple: Decimal, gap_tolerance: Decimal) -> Self {
        Self {
            direction: Direction::Bearish,
            min_body_multiple,
            gap_tolerance,
        }
    }

    /// 상승 반전 (관통형).
    pub fn piercing_line(min_body_multiple: Decimal, gap_tolerance: Decimal) -> Self {
        Self {
            direction: Direction::Bullish,
            min_body_multiple,
            gap_tolerance,
        }
    }

    fn has_long_body(&self, first: &Candle, ctx: &PairContext) -> bool {
        match ctx.avg_body {
            Some(avg) if avg > Decimal::ZERO => first.body_size() >= avg * self.min_body_multiple,
            _ => true,
        }
    }
}

impl PatternDetector for PenetrationDetector {
    fn pattern_type(&self) -> CandlePairType {
        match self.direction {
            Direction::Bullish => CandlePairType::PiercingLine,
            Direction::Bearish => CandlePairType::DarkCloudCover,
        }
    }

    fn detect(&self, first: &Candle, second: &Candle, ctx: &PairContext) -> Detection {
        if !self.has_long_body(first, ctx) {
            return Detection::none();
        }
        match self.direction {
            Direction::Bullish => piercing_line(first, second, self.gap_tolerance),
            Direction::Bearish => dark_cloud_cover(first, second, self.gap_tolerance),
        }
    }
}

/// 먹구름형: 양봉 다음 음봉이 앞 종가 부근 이상에서 시작해 앞 몸통 중간 아래로 마감.
///
/// 앞 시가 아래까지 내려가면 장악형이므로 제외합니다. 강도 = 관통 깊이 / 앞 몸통.
pub fn dark_cloud_cover(first: &Candle, second: &Candle, gap_tolerance: Decimal) -> Detection {
    if !is_valid_pair(first, second) || !first.is_bullish() || !second.is_bearish() {
        return Detection::none();
    }
    let body = first.body_size();
    if second.open < first.close - body * gap_tolerance {
        return Detection::none();
    }
    if second.close >= first.body_mid() || second.close <= first.open {
        return Detection::none();
    }
    depth(first.close - second.close, body)
}

/// 관통형: 음봉 다음 양봉이 앞 종가 부근 이하에서 시작해 앞 몸통 중간 위로 마감.
pub fn piercing_line(first: &Candle, second: &Candle, gap_tolerance: Decimal) -> Detection {
    if !is_valid_pair(first, second) || !first.is_bearish() || !second.is_bullish() {
        return Detection::none();
    }
    let body = first.body_size();
    if second.open > first.close + body * gap_tolerance {
        return Detection::none();
    }
    if second.close <= first.body_mid() || second.close >= first.open {
        return Detection::none();
    }
    depth(second.close - first.close, body)
}

fn depth(penetration: Decimal, body: Decimal) -> Detection {
    match safe_div(penetration, body) {
        Some(ratio) => Detection::hit(to_f64(ratio)),
        None => Detection::none(),
    }
}

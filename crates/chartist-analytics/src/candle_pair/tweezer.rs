//! 집게형 (Tweezer top/bottom).

use chartist_core::Candle;
use rust_decimal::Decimal;

use super::{is_valid_pair, CandlePairType, Detection, PairContext, PatternDetector};
use crate::numeric::{safe_div, to_f64};

/// 집게형 감지기.
#[derive(Debug, Clone, Copy)]
pub struct TweezerDetector {
    top: bool,
    tolerance: Decimal,
    range_zone: Decimal,
}

impl TweezerDetector {
    /// 집게 천장 감지기.
    pub fn top(tolerance: Decimal, range_zone: Decimal) -> Self {
        Self {
            top: true,
            tolerance,
            range_zone,
        }
    }

    /// 집게 바닥 감지기.
    pub fn bottom(tolerance: Decimal, range_zone: Decimal) -> Self {
        Self {
            top: false,
            tolerance,
            range_zone,
        }
    }
}

impl PatternDetector for TweezerDetector {
    fn pattern_type(&self) -> CandlePairType {
        if self.top {
            CandlePairType::TweezerTop
        } else {
            CandlePairType::TweezerBottom
        }
    }

    fn detect(&self, first: &Candle, second: &Candle, ctx: &PairContext) -> Detection {
        let zone = Some((ctx, self.range_zone));
        if self.top {
            tweezer(first.high, second.high, first, second, self.tolerance, zone, true)
        } else {
            tweezer(first.low, second.low, first, second, self.tolerance, zone, false)
        }
    }
}

/// 집게 천장: 두 고가가 평균 대비 `tolerance` 이내. 문맥 검사 없이 판정합니다.
pub fn tweezer_top(first: &Candle, second: &Candle, tolerance: Decimal) -> Detection {
    tweezer(first.high, second.high, first, second, tolerance, None, true)
}

/// 집게 바닥: 두 저가가 평균 대비 `tolerance` 이내.
pub fn tweezer_bottom(first: &Candle, second: &Candle, tolerance: Decimal) -> Detection {
    tweezer(first.low, second.low, first, second, tolerance, None, false)
}

fn tweezer(
    a: Decimal,
    b: Decimal,
    first: &Candle,
    second: &Candle,
    tolerance: Decimal,
    zone: Option<(&PairContext, Decimal)>,
    top: bool,
) -> Detection {
    if !is_valid_pair(first, second) {
        return Detection::none();
    }

    let average = (a + b) / Decimal::TWO;
    let Some(diff) = safe_div((a - b).abs(), average) else {
        return Detection::none();
    };
    if diff > tolerance {
        return Detection::none();
    }

    if let Some((ctx, zone)) = zone {
        if !in_range_zone(a.max(b), a.min(b), ctx, zone, top) {
            return Detection::none();
        }
    }

    Detection::hit(to_f64(Decimal::ONE - diff))
}

/// 극단 가격 중 하나가 최근 범위의 상단/하단 `zone` 구간에 있는지 확인합니다.
/// 범위 정보가 없으면 통과합니다.
fn in_range_zone(highest: Decimal, lowest: Decimal, ctx: &PairContext, zone: Decimal, top: bool) -> bool {
    let (Some(high), Some(low)) = (ctx.recent_high, ctx.recent_low) else {
        return true;
    };
    let range = high - low;
    if range <= Decimal::ZERO {
        return true;
    }
    if top {
        highest >= high - range * zone
    } else {
        lowest <= low + range * zone
    }
}

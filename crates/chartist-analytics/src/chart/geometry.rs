//! 차트 패턴 기하 계산: 가격 레벨 비교, 추세선, 꼭짓점, 간격 대칭성.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::{clamp_unit, safe_div, to_f64};

/// 추세선의 기준점.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    /// 캔들 인덱스
    pub index: usize,
    /// 가격
    pub price: Decimal,
}

/// 두 점을 지나는 추세선.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    /// 시작점
    pub start: AnchorPoint,
    /// 끝점
    pub end: AnchorPoint,
}

impl Trendline {
    /// 두 점을 지나는 추세선을 만듭니다. 같은 인덱스면 `None`.
    pub fn through(start: AnchorPoint, end: AnchorPoint) -> Option<Self> {
        if start.index >= end.index {
            return None;
        }
        Some(Self { start, end })
    }

    /// 캔들당 기울기.
    pub fn slope(&self) -> Decimal {
        let dx = Decimal::from(self.end.index as i64 - self.start.index as i64);
        safe_div(self.end.price - self.start.price, dx).unwrap_or(Decimal::ZERO)
    }

    /// 인덱스 `index`에서의 추세선 가격.
    pub fn value_at(&self, index: usize) -> Decimal {
        self.value_at_x(Decimal::from(index as i64))
    }

    /// 소수 인덱스 `x`에서의 추세선 가격.
    pub fn value_at_x(&self, x: Decimal) -> Decimal {
        self.start.price + self.slope() * (x - Decimal::from(self.start.index as i64))
    }

    /// 두 추세선의 교점 `(인덱스, 가격)`. 평행하면 `None`.
    pub fn intersection(&self, other: &Trendline) -> Option<(Decimal, Decimal)> {
        let s1 = self.slope();
        let s2 = other.slope();
        let x1 = Decimal::from(self.start.index as i64);
        let x2 = Decimal::from(other.start.index as i64);

        let x = safe_div(
            other.start.price - self.start.price + s1 * x1 - s2 * x2,
            s1 - s2,
        )?;
        Some((x, self.value_at_x(x)))
    }
}

/// 두 가격의 상대 차이 `|a-b| / max(a,b)`.
pub fn relative_diff(a: Decimal, b: Decimal) -> Decimal {
    let max = a.max(b);
    if max <= Decimal::ZERO {
        return Decimal::ONE;
    }
    safe_div((a - b).abs(), max).unwrap_or(Decimal::ONE)
}

/// 가격 집합의 최대 상대 차이.
pub fn level_spread(prices: &[Decimal]) -> Decimal {
    let max = prices.iter().copied().max().unwrap_or(Decimal::ZERO);
    let min = prices.iter().copied().min().unwrap_or(Decimal::ZERO);
    relative_diff(max, min)
}

/// 레벨 일치 정도: 허용 오차 대비 남은 여유 `1 - mismatch / tolerance`.
///
/// 허용 오차가 커질수록 값이 줄어들지 않습니다.
pub fn tightness(mismatch: Decimal, tolerance: Decimal) -> f64 {
    if mismatch.is_zero() {
        return 1.0;
    }
    match safe_div(mismatch, tolerance) {
        Some(ratio) => clamp_unit(1.0 - to_f64(ratio)),
        None => 0.0,
    }
}

/// 피봇 간격의 대칭성: `1 - (최대 간격 - 최소 간격) / 최대 간격`.
pub fn spacing_symmetry(indices: &[usize]) -> f64 {
    let gaps: Vec<usize> = indices.windows(2).map(|w| w[1].saturating_sub(w[0])).collect();
    let (Some(&max), Some(&min)) = (gaps.iter().max(), gaps.iter().min()) else {
        return 0.0;
    };
    if max == 0 {
        return 0.0;
    }
    clamp_unit(1.0 - (max - min) as f64 / max as f64)
}

/// 두 기울기의 균형: 크기가 비슷할수록 1에 가까움.
pub fn slope_balance(a: Decimal, b: Decimal) -> f64 {
    let a = a.abs();
    let b = b.abs();
    match safe_div((a - b).abs(), a + b) {
        Some(ratio) => clamp_unit(1.0 - to_f64(ratio)),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn point(index: usize, price: Decimal) -> AnchorPoint {
        AnchorPoint { index, price }
    }

    #[test]
    fn test_relative_diff() {
        assert_eq!(relative_diff(dec!(100), dec!(98)), dec!(0.02));
        assert_eq!(relative_diff(dec!(98), dec!(100)), dec!(0.02));
        assert_eq!(relative_diff(dec!(100), dec!(100)), Decimal::ZERO);
        assert_eq!(relative_diff(Decimal::ZERO, Decimal::ZERO), Decimal::ONE);
    }

    #[test]
    fn test_trendline_value_and_slope() {
        let line = Trendline::through(point(2, dec!(100)), point(6, dec!(108))).unwrap();
        assert_eq!(line.slope(), dec!(2));
        assert_eq!(line.value_at(10), dec!(116));
        assert_eq!(line.value_at(0), dec!(96));
        assert!(Trendline::through(point(3, dec!(1)), point(3, dec!(2))).is_none());
    }

    #[test]
    fn test_intersection() {
        // 하락 저항선과 상승 지지선
        let upper = Trendline::through(point(0, dec!(110)), point(10, dec!(100))).unwrap();
        let lower = Trendline::through(point(0, dec!(90)), point(10, dec!(95))).unwrap();
        let (x, price) = upper.intersection(&lower).unwrap();
        assert!((x - dec!(13.3333)).abs() < dec!(0.001));
        assert!((price - dec!(96.6666)).abs() < dec!(0.001));

        let parallel = Trendline::through(point(0, dec!(80)), point(10, dec!(70))).unwrap();
        assert!(upper.intersection(&parallel).is_none());
    }

    #[test]
    fn test_tightness_monotonic_in_tolerance() {
        let loose = tightness(dec!(0.01), dec!(0.04));
        let tight = tightness(dec!(0.01), dec!(0.02));
        assert!(loose >= tight);
        assert_eq!(tightness(Decimal::ZERO, Decimal::ZERO), 1.0);
        assert_eq!(tightness(dec!(0.01), Decimal::ZERO), 0.0);
        assert_eq!(tight, 0.5);
    }

    #[test]
    fn test_spacing_symmetry() {
        assert_eq!(spacing_symmetry(&[0, 5, 10]), 1.0);
        assert_eq!(spacing_symmetry(&[0, 5, 15]), 0.5);
        assert_eq!(spacing_symmetry(&[3]), 0.0);
    }

    #[test]
    fn test_slope_balance() {
        assert_eq!(slope_balance(dec!(-1), dec!(1)), 1.0);
        assert_eq!(slope_balance(dec!(3), dec!(1)), 0.5);
        assert_eq!(slope_balance(Decimal::ZERO, Decimal::ZERO), 0.0);
    }
}

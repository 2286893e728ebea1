//! 피봇 윈도우에 대한 패턴 템플릿 매칭.

use rust_decimal::Decimal;

use super::geometry::{
    level_spread, relative_diff, slope_balance, spacing_symmetry, tightness, AnchorPoint,
    Trendline,
};
use super::{Bias, Boundaries, ChartPatternType, Neckline, RejectReason};
use crate::numeric::{clamp_unit, decimal_from, safe_div, to_f64};
use crate::swing::{SwingKind, SwingPivot};

/// 템플릿을 통과한 패턴 후보.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub pattern_type: ChartPatternType,
    pub pivots: Vec<SwingPivot>,
    pub neckline: Neckline,
    /// 수렴 패턴의 상단/하단 추세선
    pub boundaries: Option<Boundaries>,
    /// 무효화 판정에 쓰는 극단 피봇 가격
    pub extreme: Decimal,
    pub height: Decimal,
    /// 레벨 일치 정도 [0, 1]
    pub tightness: f64,
    /// 피봇 간격 대칭성 [0, 1]
    pub symmetry: f64,
    /// 수렴 패턴 꼭짓점 `(인덱스, 가격)`
    pub apex: Option<(Decimal, Decimal)>,
}

impl Candidate {
    /// 마지막 피봇.
    pub fn last_pivot(&self) -> Option<&SwingPivot> {
        self.pivots.last()
    }
}

type TemplateResult = Result<Candidate, RejectReason>;

/// 피봇 윈도우에 패턴 템플릿을 대입합니다.
///
/// 피봇 개수나 시작 종류가 템플릿과 다르면 `None`을 반환합니다.
pub fn match_template(
    pattern_type: ChartPatternType,
    window: &[SwingPivot],
    tolerance: Decimal,
    min_height_pct: Decimal,
    max_apex_distance_multiple: f64,
) -> Option<TemplateResult> {
    if window.len() != pattern_type.family().pivot_count() {
        return None;
    }
    let first_kind = window.first()?.kind;

    let result = match pattern_type {
        ChartPatternType::DoubleTop if first_kind == SwingKind::High => {
            double_extreme(pattern_type, window, tolerance, min_height_pct)
        }
        ChartPatternType::DoubleBottom if first_kind == SwingKind::Low => {
            double_extreme(pattern_type, window, tolerance, min_height_pct)
        }
        ChartPatternType::TripleTop if first_kind == SwingKind::High => {
            triple_extreme(pattern_type, window, tolerance, min_height_pct)
        }
        ChartPatternType::TripleBottom if first_kind == SwingKind::Low => {
            triple_extreme(pattern_type, window, tolerance, min_height_pct)
        }
        ChartPatternType::HeadAndShoulders if first_kind == SwingKind::High => {
            head_and_shoulders(pattern_type, window, tolerance, min_height_pct)
        }
        ChartPatternType::InverseHeadAndShoulders if first_kind == SwingKind::Low => {
            head_and_shoulders(pattern_type, window, tolerance, min_height_pct)
        }
        ChartPatternType::AscendingTriangle
        | ChartPatternType::DescendingTriangle
        | ChartPatternType::SymmetricalTriangle
        | ChartPatternType::RisingWedge
        | ChartPatternType::FallingWedge => converging(
            pattern_type,
            window,
            tolerance,
            min_height_pct,
            max_apex_distance_multiple,
        ),
        _ => return None,
    };
    Some(result)
}

fn indices(window: &[SwingPivot]) -> Vec<usize> {
    window.iter().map(|p| p.index).collect()
}

/// 극단 가격과 넥라인의 거리가 가격 대비 충분한지 확인합니다.
fn check_height(height: Decimal, reference: Decimal, min_height_pct: Decimal) -> Result<(), RejectReason> {
    let ratio = safe_div(height, reference).unwrap_or(Decimal::ZERO);
    if height <= Decimal::ZERO || ratio < min_height_pct {
        return Err(RejectReason::InsufficientHeight);
    }
    Ok(())
}

/// 천장 패턴이면 가장 높은, 바닥 패턴이면 가장 낮은 가격.
fn outermost(bias: Bias, prices: &[Decimal]) -> Decimal {
    let iter = prices.iter().copied();
    match bias {
        Bias::Bullish => iter.min(),
        _ => iter.max(),
    }
    .unwrap_or(Decimal::ZERO)
}

fn double_extreme(
    pattern_type: ChartPatternType,
    window: &[SwingPivot],
    tolerance: Decimal,
    min_height_pct: Decimal,
) -> TemplateResult {
    let (first, middle, last) = (&window[0], &window[1], &window[2]);

    let mismatch = relative_diff(first.price, last.price);
    if mismatch > tolerance {
        return Err(RejectReason::LevelMismatch);
    }

    let bias = pattern_type.bias();
    let extreme = outermost(bias, &[first.price, last.price]);
    let neck = middle.price;
    let height = (extreme - neck).abs();
    check_height(height, extreme.max(neck), min_height_pct)?;

    Ok(Candidate {
        pattern_type,
        pivots: window.to_vec(),
        neckline: Neckline::Level { price: neck },
        boundaries: None,
        extreme,
        height,
        tightness: tightness(mismatch, tolerance),
        symmetry: spacing_symmetry(&indices(window)),
        apex: None,
    })
}

fn triple_extreme(
    pattern_type: ChartPatternType,
    window: &[SwingPivot],
    tolerance: Decimal,
    min_height_pct: Decimal,
) -> TemplateResult {
    let extremes = [window[0].price, window[2].price, window[4].price];
    let mismatch = level_spread(&extremes);
    if mismatch > tolerance {
        return Err(RejectReason::LevelMismatch);
    }

    let bias = pattern_type.bias();
    let extreme = outermost(bias, &extremes);
    let neck = (window[1].price + window[3].price) / Decimal::TWO;
    let height = (extreme - neck).abs();
    check_height(height, extreme.max(neck), min_height_pct)?;

    Ok(Candidate {
        pattern_type,
        pivots: window.to_vec(),
        neckline: Neckline::Level { price: neck },
        boundaries: None,
        extreme,
        height,
        tightness: tightness(mismatch, tolerance),
        symmetry: spacing_symmetry(&indices(window)),
        apex: None,
    })
}

fn head_and_shoulders(
    pattern_type: ChartPatternType,
    window: &[SwingPivot],
    tolerance: Decimal,
    min_height_pct: Decimal,
) -> TemplateResult {
    let (left, head, right) = (&window[0], &window[2], &window[4]);
    let bearish = pattern_type.bias() == Bias::Bearish;

    let dominant = if bearish {
        head.price > left.price && head.price > right.price
    } else {
        head.price < left.price && head.price < right.price
    };
    if !dominant {
        return Err(RejectReason::HeadNotDominant);
    }

    let mismatch = relative_diff(left.price, right.price);
    if mismatch > tolerance {
        return Err(RejectReason::LevelMismatch);
    }

    let line = Trendline::through(anchor(&window[1]), anchor(&window[3]))
        .ok_or(RejectReason::LevelMismatch)?;
    let neck_at_head = line.value_at(head.index);
    let height = (head.price - neck_at_head).abs();
    check_height(height, head.price.max(neck_at_head), min_height_pct)?;

    Ok(Candidate {
        pattern_type,
        pivots: window.to_vec(),
        neckline: Neckline::from_line(&line),
        boundaries: None,
        extreme: head.price,
        height,
        tightness: tightness(mismatch, tolerance),
        symmetry: spacing_symmetry(&indices(window)),
        apex: None,
    })
}

fn anchor(pivot: &SwingPivot) -> AnchorPoint {
    AnchorPoint {
        index: pivot.index,
        price: pivot.price,
    }
}

fn converging(
    pattern_type: ChartPatternType,
    window: &[SwingPivot],
    tolerance: Decimal,
    min_height_pct: Decimal,
    max_apex_distance_multiple: f64,
) -> TemplateResult {
    let peaks: Vec<&SwingPivot> = window.iter().filter(|p| p.kind == SwingKind::High).collect();
    let valleys: Vec<&SwingPivot> = window.iter().filter(|p| p.kind == SwingKind::Low).collect();
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return Err(RejectReason::NotConverging);
    };
    if peaks.len() != 2 || valleys.len() != 2 {
        return Err(RejectReason::NotConverging);
    }

    let upper = Trendline::through(anchor(peaks[0]), anchor(peaks[1]))
        .ok_or(RejectReason::NotConverging)?;
    let lower = Trendline::through(anchor(valleys[0]), anchor(valleys[1]))
        .ok_or(RejectReason::NotConverging)?;
    let upper_slope = upper.slope();
    let lower_slope = lower.slope();
    let peaks_falling = peaks[1].price < peaks[0].price;
    let valleys_rising = valleys[1].price > valleys[0].price;

    let quality = match pattern_type {
        ChartPatternType::AscendingTriangle => {
            let mismatch = relative_diff(peaks[0].price, peaks[1].price);
            if mismatch > tolerance {
                return Err(RejectReason::LevelMismatch);
            }
            if !valleys_rising {
                return Err(RejectReason::NotConverging);
            }
            tightness(mismatch, tolerance)
        }
        ChartPatternType::DescendingTriangle => {
            let mismatch = relative_diff(valleys[0].price, valleys[1].price);
            if mismatch > tolerance {
                return Err(RejectReason::LevelMismatch);
            }
            if !peaks_falling {
                return Err(RejectReason::NotConverging);
            }
            tightness(mismatch, tolerance)
        }
        ChartPatternType::SymmetricalTriangle => {
            if !(peaks_falling && valleys_rising) {
                return Err(RejectReason::NotConverging);
            }
            slope_balance(upper_slope, lower_slope)
        }
        ChartPatternType::RisingWedge => {
            let rising = upper_slope > Decimal::ZERO && lower_slope > Decimal::ZERO;
            if !rising || lower_slope <= upper_slope {
                return Err(RejectReason::NotConverging);
            }
            wedge_quality(upper_slope, lower_slope)
        }
        ChartPatternType::FallingWedge => {
            let falling = upper_slope < Decimal::ZERO && lower_slope < Decimal::ZERO;
            if !falling || upper_slope >= lower_slope {
                return Err(RejectReason::NotConverging);
            }
            wedge_quality(lower_slope, upper_slope)
        }
        _ => return Err(RejectReason::NotConverging),
    };

    let (apex_x, apex_price) = upper
        .intersection(&lower)
        .ok_or(RejectReason::NotConverging)?;
    let last_x = Decimal::from(last.index as i64);
    if apex_x <= last_x {
        return Err(RejectReason::NotConverging);
    }
    let width = Decimal::from((last.index - first.index) as i64);
    let max_distance = width * decimal_from(max_apex_distance_multiple, Decimal::ZERO);
    if apex_x - last_x > max_distance {
        return Err(RejectReason::ApexTooFar);
    }

    let top = upper.value_at(first.index);
    let bottom = lower.value_at(first.index);
    let height = top - bottom;
    if height <= Decimal::ZERO {
        return Err(RejectReason::NotConverging);
    }
    check_height(height, top, min_height_pct)?;

    let neck_line = match pattern_type {
        ChartPatternType::DescendingTriangle | ChartPatternType::RisingWedge => lower,
        _ => upper,
    };
    let bias = pattern_type.bias();
    let prices: Vec<Decimal> = window.iter().map(|p| p.price).collect();

    Ok(Candidate {
        pattern_type,
        pivots: window.to_vec(),
        neckline: Neckline::from_line(&neck_line),
        boundaries: Some(Boundaries { upper, lower }),
        extreme: outermost(bias, &prices),
        height,
        tightness: quality,
        symmetry: spacing_symmetry(&indices(window)),
        apex: Some((apex_x, apex_price)),
    })
}

/// 웨지 품질: 완만한 선과 가파른 선의 기울기 차이가 클수록 높음.
fn wedge_quality(shallow: Decimal, steep: Decimal) -> f64 {
    match safe_div(shallow.abs(), steep.abs()) {
        Some(ratio) => clamp_unit(1.0 - to_f64(ratio)),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn pivot(index: usize, price: Decimal, kind: SwingKind) -> SwingPivot {
        SwingPivot {
            index,
            price,
            kind,
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(index as i64),
        }
    }

    fn high(index: usize, price: Decimal) -> SwingPivot {
        pivot(index, price, SwingKind::High)
    }

    fn low(index: usize, price: Decimal) -> SwingPivot {
        pivot(index, price, SwingKind::Low)
    }

    fn run(pattern_type: ChartPatternType, window: &[SwingPivot], tol: Decimal) -> Option<TemplateResult> {
        match_template(pattern_type, window, tol, dec!(0.01), 5.0)
    }

    #[test]
    fn test_double_top_matches_within_tolerance() {
        let window = [high(5, dec!(110)), low(10, dec!(100)), high(15, dec!(109))];
        let candidate = run(ChartPatternType::DoubleTop, &window, dec!(0.02)).unwrap().unwrap();

        assert_eq!(candidate.neckline, Neckline::Level { price: dec!(100) });
        assert_eq!(candidate.extreme, dec!(110));
        assert_eq!(candidate.height, dec!(10));
        assert_eq!(candidate.symmetry, 1.0);
        assert!(candidate.tightness > 0.5 && candidate.tightness < 1.0);

        // 시작 종류가 다르면 적용 대상이 아님
        assert!(run(ChartPatternType::DoubleBottom, &window, dec!(0.02)).is_none());
    }

    #[test]
    fn test_double_top_level_mismatch() {
        let window = [high(5, dec!(110)), low(10, dec!(100)), high(15, dec!(104))];
        assert_eq!(
            run(ChartPatternType::DoubleTop, &window, dec!(0.02)).unwrap(),
            Err(RejectReason::LevelMismatch)
        );
    }

    #[test]
    fn test_double_bottom_insufficient_height() {
        let window = [low(5, dec!(100)), high(10, dec!(100.5)), low(15, dec!(100))];
        assert_eq!(
            run(ChartPatternType::DoubleBottom, &window, dec!(0.02)).unwrap(),
            Err(RejectReason::InsufficientHeight)
        );
    }

    #[test]
    fn test_head_and_shoulders() {
        let window = [
            high(2, dec!(110)),
            low(5, dec!(100)),
            high(8, dec!(120)),
            low(11, dec!(103)),
            high(14, dec!(111)),
        ];
        let candidate = run(ChartPatternType::HeadAndShoulders, &window, dec!(0.02))
            .unwrap()
            .unwrap();
        // 넥라인은 두 저점을 잇는 추세선
        assert_eq!(candidate.neckline.value_at(8), dec!(101.5));
        assert_eq!(candidate.height, dec!(18.5));
        assert_eq!(candidate.extreme, dec!(120));

        let flat_head = [
            high(2, dec!(110)),
            low(5, dec!(100)),
            high(8, dec!(109)),
            low(11, dec!(102)),
            high(14, dec!(111)),
        ];
        assert_eq!(
            run(ChartPatternType::HeadAndShoulders, &flat_head, dec!(0.02)).unwrap(),
            Err(RejectReason::HeadNotDominant)
        );
    }

    #[test]
    fn test_triple_bottom_neckline_is_mean_of_peaks() {
        let window = [
            low(0, dec!(90)),
            high(4, dec!(100)),
            low(8, dec!(90.5)),
            high(12, dec!(102)),
            low(16, dec!(90)),
        ];
        let candidate = run(ChartPatternType::TripleBottom, &window, dec!(0.02)).unwrap().unwrap();
        assert_eq!(candidate.neckline, Neckline::Level { price: dec!(101) });
        assert_eq!(candidate.extreme, dec!(90));
    }

    #[test]
    fn test_ascending_triangle() {
        let window = [
            high(0, dec!(110)),
            low(5, dec!(95)),
            high(10, dec!(110)),
            low(15, dec!(102)),
        ];
        let candidate = run(ChartPatternType::AscendingTriangle, &window, dec!(0.02))
            .unwrap()
            .unwrap();
        assert_eq!(candidate.tightness, 1.0);
        let (apex_x, apex_price) = candidate.apex.unwrap();
        assert!(apex_x > dec!(15));
        assert_eq!(apex_price, dec!(110));
        assert!(candidate.boundaries.is_some());

        assert_eq!(
            run(ChartPatternType::SymmetricalTriangle, &window, dec!(0.02)).unwrap(),
            Err(RejectReason::NotConverging)
        );
    }

    #[test]
    fn test_descending_triangle() {
        let window = [
            high(0, dec!(110)),
            low(5, dec!(95)),
            high(10, dec!(104)),
            low(15, dec!(95)),
        ];
        let candidate = run(ChartPatternType::DescendingTriangle, &window, dec!(0.02))
            .unwrap()
            .unwrap();
        let bounds = candidate.boundaries.unwrap();
        assert_eq!(candidate.tightness, 1.0);
        assert_eq!(candidate.neckline, Neckline::from_line(&bounds.lower));
        assert_eq!(candidate.apex, Some((dec!(25), dec!(95))));
        assert_eq!(candidate.height, dec!(15));
    }

    #[test]
    fn test_symmetrical_triangle() {
        let window = [
            high(0, dec!(110)),
            low(5, dec!(90)),
            high(10, dec!(106)),
            low(15, dec!(94)),
        ];
        let candidate = run(ChartPatternType::SymmetricalTriangle, &window, dec!(0.02))
            .unwrap()
            .unwrap();
        // 기울기 -0.4 / +0.4
        assert_eq!(candidate.tightness, 1.0);
        assert_eq!(candidate.apex.unwrap().0, dec!(27.5));
        assert_eq!(candidate.height, dec!(22));
        assert_eq!(candidate.pattern_type.bias(), Bias::Neutral);

        assert_eq!(
            run(ChartPatternType::AscendingTriangle, &window, dec!(0.02)).unwrap(),
            Err(RejectReason::LevelMismatch)
        );
    }

    #[test]
    fn test_falling_wedge() {
        let window = [
            high(0, dec!(120)),
            low(5, dec!(100)),
            high(10, dec!(108)),
            low(15, dec!(96)),
        ];
        let candidate = run(ChartPatternType::FallingWedge, &window, dec!(0.02)).unwrap().unwrap();
        // 상단 기울기 -1.2, 하단 기울기 -0.4
        assert!((candidate.tightness - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(candidate.apex.unwrap().0, dec!(22.5));
        assert_eq!(
            candidate.neckline,
            Neckline::from_line(&candidate.boundaries.unwrap().upper)
        );
        assert_eq!(
            run(ChartPatternType::RisingWedge, &window, dec!(0.02)).unwrap(),
            Err(RejectReason::NotConverging)
        );
    }

    #[test]
    fn test_inverse_head_and_shoulders() {
        let window = [
            low(2, dec!(90)),
            high(5, dec!(100)),
            low(8, dec!(80)),
            high(11, dec!(103)),
            low(14, dec!(91)),
        ];
        let candidate = run(ChartPatternType::InverseHeadAndShoulders, &window, dec!(0.02))
            .unwrap()
            .unwrap();
        assert_eq!(candidate.neckline.value_at(8), dec!(101.5));
        assert_eq!(candidate.height, dec!(21.5));
        assert_eq!(candidate.extreme, dec!(80));
        assert!(run(ChartPatternType::HeadAndShoulders, &window, dec!(0.02)).is_none());
    }

    #[test]
    fn test_apex_too_far() {
        // 거의 평행한 선
        let window = [
            high(0, dec!(110)),
            low(5, dec!(95)),
            high(10, dec!(110)),
            low(15, dec!(95.1)),
        ];
        assert_eq!(
            run(ChartPatternType::AscendingTriangle, &window, dec!(0.02)).unwrap(),
            Err(RejectReason::ApexTooFar)
        );
    }

    #[test]
    fn test_rising_wedge() {
        let window = [
            low(0, dec!(90)),
            high(5, dec!(110)),
            low(10, dec!(100)),
            high(15, dec!(114)),
        ];
        let candidate = run(ChartPatternType::RisingWedge, &window, dec!(0.02)).unwrap().unwrap();
        // 상단 기울기 0.4, 하단 기울기 1.0
        assert!((candidate.tightness - 0.6).abs() < 1e-9);
        assert_eq!(
            candidate.neckline,
            Neckline::from_line(&candidate.boundaries.unwrap().lower)
        );
        assert_eq!(
            run(ChartPatternType::FallingWedge, &window, dec!(0.02)).unwrap(),
            Err(RejectReason::NotConverging)
        );
    }
}

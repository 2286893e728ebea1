//! 패턴 진행 상태: 돌파, 무효화, 완성도.

use chartist_core::{AnalysisError, AnalysisResult, Candle, Thresholds, Timeframe};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::classifier::Candidate;
use super::{
    combined_confidence, Bias, DetectedPattern, Neckline, PatternRange, PatternStatus, RejectReason,
};
use crate::numeric::{clamp_unit, round_to, safe_div, to_f64};
use crate::types::Direction;

/// 돌파 마진의 이 배수만큼 넥라인을 넘으면 확인 강도 1.0
const FULL_CONFIRMATION_MARGIN_MULTIPLE: f64 = 5.0;

const SECS_PER_DAY: f64 = 86_400.0;

/// 넥라인 돌파 정보.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakout {
    pub index: usize,
    pub direction: Direction,
    pub close: Decimal,
    /// 돌파 캔들 위치의 넥라인 가격
    pub neck_price: Decimal,
    /// 돌파 확인 강도 [0, 1]
    pub confirmation: f64,
}

/// 후보의 진행 상태 평가 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct Lifecycle {
    pub status: PatternStatus,
    pub breakout: Option<Breakout>,
    /// 돌파 전 완성도 [0, 1]
    pub completion_ratio: Option<f64>,
    /// 보고할 넥라인 (대칭 삼각형은 돌파/근접한 선)
    pub neckline: Neckline,
}

/// 마지막 피봇 이후 캔들을 훑어 돌파 또는 무효화를 판정합니다.
///
/// 미확정 캔들과 비정상 캔들은 돌파/무효화 판정에서 제외됩니다.
pub fn evaluate(
    candidate: &Candidate,
    candles: &[Candle],
    tolerance: Decimal,
    thresholds: &Thresholds,
) -> Result<Lifecycle, RejectReason> {
    let last_pivot = candidate.last_pivot().ok_or(RejectReason::Invalidated)?;

    for (index, candle) in candles.iter().enumerate().skip(last_pivot.index + 1) {
        if candle.is_provisional() || !candle.is_well_formed() {
            continue;
        }

        if let Some((direction, neck_price, neckline)) = breakout_at(candidate, index, candle.close) {
            let penetration = safe_div((candle.close - neck_price).abs(), neck_price)
                .unwrap_or(Decimal::ZERO);
            let full = thresholds.breakout_margin_pct * FULL_CONFIRMATION_MARGIN_MULTIPLE;
            let confirmation = if full > 0.0 {
                clamp_unit(to_f64(penetration) / full)
            } else {
                1.0
            };

            return Ok(Lifecycle {
                status: PatternStatus::Completed,
                breakout: Some(Breakout {
                    index,
                    direction,
                    close: candle.close,
                    neck_price,
                    confirmation,
                }),
                completion_ratio: None,
                neckline,
            });
        }

        if is_invalidated(candidate, index, candle.close, tolerance) {
            return Err(RejectReason::Invalidated);
        }
    }

    let last_close = candles
        .iter()
        .rev()
        .find(|c| c.is_well_formed())
        .map(|c| c.close);
    let last_index = candles.len().saturating_sub(1);
    let ratio = last_close
        .map(|close| completion_ratio(candidate, last_index, close))
        .unwrap_or(0.0);
    let status = if ratio >= thresholds.near_completion_ratio {
        PatternStatus::NearCompletion
    } else {
        PatternStatus::Forming
    };

    Ok(Lifecycle {
        status,
        breakout: None,
        completion_ratio: Some(ratio),
        neckline: nearest_neckline(candidate, last_index, last_close),
    })
}

/// 종가가 넥라인을 패턴 방향으로 넘었는지 확인합니다.
fn breakout_at(
    candidate: &Candidate,
    index: usize,
    close: Decimal,
) -> Option<(Direction, Decimal, Neckline)> {
    let bias = candidate.pattern_type.bias();

    if let (Bias::Neutral, Some(bounds)) = (bias, candidate.boundaries) {
        let upper = bounds.upper.value_at(index);
        let lower = bounds.lower.value_at(index);
        if close > upper {
            return Some((Direction::Bullish, upper, Neckline::from_line(&bounds.upper)));
        }
        if close < lower {
            return Some((Direction::Bearish, lower, Neckline::from_line(&bounds.lower)));
        }
        return None;
    }

    let neck = candidate.neckline.value_at(index);
    match bias {
        Bias::Bullish if close > neck => Some((Direction::Bullish, neck, candidate.neckline)),
        Bias::Bearish if close < neck => Some((Direction::Bearish, neck, candidate.neckline)),
        _ => None,
    }
}

/// 돌파 전 종가가 패턴 반대편 한계를 허용 오차 이상 넘었는지 확인합니다.
fn is_invalidated(candidate: &Candidate, index: usize, close: Decimal, tolerance: Decimal) -> bool {
    if let Some((apex_x, _)) = candidate.apex {
        if Decimal::from(index as i64) >= apex_x {
            return true;
        }
    }

    let above = Decimal::ONE + tolerance;
    let below = Decimal::ONE - tolerance;
    let bias = candidate.pattern_type.bias();

    match (candidate.boundaries, bias) {
        (Some(bounds), Bias::Bullish) => close < bounds.lower.value_at(index) * below,
        (Some(bounds), Bias::Bearish) => close > bounds.upper.value_at(index) * above,
        (Some(_), Bias::Neutral) => false,
        (None, Bias::Bearish) => close > candidate.extreme * above,
        (None, _) => close < candidate.extreme * below,
    }
}

/// 돌파 전 완성도.
///
/// 수렴 패턴은 꼭짓점까지 경과한 캔들 비율, 나머지는 마지막 피봇에서 넥라인까지
/// 되돌린 비율입니다.
fn completion_ratio(candidate: &Candidate, last_index: usize, last_close: Decimal) -> f64 {
    let (Some(first), Some(last)) = (candidate.pivots.first(), candidate.pivots.last()) else {
        return 0.0;
    };

    if let Some((apex_x, _)) = candidate.apex {
        let start = Decimal::from(first.index as i64);
        let elapsed = Decimal::from(last_index as i64) - start;
        return safe_div(elapsed, apex_x - start)
            .map(|r| clamp_unit(to_f64(r)))
            .unwrap_or(0.0);
    }

    let neck = candidate.neckline.value_at(last_index);
    safe_div(last.price - last_close, last.price - neck)
        .map(|r| clamp_unit(to_f64(r)))
        .unwrap_or(0.0)
}

/// 대칭 삼각형은 마지막 종가에 가까운 선을 넥라인으로 보고합니다.
fn nearest_neckline(candidate: &Candidate, index: usize, last_close: Option<Decimal>) -> Neckline {
    match (candidate.pattern_type.bias(), candidate.boundaries, last_close) {
        (Bias::Neutral, Some(bounds), Some(close)) => {
            let to_upper = (bounds.upper.value_at(index) - close).abs();
            let to_lower = (bounds.lower.value_at(index) - close).abs();
            if to_lower < to_upper {
                Neckline::from_line(&bounds.lower)
            } else {
                Neckline::from_line(&bounds.upper)
            }
        }
        _ => candidate.neckline,
    }
}

/// 후보와 진행 상태로 보고용 패턴을 만듭니다.
pub fn build_pattern(
    candidate: Candidate,
    state: Lifecycle,
    candles: &[Candle],
    timeframe: Timeframe,
    as_of: DateTime<Utc>,
) -> AnalysisResult<DetectedPattern> {
    let (first, last) = match (candidate.pivots.first(), candidate.pivots.last()) {
        (Some(first), Some(last)) => (first.clone(), last.clone()),
        _ => return Err(AnalysisError::Internal("피봇 없는 패턴 후보".to_string())),
    };

    let confidence = round_to(
        combined_confidence(
            candidate.tightness,
            candidate.symmetry,
            state.breakout.map(|b| b.confirmation),
        ),
        4,
    );

    let mut pattern = DetectedPattern {
        pattern_type: candidate.pattern_type,
        label: candidate.pattern_type.label().to_string(),
        bias: candidate.pattern_type.bias(),
        confidence,
        range: PatternRange {
            start: first.index,
            end: last.index,
            start_time: first.time,
            end_time: last.time,
        },
        pivots: candidate.pivots,
        neckline: state.neckline,
        boundaries: candidate.boundaries,
        height: candidate.height,
        status: state.status,
        apex_date: None,
        days_to_apex: None,
        completion_pct: None,
        breakout_index: None,
        breakout_direction: None,
        breakout_date: None,
        days_since_breakout: None,
        aftermath: None,
    };

    if let Some(breakout) = state.breakout {
        let candle = candles.get(breakout.index).ok_or_else(|| {
            AnalysisError::Internal(format!("돌파 인덱스 범위 초과: {}", breakout.index))
        })?;
        let elapsed = (as_of - candle.open_time).num_seconds().max(0) as f64;
        pattern.breakout_index = Some(breakout.index);
        pattern.breakout_direction = Some(breakout.direction);
        pattern.breakout_date = Some(candle.open_time);
        pattern.days_since_breakout = Some(round_to(elapsed / SECS_PER_DAY, 2));
        return Ok(pattern);
    }

    pattern.completion_pct = state.completion_ratio.map(|r| round_to(r * 100.0, 2));

    if let (Some((apex_x, _)), Some(last_candle)) = (candidate.apex, candles.last()) {
        let last_index = Decimal::from(candles.len().saturating_sub(1) as i64);
        let remaining = to_f64(apex_x - last_index).max(0.0);
        let secs = (remaining * timeframe.as_secs() as f64).round() as i64;
        pattern.apex_date = Some(last_candle.open_time + Duration::seconds(secs));
        pattern.days_to_apex = Some(round_to(timeframe.bars_to_days(remaining), 2));
    }

    // 기준 시각이 마지막 캔들보다 늦으면 그만큼 꼭짓점까지 남은 일수를 줄임
    if let (Some(days), Some(last_candle)) = (pattern.days_to_apex, candles.last()) {
        let lag = (as_of - last_candle.open_time).num_seconds().max(0) as f64 / SECS_PER_DAY;
        pattern.days_to_apex = Some(round_to((days - lag).max(0.0), 2));
    }

    Ok(pattern)
}

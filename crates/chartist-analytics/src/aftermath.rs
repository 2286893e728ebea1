//! 돌파 이후 가격 흐름 평가.
//!
//! 완성된 차트 패턴에 대해 목표가 도달 여부, 호라이즌별 수익률과 고가/저가 극단을
//! 계산합니다.

use chartist_core::{Candle, Thresholds};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chart::{DetectedPattern, PatternStatus};
use crate::numeric::{decimal_from, safe_div};
use crate::types::Direction;

/// 돌파 이후 결과 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AftermathOutcome {
    /// 이론적 목표가 도달
    TargetReached,
    /// 목표 방향으로 높이의 일정 비율 이상 이동
    PartialMove,
    /// 종가가 넥라인 안쪽으로 되돌아옴
    FailedBreakout,
    /// 의미 있는 후속 움직임 없음
    NoFollowThrough,
}

/// 호라이즌별 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonOutcome {
    /// 돌파 캔들로부터의 캔들 수
    pub bars: usize,
    /// 수익률 (%). 시계열 끝을 넘으면 `None`
    pub return_pct: Option<Decimal>,
    /// 윈도우 내 최고가
    pub max_high: Decimal,
    /// 윈도우 내 최저가
    pub min_low: Decimal,
}

/// 돌파 이후 평가 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aftermath {
    pub breakout_date: DateTime<Utc>,
    pub breakout_price: Decimal,
    /// 종가가 최소 마진 이상 넥라인을 넘었는지
    pub breakout_confirmed: bool,
    pub theoretical_target: Decimal,
    pub target_reached: bool,
    /// 목표가에 처음 도달한 캔들의 돌파 캔들 기준 오프셋
    pub days_to_target: Option<usize>,
    pub horizons: Vec<HorizonOutcome>,
    pub outcome: AftermathOutcome,
}

/// 돌파 이후 평가기.
#[derive(Debug, Clone)]
pub struct AftermathEvaluator {
    horizons: Vec<usize>,
    breakout_margin: Decimal,
    partial_move_ratio: Decimal,
}

impl AftermathEvaluator {
    /// 새 평가기를 생성합니다. 호라이즌은 정렬/중복 제거됩니다.
    pub fn new(horizons: &[usize], thresholds: &Thresholds) -> Self {
        let mut horizons: Vec<usize> = horizons.iter().copied().filter(|h| *h > 0).collect();
        horizons.sort_unstable();
        horizons.dedup();
        Self {
            horizons,
            breakout_margin: decimal_from(thresholds.breakout_margin_pct, Decimal::ZERO),
            partial_move_ratio: decimal_from(thresholds.partial_move_ratio, Decimal::ONE),
        }
    }

    /// 완성된 패턴의 돌파 이후 흐름을 평가합니다. 완성되지 않았으면 `None`.
    pub fn evaluate(&self, pattern: &DetectedPattern, candles: &[Candle]) -> Option<Aftermath> {
        if pattern.status != PatternStatus::Completed {
            return None;
        }
        let breakout_index = pattern.breakout_index?;
        let direction = pattern.breakout_direction?;
        let breakout = candles.get(breakout_index)?;

        let neck = pattern.neckline.value_at(breakout_index);
        let penetration = safe_div((breakout.close - neck).abs(), neck).unwrap_or(Decimal::ZERO);
        let breakout_confirmed = penetration > self.breakout_margin;

        let (target, partial_level) = match direction {
            Direction::Bullish => (
                neck + pattern.height,
                neck + pattern.height * self.partial_move_ratio,
            ),
            Direction::Bearish => (
                neck - pattern.height,
                neck - pattern.height * self.partial_move_ratio,
            ),
        };

        let max_horizon = self.horizons.last().copied().unwrap_or(0);
        let window: Vec<(usize, &Candle)> = candles
            .iter()
            .enumerate()
            .skip(breakout_index)
            .take(max_horizon + 1)
            .filter(|(_, c)| !c.is_provisional() && c.is_well_formed())
            .map(|(i, c)| (i - breakout_index, c))
            .collect();

        let mut days_to_target = None;
        let mut partial = false;
        let mut failed = false;
        for &(offset, candle) in &window {
            let (reached, moved, back_inside) = match direction {
                Direction::Bullish => (
                    candle.high >= target,
                    candle.high >= partial_level,
                    candle.close < pattern.neckline.value_at(breakout_index + offset),
                ),
                Direction::Bearish => (
                    candle.low <= target,
                    candle.low <= partial_level,
                    candle.close > pattern.neckline.value_at(breakout_index + offset),
                ),
            };
            if reached && days_to_target.is_none() {
                days_to_target = Some(offset);
            }
            partial |= moved;
            failed |= offset > 0 && back_inside;
        }

        let horizons = self
            .horizons
            .iter()
            .map(|&bars| horizon_outcome(bars, breakout.close, &window))
            .collect();

        let outcome = if days_to_target.is_some() {
            AftermathOutcome::TargetReached
        } else if partial {
            AftermathOutcome::PartialMove
        } else if failed {
            AftermathOutcome::FailedBreakout
        } else {
            AftermathOutcome::NoFollowThrough
        };

        Some(Aftermath {
            breakout_date: breakout.open_time,
            breakout_price: breakout.close,
            breakout_confirmed,
            theoretical_target: target,
            target_reached: days_to_target.is_some(),
            days_to_target,
            horizons,
            outcome,
        })
    }
}

fn horizon_outcome(bars: usize, base: Decimal, window: &[(usize, &Candle)]) -> HorizonOutcome {
    let seen: Vec<&Candle> = window
        .iter()
        .filter(|(offset, _)| *offset <= bars)
        .map(|(_, c)| *c)
        .collect();
    let max_high = seen.iter().map(|c| c.high).max().unwrap_or(base);
    let min_low = seen.iter().map(|c| c.low).min().unwrap_or(base);
    let return_pct = window
        .iter()
        .find(|(offset, _)| *offset == bars)
        .and_then(|(_, c)| safe_div(c.close - base, base))
        .map(|r| (r * Decimal::ONE_HUNDRED).round_dp(2));

    HorizonOutcome {
        bars,
        return_pct,
        max_high,
        min_low,
    }
}

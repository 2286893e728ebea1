//! 패턴 직전 국지 문맥 분류: 추세 방향과 변동성 수준.

use chartist_core::{Candle, Thresholds};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::{safe_div, to_f64};

/// 패턴 직전 추세.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

/// 변동성 수준.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
}

/// 국지 문맥.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalContext {
    pub trend_before: TrendDirection,
    pub volatility_level: VolatilityLevel,
}

/// 국지 문맥 분류기.
#[derive(Debug, Clone)]
pub struct ContextClassifier {
    trend_lookback: usize,
    trend_agreement: f64,
    volatility_lookback: usize,
    low_volatility_pct: f64,
    high_volatility_pct: f64,
}

impl ContextClassifier {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            trend_lookback: thresholds.trend_lookback,
            trend_agreement: thresholds.trend_agreement,
            volatility_lookback: thresholds.volatility_lookback,
            low_volatility_pct: thresholds.low_volatility_pct,
            high_volatility_pct: thresholds.high_volatility_pct,
        }
    }

    /// `pattern_start` 직전 캔들까지의 문맥을 분류합니다.
    pub fn classify(&self, candles: &[Candle], pattern_start: usize) -> LocalContext {
        LocalContext {
            trend_before: self.trend_before(candles, pattern_start),
            volatility_level: self.volatility(candles, pattern_start),
        }
    }

    /// 직전 `trend_lookback`개 캔들의 전봉 대비 종가 상승/하락 다수결.
    pub fn trend_before(&self, candles: &[Candle], pattern_start: usize) -> TrendDirection {
        let end = pattern_start.min(candles.len());
        let start = end.saturating_sub(self.trend_lookback);

        let (mut up, mut down, mut votes) = (0usize, 0usize, 0usize);
        for index in start.max(1)..end {
            let (prev, current) = (&candles[index - 1], &candles[index]);
            if !prev.is_well_formed() || !current.is_well_formed() {
                continue;
            }
            votes += 1;
            if current.close > prev.close {
                up += 1;
            } else if current.close < prev.close {
                down += 1;
            }
        }

        if votes == 0 {
            return TrendDirection::Neutral;
        }
        let share = |count: usize| count as f64 / votes as f64;
        if share(up) >= self.trend_agreement {
            TrendDirection::Up
        } else if share(down) >= self.trend_agreement {
            TrendDirection::Down
        } else {
            TrendDirection::Neutral
        }
    }

    /// 직전 `volatility_lookback`개 캔들의 평균 TR / 평균 종가 (%).
    pub fn volatility(&self, candles: &[Candle], pattern_start: usize) -> VolatilityLevel {
        let end = pattern_start.min(candles.len());
        let start = end.saturating_sub(self.volatility_lookback);

        let mut true_ranges = Vec::new();
        let mut closes = Vec::new();
        for index in start..end {
            let candle = &candles[index];
            if !candle.is_well_formed() {
                continue;
            }
            let prev_close = index
                .checked_sub(1)
                .and_then(|i| candles.get(i))
                .filter(|c| c.is_well_formed())
                .map(|c| c.close);
            true_ranges.push(candle.true_range(prev_close));
            closes.push(candle.close);
        }

        if closes.is_empty() {
            return VolatilityLevel::Medium;
        }
        let count = Decimal::from(closes.len() as i64);
        let mean_tr = true_ranges.iter().copied().sum::<Decimal>() / count;
        let mean_close = closes.iter().copied().sum::<Decimal>() / count;
        let Some(ratio) = safe_div(mean_tr, mean_close) else {
            return VolatilityLevel::Medium;
        };

        let pct = to_f64(ratio) * 100.0;
        if pct < self.low_volatility_pct {
            VolatilityLevel::Low
        } else if pct > self.high_volatility_pct {
            VolatilityLevel::High
        } else {
            VolatilityLevel::Medium
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(i: i64, close: Decimal, spread: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i);
        Candle::new(t, close, close + spread, close - spread, close)
    }

    fn classifier() -> ContextClassifier {
        ContextClassifier::new(&Thresholds::default())
    }

    #[test]
    fn test_trend_up() {
        let candles: Vec<Candle> = [100, 101, 102, 103, 104]
            .iter()
            .enumerate()
            .map(|(i, c)| bar(i as i64, Decimal::from(*c), dec!(0.5)))
            .collect();
        assert_eq!(classifier().trend_before(&candles, 4), TrendDirection::Up);
    }

    #[test]
    fn test_trend_majority_vote() {
        let candles: Vec<Candle> = [100, 101, 100, 101, 99]
            .iter()
            .enumerate()
            .map(|(i, c)| bar(i as i64, Decimal::from(*c), dec!(0.5)))
            .collect();
        // 최근 3개 변화: 하락, 상승, 하락 → 2/3 ≥ 0.6
        assert_eq!(classifier().trend_before(&candles, 5), TrendDirection::Down);

        let flat: Vec<Candle> = (0..5).map(|i| bar(i, dec!(100), dec!(0.5))).collect();
        assert_eq!(classifier().trend_before(&flat, 5), TrendDirection::Neutral);
    }

    #[test]
    fn test_empty_window_defaults() {
        let candles = vec![bar(0, dec!(100), dec!(1))];
        let ctx = classifier().classify(&candles, 0);
        assert_eq!(ctx.trend_before, TrendDirection::Neutral);
        assert_eq!(ctx.volatility_level, VolatilityLevel::Medium);
    }

    #[test]
    fn test_volatility_bands() {
        let calm: Vec<Candle> = (0..6).map(|i| bar(i, dec!(100), dec!(0.5))).collect();
        assert_eq!(classifier().volatility(&calm, 6), VolatilityLevel::Low);

        let normal: Vec<Candle> = (0..6).map(|i| bar(i, dec!(100), dec!(1))).collect();
        assert_eq!(classifier().volatility(&normal, 6), VolatilityLevel::Medium);

        let wild: Vec<Candle> = (0..6).map(|i| bar(i, dec!(100), dec!(2))).collect();
        assert_eq!(classifier().volatility(&wild, 6), VolatilityLevel::High);
    }
}

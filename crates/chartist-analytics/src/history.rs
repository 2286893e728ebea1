//! 과거 데이터 백테스트: 패턴 유형별 전방 수익률 통계.
//!
//! 최근 `exclude_last`개 캔들을 제외한 이력에서 연속 캔들 쌍을 모두 훑어 발생 위치를
//! 기록하고, 호라이즌별 평균 수익률과 승률을 계산합니다. 발생 횟수가 최소 기준보다
//! 적으면 통계를 내지 않습니다.

use std::collections::BTreeMap;

use chartist_core::{AnalysisParams, Candle, Thresholds};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candle_pair::{CandlePairType, DetectorRegistry, PairContext, PatternDetector};
use crate::numeric::{round_to, safe_div};

/// 백테스트 중 기록한 패턴 발생.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternOccurrence {
    /// 확인 캔들(두 번째 캔들) 인덱스
    pub index: usize,
    pub pattern: CandlePairType,
    /// 확인 캔들 종가
    pub base_price: Decimal,
}

/// 호라이즌 하나의 통계.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonStats {
    /// 평균 수익률 (%, 소수점 2자리)
    pub avg_return: Decimal,
    /// 수익률 > 0 비율
    pub win_rate: f64,
    pub sample: usize,
}

/// 패턴 유형의 과거 통계.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub lookback_days: u32,
    pub occurrences: usize,
    /// 호라이즌(캔들 수) → 통계. JSON 키는 문자열로 직렬화됩니다.
    pub horizons: BTreeMap<usize, HorizonStats>,
}

/// 과거 통계 계산기. 요청 하나 안에서 패턴 유형별 결과를 캐시합니다.
#[derive(Debug)]
pub struct HistoryBacktester<'a> {
    registry: &'a DetectorRegistry,
    lookback_days: u32,
    horizons: Vec<usize>,
    exclude_last: usize,
    min_occurrences: usize,
    context_lookback: usize,
    cache: BTreeMap<CandlePairType, Option<HistoryStats>>,
}

impl<'a> HistoryBacktester<'a> {
    pub fn new(registry: &'a DetectorRegistry, params: &AnalysisParams, thresholds: &Thresholds) -> Self {
        let mut horizons: Vec<usize> = params.history_horizons.iter().copied().filter(|h| *h > 0).collect();
        horizons.sort_unstable();
        horizons.dedup();

        Self {
            registry,
            lookback_days: params.history_lookback_days,
            horizons,
            exclude_last: params.history_exclude_last,
            min_occurrences: thresholds.min_history_occurrences,
            context_lookback: thresholds.context_lookback,
            cache: BTreeMap::new(),
        }
    }

    /// 패턴 유형의 과거 통계. `candles`는 확정 캔들이어야 합니다.
    pub fn stats_for(&mut self, pattern: CandlePairType, candles: &[Candle]) -> Option<HistoryStats> {
        if let Some(cached) = self.cache.get(&pattern) {
            return cached.clone();
        }

        let stats = self
            .registry
            .get(pattern)
            .and_then(|detector| self.compute(detector, candles));
        self.cache.insert(pattern, stats.clone());
        stats
    }

    fn compute(&self, detector: &dyn PatternDetector, candles: &[Candle]) -> Option<HistoryStats> {
        let occurrences = self.occurrences(detector, candles);
        debug!(
            pattern = ?detector.pattern_type(),
            occurrences = occurrences.len(),
            "과거 발생 스캔"
        );
        if occurrences.len() < self.min_occurrences {
            return None;
        }

        let horizons = self
            .horizons
            .iter()
            .map(|&h| (h, horizon_stats(&occurrences, candles, h)))
            .collect();

        Some(HistoryStats {
            lookback_days: self.lookback_days,
            occurrences: occurrences.len(),
            horizons,
        })
    }

    /// 조회 기간 안에서 패턴 발생 위치를 찾습니다.
    pub fn occurrences(&self, detector: &dyn PatternDetector, candles: &[Candle]) -> Vec<PatternOccurrence> {
        let Some(last) = candles.last() else {
            return Vec::new();
        };
        let cutoff = last
            .open_time
            .checked_sub_signed(Duration::days(i64::from(self.lookback_days)));
        let scan_end = candles.len().saturating_sub(self.exclude_last);
        let pattern = detector.pattern_type();

        (1..scan_end)
            .filter(|&i| cutoff.map_or(true, |cutoff| candles[i].open_time >= cutoff))
            .filter_map(|i| {
                let (first, second) = (&candles[i - 1], &candles[i]);
                let ctx = PairContext::preceding(candles, i - 1, self.context_lookback);
                detector.detect(first, second, &ctx).detected.then_some(PatternOccurrence {
                    index: i,
                    pattern,
                    base_price: second.close,
                })
            })
            .collect()
    }
}

/// 호라이즌 `h`의 평균 수익률과 승률. 전방 종가는 제외 구간 캔들도 사용합니다.
fn horizon_stats(occurrences: &[PatternOccurrence], candles: &[Candle], h: usize) -> HorizonStats {
    let returns: Vec<Decimal> = occurrences
        .iter()
        .filter_map(|o| {
            let future = candles.get(o.index + h)?;
            if !future.is_well_formed() {
                return None;
            }
            safe_div(future.close - o.base_price, o.base_price).map(|r| r * Decimal::ONE_HUNDRED)
        })
        .collect();

    if returns.is_empty() {
        return HorizonStats {
            avg_return: Decimal::ZERO,
            win_rate: 0.0,
            sample: 0,
        };
    }

    let sample = returns.len();
    let mean = returns.iter().copied().sum::<Decimal>() / Decimal::from(sample as i64);
    let mut avg_return = mean.round_dp(2);
    avg_return.rescale(2);
    let wins = returns.iter().filter(|r| **r > Decimal::ZERO).count();

    HorizonStats {
        avg_return,
        win_rate: round_to(wins as f64 / sample as f64, 4),
        sample,
    }
}

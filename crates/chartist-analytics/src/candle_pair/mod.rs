//! 2캔들 반전 패턴 감지.
//!
//! 패턴마다 [`PatternDetector`] 구현을 하나씩 두고, [`DetectorRegistry`]가 패턴 유형을
//! 키로 감지기를 보관합니다. 모든 감지 함수는 부작용이 없고, 비정상 캔들이나 범위가
//! 0인 캔들에는 `detected = false`를 반환합니다.

pub mod engulfing;
pub mod harami;
pub mod penetration;
pub mod tweezer;

use std::collections::BTreeMap;

use chartist_core::{Candle, Thresholds};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::context::LocalContext;
use crate::history::HistoryStats;
use crate::numeric::{clamp_unit, decimal_from, round_to};
use crate::types::Direction;

pub use engulfing::{bearish_engulfing, bullish_engulfing, EngulfingDetector};
pub use harami::{bearish_harami, bullish_harami, HaramiDetector};
pub use penetration::{dark_cloud_cover, piercing_line, PenetrationDetector};
pub use tweezer::{tweezer_bottom, tweezer_top, TweezerDetector};

/// 2캔들 패턴 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePairType {
    BullishEngulfing,
    BearishEngulfing,
    BullishHarami,
    BearishHarami,
    TweezerTop,
    TweezerBottom,
    DarkCloudCover,
    PiercingLine,
}

/// 패턴 유형별 고정 정보.
#[derive(Debug, Clone, Copy)]
pub struct PairPatternInfo {
    pub label: &'static str,
    pub direction: Direction,
}

const PAIR_PATTERN_INFO: [PairPatternInfo; 8] = [
    PairPatternInfo { label: "Bullish Engulfing", direction: Direction::Bullish },
    PairPatternInfo { label: "Bearish Engulfing", direction: Direction::Bearish },
    PairPatternInfo { label: "Bullish Harami", direction: Direction::Bullish },
    PairPatternInfo { label: "Bearish Harami", direction: Direction::Bearish },
    PairPatternInfo { label: "Tweezer Top", direction: Direction::Bearish },
    PairPatternInfo { label: "Tweezer Bottom", direction: Direction::Bullish },
    PairPatternInfo { label: "Dark Cloud Cover", direction: Direction::Bearish },
    PairPatternInfo { label: "Piercing Line", direction: Direction::Bullish },
];

impl CandlePairType {
    /// 모든 패턴 유형.
    pub const ALL: [CandlePairType; 8] = [
        CandlePairType::BullishEngulfing,
        CandlePairType::BearishEngulfing,
        CandlePairType::BullishHarami,
        CandlePairType::BearishHarami,
        CandlePairType::TweezerTop,
        CandlePairType::TweezerBottom,
        CandlePairType::DarkCloudCover,
        CandlePairType::PiercingLine,
    ];

    pub fn info(&self) -> &'static PairPatternInfo {
        &PAIR_PATTERN_INFO[*self as usize]
    }

    /// 표시용 이름.
    pub fn label(&self) -> &'static str {
        self.info().label
    }

    /// 예상 방향.
    pub fn direction(&self) -> Direction {
        self.info().direction
    }
}

/// 감지 결과.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub detected: bool,
    /// 강도 [0, 1]
    pub strength: f64,
}

impl Detection {
    /// 감지되지 않음.
    pub fn none() -> Self {
        Self {
            detected: false,
            strength: 0.0,
        }
    }

    /// 감지됨. 강도는 [0, 1]로 제한하고 소수점 4자리로 반올림합니다.
    pub fn hit(strength: f64) -> Self {
        Self {
            detected: true,
            strength: round_to(clamp_unit(strength), 4),
        }
    }
}

/// 패턴 앞쪽 캔들에서 계산한 보조 정보. 값이 없으면 해당 조건은 건너뜁니다.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairContext {
    /// 평균 몸통 크기
    pub avg_body: Option<Decimal>,
    /// 최근 최고가
    pub recent_high: Option<Decimal>,
    /// 최근 최저가
    pub recent_low: Option<Decimal>,
}

impl PairContext {
    /// `first_index` 이전 `lookback`개 확정 캔들로 보조 정보를 계산합니다.
    pub fn preceding(candles: &[Candle], first_index: usize, lookback: usize) -> Self {
        let end = first_index.min(candles.len());
        let start = end.saturating_sub(lookback);
        let window: Vec<&Candle> = candles[start..end]
            .iter()
            .filter(|c| !c.is_provisional() && c.is_well_formed())
            .collect();
        if window.is_empty() {
            return Self::default();
        }

        let total: Decimal = window.iter().map(|c| c.body_size()).sum();
        Self {
            avg_body: Some(total / Decimal::from(window.len() as i64)),
            recent_high: window.iter().map(|c| c.high).max(),
            recent_low: window.iter().map(|c| c.low).min(),
        }
    }
}

/// 2캔들 패턴 감지기.
pub trait PatternDetector: Send + Sync {
    /// 감지하는 패턴 유형.
    fn pattern_type(&self) -> CandlePairType;

    /// 연속된 두 캔들에서 패턴을 감지합니다.
    fn detect(&self, first: &Candle, second: &Candle, ctx: &PairContext) -> Detection;
}

/// 두 캔들이 모두 정상이고 범위가 0이 아닌지 확인합니다.
pub(crate) fn is_valid_pair(first: &Candle, second: &Candle) -> bool {
    first.is_well_formed()
        && second.is_well_formed()
        && first.range() > Decimal::ZERO
        && second.range() > Decimal::ZERO
}

/// 패턴 유형별 감지기 레지스트리.
pub struct DetectorRegistry {
    detectors: BTreeMap<CandlePairType, Box<dyn PatternDetector>>,
}

impl DetectorRegistry {
    /// 임계값 설정으로 모든 감지기를 등록합니다.
    pub fn new(thresholds: &Thresholds) -> Self {
        let mut registry = Self {
            detectors: BTreeMap::new(),
        };

        let harami_ratio = decimal_from(thresholds.harami_max_body_ratio, Decimal::ZERO);
        let tweezer_tolerance = decimal_from(thresholds.tweezer_tolerance, Decimal::ZERO);
        let tweezer_zone = decimal_from(thresholds.tweezer_range_zone, Decimal::ONE);
        let min_body = decimal_from(thresholds.penetration_min_body_multiple, Decimal::ONE);
        let gap = decimal_from(thresholds.penetration_gap_tolerance, Decimal::ZERO);

        registry.register(EngulfingDetector::new(Direction::Bullish));
        registry.register(EngulfingDetector::new(Direction::Bearish));
        registry.register(HaramiDetector::new(Direction::Bullish, harami_ratio));
        registry.register(HaramiDetector::new(Direction::Bearish, harami_ratio));
        registry.register(TweezerDetector::top(tweezer_tolerance, tweezer_zone));
        registry.register(TweezerDetector::bottom(tweezer_tolerance, tweezer_zone));
        registry.register(PenetrationDetector::dark_cloud_cover(min_body, gap));
        registry.register(PenetrationDetector::piercing_line(min_body, gap));
        registry
    }

    /// 감지기를 등록합니다. 같은 유형이 있으면 교체합니다.
    pub fn register(&mut self, detector: impl PatternDetector + 'static) {
        self.detectors.insert(detector.pattern_type(), Box::new(detector));
    }

    pub fn get(&self, pattern_type: CandlePairType) -> Option<&dyn PatternDetector> {
        self.detectors.get(&pattern_type).map(|d| d.as_ref())
    }

    /// 등록된 패턴 유형 (정렬 순서).
    pub fn types(&self) -> impl Iterator<Item = CandlePairType> + '_ {
        self.detectors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// 마지막 `recent_bars`개 캔들을 두 번째 캔들로 하는 쌍에서 패턴을 찾습니다.
    ///
    /// 미확정 캔들은 입력에 포함된 경우에만 참여하며 `uses_partial_candle`로 표시됩니다.
    pub fn scan_recent(
        &self,
        candles: &[Candle],
        recent_bars: usize,
        context_lookback: usize,
    ) -> Vec<PairHit> {
        let start = candles.len().saturating_sub(recent_bars).max(1);
        let mut hits = Vec::new();

        for second_index in start..candles.len() {
            let first_index = second_index - 1;
            let (first, second) = (&candles[first_index], &candles[second_index]);
            if first.is_provisional() {
                continue;
            }
            let ctx = PairContext::preceding(candles, first_index, context_lookback);

            for (pattern_type, detector) in &self.detectors {
                let detection = detector.detect(first, second, &ctx);
                if detection.detected {
                    hits.push(PairHit {
                        pattern_type: *pattern_type,
                        first_index,
                        second_index,
                        strength: detection.strength,
                        uses_partial_candle: second.is_provisional(),
                    });
                }
            }
        }
        hits
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.detectors.keys()).finish()
    }
}

/// 스캐너가 찾은 감지 결과.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairHit {
    pub pattern_type: CandlePairType,
    pub first_index: usize,
    pub second_index: usize,
    pub strength: f64,
    pub uses_partial_candle: bool,
}

/// 2캔들 패턴 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    /// 미확정 캔들 포함
    Forming,
    /// 확정 캔들만 사용
    Confirmed,
}

/// 보고용 2캔들 패턴.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePairPattern {
    #[serde(rename = "type")]
    pub pattern_type: CandlePairType,
    pub label: String,
    pub direction: Direction,
    pub strength: f64,
    /// `[i-1, i]`
    pub candle_range_index: [usize; 2],
    /// 두 번째 캔들 시간
    pub time: DateTime<Utc>,
    pub uses_partial_candle: bool,
    pub status: PairStatus,
    pub local_context: LocalContext,
    pub history_stats: Option<HistoryStats>,
}

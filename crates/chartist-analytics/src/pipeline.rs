//! 분석 파이프라인: 캔들 시계열 하나를 받아 전체 보고서를 조립합니다.
//!
//! 스윙 감지 → 차트 패턴 분류 → 돌파 이후 평가, 그리고 2캔들 패턴 스캔 → 국지 문맥 →
//! 과거 통계 순서로 진행합니다. 요청마다 모든 중간 결과를 새로 만들고 버립니다.

use chartist_core::{
    analysis_span, AnalysisError, AnalysisParams, AnalysisResult, CandleSeries, Thresholds,
    Timeframe,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aftermath::AftermathEvaluator;
use crate::candle_pair::{CandlePairPattern, DetectorRegistry, PairStatus};
use crate::chart::{ChartPatternClassifier, DetectedPattern, PatternStatus, RejectedCandidate};
use crate::context::ContextClassifier;
use crate::history::HistoryBacktester;
use crate::swing::{SwingDetector, SwingPivot};

/// 보고서 메타데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// 분석에 사용한 캔들 수
    pub bars_analyzed: usize,
    /// 분석 구간 안의 변환 실패 레코드 + 비정상 OHLC 캔들 수
    pub skipped_candles: usize,
    /// 미확정 캔들이 분석에 포함되었는지
    pub partial_candle_used: bool,
}

/// 디버그 추적: 스윙 피봇과 탈락 후보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    pub pivots: Vec<SwingPivot>,
    pub rejections: Vec<RejectedCandidate>,
}

/// 분석 보고서.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub as_of: DateTime<Utc>,
    pub chart_patterns: Vec<DetectedPattern>,
    pub candle_patterns: Vec<CandlePairPattern>,
    pub metadata: ReportMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
}

/// 패턴 분석기.
#[derive(Debug)]
pub struct PatternAnalyzer {
    thresholds: Thresholds,
    registry: DetectorRegistry,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl PatternAnalyzer {
    /// 임계값 설정으로 분석기를 생성합니다.
    pub fn new(thresholds: Thresholds) -> Self {
        let registry = DetectorRegistry::new(&thresholds);
        Self {
            thresholds,
            registry,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// 2캔들 패턴 감지기 레지스트리.
    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// 캔들 시계열을 분석합니다.
    ///
    /// # Errors
    ///
    /// - 파라미터/임계값이 유효하지 않으면 `InvalidParameter`
    /// - 캔들 수가 `2·swing_depth + 1`보다 적으면 `InsufficientData`
    pub fn analyze(&self, series: &CandleSeries, params: &AnalysisParams) -> AnalysisResult<AnalysisReport> {
        params.validate()?;
        self.thresholds.validate()?;

        let span = analysis_span!("analyze", series.symbol(), series.timeframe());
        let _guard = span.enter();

        let series = series.most_recent(params.limit);
        let candles = series.usable(params.allow_partial_patterns);
        let swing = SwingDetector::from_params(params);
        if candles.len() < swing.min_candles() {
            return Err(AnalysisError::InsufficientData {
                required: swing.min_candles(),
                actual: candles.len(),
            });
        }
        let last = candles
            .last()
            .ok_or_else(|| AnalysisError::Internal("빈 캔들 슬라이스".to_string()))?;
        let as_of = params.as_of.unwrap_or(last.open_time);

        let malformed = candles.iter().filter(|c| !c.is_well_formed()).count();
        if malformed > 0 {
            warn!(malformed, "비정상 OHLC 캔들을 건너뜁니다");
        }

        // 차트 패턴
        let pivots = swing.detect(candles);
        debug!(pivots = pivots.len(), bars = candles.len(), "스윙 감지");

        let classifier = ChartPatternClassifier::new(self.thresholds.clone());
        let scan = classifier.classify(candles, &pivots, params.tolerance_pct, series.timeframe(), as_of)?;

        let evaluator = AftermathEvaluator::new(&params.aftermath_horizons, &self.thresholds);
        // 기준 시각에서 뺄 수 없을 만큼 이른 경우는 전 구간을 창으로 봄
        let cutoff = params
            .window_days
            .and_then(|days| as_of.checked_sub_signed(Duration::days(i64::from(days))));
        let chart_patterns: Vec<DetectedPattern> = scan
            .patterns
            .into_iter()
            .filter(|p| cutoff.map_or(true, |cutoff| p.range.end_time >= cutoff))
            .map(|mut pattern| {
                if pattern.status == PatternStatus::Completed {
                    pattern.aftermath = evaluator.evaluate(&pattern, candles);
                }
                pattern
            })
            .collect();
        debug!(chart_patterns = chart_patterns.len(), "차트 패턴 확정");

        // 2캔들 패턴
        let context = ContextClassifier::new(&self.thresholds);
        let mut history = HistoryBacktester::new(&self.registry, params, &self.thresholds);
        let confirmed = series.confirmed();

        let hits = self.registry.scan_recent(
            candles,
            self.thresholds.recent_bars,
            self.thresholds.context_lookback,
        );
        let mut candle_patterns = Vec::with_capacity(hits.len());
        for hit in hits {
            let second = candles.get(hit.second_index).ok_or_else(|| {
                AnalysisError::Internal(format!("캔들 인덱스 범위 초과: {}", hit.second_index))
            })?;
            candle_patterns.push(CandlePairPattern {
                pattern_type: hit.pattern_type,
                label: hit.pattern_type.label().to_string(),
                direction: hit.pattern_type.direction(),
                strength: hit.strength,
                candle_range_index: [hit.first_index, hit.second_index],
                time: second.open_time,
                uses_partial_candle: hit.uses_partial_candle,
                status: if hit.uses_partial_candle {
                    PairStatus::Forming
                } else {
                    PairStatus::Confirmed
                },
                local_context: context.classify(candles, hit.first_index),
                history_stats: history.stats_for(hit.pattern_type, confirmed),
            });
        }
        debug!(candle_patterns = candle_patterns.len(), "2캔들 패턴 스캔");

        let metadata = ReportMetadata {
            bars_analyzed: candles.len(),
            skipped_candles: series.skipped_records() + malformed,
            partial_candle_used: candles.last().is_some_and(|c| c.is_provisional()),
        };
        let debug = params.debug.then(|| DebugTrace {
            pivots,
            rejections: scan.rejections,
        });

        Ok(AnalysisReport {
            symbol: series.symbol().to_string(),
            timeframe: series.timeframe(),
            as_of,
            chart_patterns,
            candle_patterns,
            metadata,
            debug,
        })
    }
}

//! 차트 패턴 인식.
//!
//! 스윙 피봇 시퀀스에 패턴 템플릿(이중 천장, 헤드앤숄더, 삼각형, 웨지 등)을 대입하고
//! 각 후보의 넥라인, 신뢰도, 진행 상태를 계산합니다.
//!
//! - [`geometry`]: 레벨 비교, 추세선, 꼭짓점
//! - [`classifier`]: 템플릿 매칭
//! - [`lifecycle`]: 돌파/무효화 판정과 진행 상태

pub mod classifier;
pub mod geometry;
pub mod lifecycle;

use chartist_core::{AnalysisResult, Candle, Thresholds, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aftermath::Aftermath;
use crate::numeric::decimal_from;
use crate::swing::SwingPivot;
use crate::types::Direction;

pub use classifier::Candidate;
pub use geometry::{AnchorPoint, Trendline};
pub use lifecycle::Lifecycle;

/// 차트 패턴 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPatternType {
    /// 이중 천장 (H,L,H)
    DoubleTop,
    /// 이중 바닥 (L,H,L)
    DoubleBottom,
    /// 삼중 천장
    TripleTop,
    /// 삼중 바닥
    TripleBottom,
    /// 헤드앤숄더
    HeadAndShoulders,
    /// 역헤드앤숄더
    InverseHeadAndShoulders,
    /// 상승 삼각형
    AscendingTriangle,
    /// 하강 삼각형
    DescendingTriangle,
    /// 대칭 삼각형
    SymmetricalTriangle,
    /// 상승 웨지
    RisingWedge,
    /// 하락 웨지
    FallingWedge,
}

/// 패턴 방향성.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
    /// 돌파 방향이 결정
    Neutral,
}

impl Bias {
    /// 고정된 방향이 있으면 반환합니다.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Bias::Bullish => Some(Direction::Bullish),
            Bias::Bearish => Some(Direction::Bearish),
            Bias::Neutral => None,
        }
    }
}

/// 템플릿이 사용하는 피봇 개수에 따른 패턴 계열.
///
/// 하나의 피봇 윈도우는 계열당 최대 한 개의 패턴만 만듭니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    /// 3 피봇 레벨 패턴
    Level,
    /// 5 피봇 반전 패턴
    Reversal,
    /// 4 피봇 수렴 패턴
    Converging,
}

impl PatternFamily {
    /// 계열 목록 (평가 순서).
    pub const ALL: [PatternFamily; 3] = [
        PatternFamily::Level,
        PatternFamily::Reversal,
        PatternFamily::Converging,
    ];

    /// 템플릿이 요구하는 피봇 수.
    pub fn pivot_count(&self) -> usize {
        match self {
            PatternFamily::Level => 3,
            PatternFamily::Reversal => 5,
            PatternFamily::Converging => 4,
        }
    }

    /// 계열에 속한 패턴 유형.
    pub fn members(&self) -> &'static [ChartPatternType] {
        match self {
            PatternFamily::Level => &[ChartPatternType::DoubleTop, ChartPatternType::DoubleBottom],
            PatternFamily::Reversal => &[
                ChartPatternType::TripleTop,
                ChartPatternType::TripleBottom,
                ChartPatternType::HeadAndShoulders,
                ChartPatternType::InverseHeadAndShoulders,
            ],
            PatternFamily::Converging => &[
                ChartPatternType::AscendingTriangle,
                ChartPatternType::DescendingTriangle,
                ChartPatternType::SymmetricalTriangle,
                ChartPatternType::RisingWedge,
                ChartPatternType::FallingWedge,
            ],
        }
    }
}

/// 패턴 유형별 고정 정보.
#[derive(Debug, Clone, Copy)]
pub struct ChartPatternInfo {
    pub label: &'static str,
    pub bias: Bias,
    pub family: PatternFamily,
}

const CHART_PATTERN_INFO: [ChartPatternInfo; 11] = [
    ChartPatternInfo { label: "Double Top", bias: Bias::Bearish, family: PatternFamily::Level },
    ChartPatternInfo { label: "Double Bottom", bias: Bias::Bullish, family: PatternFamily::Level },
    ChartPatternInfo { label: "Triple Top", bias: Bias::Bearish, family: PatternFamily::Reversal },
    ChartPatternInfo { label: "Triple Bottom", bias: Bias::Bullish, family: PatternFamily::Reversal },
    ChartPatternInfo {
        label: "Head and Shoulders",
        bias: Bias::Bearish,
        family: PatternFamily::Reversal,
    },
    ChartPatternInfo {
        label: "Inverse Head and Shoulders",
        bias: Bias::Bullish,
        family: PatternFamily::Reversal,
    },
    ChartPatternInfo {
        label: "Ascending Triangle",
        bias: Bias::Bullish,
        family: PatternFamily::Converging,
    },
    ChartPatternInfo {
        label: "Descending Triangle",
        bias: Bias::Bearish,
        family: PatternFamily::Converging,
    },
    ChartPatternInfo {
        label: "Symmetrical Triangle",
        bias: Bias::Neutral,
        family: PatternFamily::Converging,
    },
    ChartPatternInfo { label: "Rising Wedge", bias: Bias::Bearish, family: PatternFamily::Converging },
    ChartPatternInfo { label: "Falling Wedge", bias: Bias::Bullish, family: PatternFamily::Converging },
];

impl ChartPatternType {
    /// 모든 패턴 유형.
    pub const ALL: [ChartPatternType; 11] = [
        ChartPatternType::DoubleTop,
        ChartPatternType::DoubleBottom,
        ChartPatternType::TripleTop,
        ChartPatternType::TripleBottom,
        ChartPatternType::HeadAndShoulders,
        ChartPatternType::InverseHeadAndShoulders,
        ChartPatternType::AscendingTriangle,
        ChartPatternType::DescendingTriangle,
        ChartPatternType::SymmetricalTriangle,
        ChartPatternType::RisingWedge,
        ChartPatternType::FallingWedge,
    ];

    /// 고정 정보 테이블 조회.
    pub fn info(&self) -> &'static ChartPatternInfo {
        &CHART_PATTERN_INFO[*self as usize]
    }

    /// 표시용 이름.
    pub fn label(&self) -> &'static str {
        self.info().label
    }

    /// 방향성.
    pub fn bias(&self) -> Bias {
        self.info().bias
    }

    /// 패턴 계열.
    pub fn family(&self) -> PatternFamily {
        self.info().family
    }
}

/// 패턴 진행 상태. 역방향 전이는 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    /// 형성 중
    Forming,
    /// 완성 임박
    NearCompletion,
    /// 넥라인 돌파 완료
    Completed,
}

/// 넥라인: 수평 레벨 또는 두 점 추세선.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Neckline {
    Level { price: Decimal },
    Trendline { start: AnchorPoint, end: AnchorPoint },
}

impl Neckline {
    /// 추세선으로 넥라인을 만듭니다.
    pub fn from_line(line: &Trendline) -> Self {
        Neckline::Trendline {
            start: line.start,
            end: line.end,
        }
    }

    /// 캔들 인덱스에서의 넥라인 가격.
    pub fn value_at(&self, index: usize) -> Decimal {
        match self {
            Neckline::Level { price } => *price,
            Neckline::Trendline { start, end } => Trendline { start: *start, end: *end }.value_at(index),
        }
    }
}

/// 수렴 패턴의 상단/하단 추세선.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub upper: Trendline,
    pub lower: Trendline,
}

/// 패턴 범위 (`start ≤ end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRange {
    pub start: usize,
    pub end: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// 감지된 차트 패턴.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    #[serde(rename = "type")]
    pub pattern_type: ChartPatternType,
    pub label: String,
    pub bias: Bias,
    /// 신뢰도 [0, 1]
    pub confidence: f64,
    pub range: PatternRange,
    pub pivots: Vec<SwingPivot>,
    pub neckline: Neckline,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<Boundaries>,
    /// 패턴 높이 (극단 피봇과 넥라인의 거리)
    pub height: Decimal,
    pub status: PatternStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apex_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_to_apex: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakout_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakout_direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakout_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_breakout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aftermath: Option<Aftermath>,
}

/// 후보 탈락 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    LevelMismatch,
    InsufficientHeight,
    HeadNotDominant,
    NotConverging,
    ApexTooFar,
    Invalidated,
    BelowConfidenceFloor,
}

/// 디버그 추적용 탈락 후보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    #[serde(rename = "type")]
    pub pattern_type: ChartPatternType,
    /// 피봇 윈도우의 캔들 인덱스
    pub pivot_indices: Vec<usize>,
    pub reason: RejectReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// 차트 패턴 스캔 결과.
#[derive(Debug, Clone, Default)]
pub struct ChartScan {
    pub patterns: Vec<DetectedPattern>,
    pub rejections: Vec<RejectedCandidate>,
}

/// 신뢰도 가중치
const TIGHTNESS_WEIGHT: f64 = 0.5;
const SYMMETRY_WEIGHT: f64 = 0.3;
const CONFIRMATION_WEIGHT: f64 = 0.2;

/// 템플릿 매칭 정도와 간격 대칭성으로 구조 점수를 계산합니다 (돌파 전 가중치 재정규화).
pub fn structural_confidence(tightness: f64, symmetry: f64) -> f64 {
    crate::numeric::clamp_unit(
        (TIGHTNESS_WEIGHT * tightness + SYMMETRY_WEIGHT * symmetry)
            / (TIGHTNESS_WEIGHT + SYMMETRY_WEIGHT),
    )
}

/// 돌파 확인 강도가 있으면 세 항을 모두 반영한 신뢰도를 계산합니다.
pub fn combined_confidence(tightness: f64, symmetry: f64, confirmation: Option<f64>) -> f64 {
    match confirmation {
        Some(c) => crate::numeric::clamp_unit(
            TIGHTNESS_WEIGHT * tightness + SYMMETRY_WEIGHT * symmetry + CONFIRMATION_WEIGHT * c,
        ),
        None => structural_confidence(tightness, symmetry),
    }
}

/// 차트 패턴 분류기.
#[derive(Debug, Clone)]
pub struct ChartPatternClassifier {
    thresholds: Thresholds,
}

impl ChartPatternClassifier {
    /// 새 분류기를 생성합니다.
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// 피봇 시퀀스에서 차트 패턴을 찾습니다.
    ///
    /// 각 피봇 윈도우는 계열마다 최소 신뢰도를 넘는 후보 중 신뢰도가 가장 높은 하나만
    /// 패턴으로 채택합니다. 최소 신뢰도는 보고되는 신뢰도에 적용됩니다.
    ///
    /// 허용 오차를 늘리면 일치 정도는 줄지 않고 무효화 조건만 느슨해지므로, 같은 후보는
    /// 같은 돌파 캔들과 확인 강도를 얻습니다. 따라서 패턴 수가 줄지 않습니다.
    pub fn classify(
        &self,
        candles: &[Candle],
        pivots: &[SwingPivot],
        tolerance_pct: f64,
        timeframe: Timeframe,
        as_of: DateTime<Utc>,
    ) -> AnalysisResult<ChartScan> {
        let tolerance = decimal_from(tolerance_pct, Decimal::ZERO);
        let min_height = decimal_from(self.thresholds.min_height_pct, Decimal::ZERO);
        let mut scan = ChartScan::default();

        for family in PatternFamily::ALL {
            let size = family.pivot_count();
            if pivots.len() < size {
                continue;
            }

            for window in pivots.windows(size) {
                let mut best: Option<DetectedPattern> = None;

                for &pattern_type in family.members() {
                    let Some(result) = classifier::match_template(
                        pattern_type,
                        window,
                        tolerance,
                        min_height,
                        self.thresholds.max_apex_distance_multiple,
                    ) else {
                        continue;
                    };

                    let candidate = match result {
                        Ok(candidate) => candidate,
                        Err(reason) => {
                            scan.rejections.push(rejected(pattern_type, window, reason, None));
                            continue;
                        }
                    };

                    let state = match lifecycle::evaluate(
                        &candidate,
                        candles,
                        tolerance,
                        &self.thresholds,
                    ) {
                        Ok(state) => state,
                        Err(reason) => {
                            let structural =
                                structural_confidence(candidate.tightness, candidate.symmetry);
                            scan.rejections.push(rejected(pattern_type, window, reason, Some(structural)));
                            continue;
                        }
                    };

                    let pattern = lifecycle::build_pattern(candidate, state, candles, timeframe, as_of)?;
                    if pattern.confidence < self.thresholds.min_confidence {
                        scan.rejections.push(rejected(
                            pattern_type,
                            window,
                            RejectReason::BelowConfidenceFloor,
                            Some(pattern.confidence),
                        ));
                        continue;
                    }
                    let better = best
                        .as_ref()
                        .map(|current| pattern.confidence > current.confidence)
                        .unwrap_or(true);
                    if better {
                        best = Some(pattern);
                    }
                }

                if let Some(pattern) = best {
                    scan.patterns.push(pattern);
                }
            }
        }

        scan.patterns.sort_by(|a, b| {
            a.range
                .end
                .cmp(&b.range.end)
                .then(a.range.start.cmp(&b.range.start))
                .then(a.pattern_type.cmp(&b.pattern_type))
        });

        debug!(
            patterns = scan.patterns.len(),
            rejected = scan.rejections.len(),
            "차트 패턴 스캔 완료"
        );
        Ok(scan)
    }
}

fn rejected(
    pattern_type: ChartPatternType,
    window: &[SwingPivot],
    reason: RejectReason,
    confidence: Option<f64>,
) -> RejectedCandidate {
    RejectedCandidate {
        pattern_type,
        pivot_indices: window.iter().map(|p| p.index).collect(),
        reason,
        confidence: confidence.map(|c| crate::numeric::round_to(c, 4)),
    }
}

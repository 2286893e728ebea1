//! 차트 패턴 감지 및 과거 백테스트 엔진.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 스윙 피봇 감지
//! - 차트 패턴 분류 (이중 천장/바닥, 헤드앤숄더, 삼각형, 웨지)와 진행 상태 판정
//! - 돌파 이후 흐름 평가
//! - 2캔들 반전 패턴 감지 (장악형, 잉태형, 집게형, 먹구름형, 관통형)
//! - 패턴 직전 국지 문맥 분류
//! - 패턴 유형별 과거 전방 수익률 통계
//!
//! # Re-exports
//!
//! - [`pipeline`]: 보고서 조립 (PatternAnalyzer, AnalysisReport)
//! - [`chart`]: 차트 패턴 (ChartPatternClassifier, DetectedPattern)
//! - [`candle_pair`]: 2캔들 패턴 (DetectorRegistry, PatternDetector)

pub mod aftermath;
pub mod candle_pair;
pub mod chart;
pub mod context;
pub mod history;
mod numeric;
pub mod pipeline;
pub mod swing;
pub mod types;

// Pipeline 모듈 re-exports
pub use pipeline::{AnalysisReport, DebugTrace, PatternAnalyzer, ReportMetadata};

// Swing 모듈 re-exports
pub use swing::{SwingDetector, SwingKind, SwingPivot};

// Chart 모듈 re-exports
pub use chart::{
    Bias, ChartPatternClassifier, ChartPatternType, DetectedPattern, Neckline, PatternFamily,
    PatternRange, PatternStatus, RejectReason, RejectedCandidate,
};

// Aftermath 모듈 re-exports
pub use aftermath::{Aftermath, AftermathEvaluator, AftermathOutcome, HorizonOutcome};

// Candle pair 모듈 re-exports
pub use candle_pair::{
    CandlePairPattern, CandlePairType, Detection, DetectorRegistry, PairContext, PairStatus,
    PatternDetector,
};

// Context 모듈 re-exports
pub use context::{ContextClassifier, LocalContext, TrendDirection, VolatilityLevel};

// History 모듈 re-exports
pub use history::{HistoryBacktester, HistoryStats, HorizonStats, PatternOccurrence};

pub use types::Direction;

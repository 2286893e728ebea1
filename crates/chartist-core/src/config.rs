//! 설정 관리.
//!
//! 설정은 기본값 → TOML 파일 → `CHARTIST__*` 환경 변수 순으로 덮어씁니다.
//! 휴리스틱 임계값은 모두 이름 있는 상수로 두고 [`Thresholds`]로 덮어쓸 수 있습니다.
//! 이 값들은 통계적으로 보정된 값이 아니므로 실제 데이터로 재조정이 필요합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::AnalysisParams;
use crate::error::{AnalysisError, AnalysisResult};

// ==================== 휴리스틱 기본값 ====================

/// 추세 판단 조회 기간 (캔들 수)
pub const DEFAULT_TREND_LOOKBACK: usize = 3;
/// 추세 방향 판정에 필요한 다수결 비율
pub const DEFAULT_TREND_AGREEMENT: f64 = 0.6;
/// 변동성 판단 조회 기간 (캔들 수)
pub const DEFAULT_VOLATILITY_LOOKBACK: usize = 5;
/// 이 값(%) 미만이면 저변동성
pub const DEFAULT_LOW_VOLATILITY_PCT: f64 = 1.5;
/// 이 값(%) 초과면 고변동성
pub const DEFAULT_HIGH_VOLATILITY_PCT: f64 = 3.0;
/// Tweezer 고가/저가 일치 허용 오차 (평균 대비)
pub const DEFAULT_TWEEZER_TOLERANCE: f64 = 0.005;
/// Tweezer가 위치해야 하는 최근 범위 상/하단 비율
pub const DEFAULT_TWEEZER_RANGE_ZONE: f64 = 0.2;
/// Harami 두 번째 몸통의 최대 크기 비율
pub const DEFAULT_HARAMI_MAX_BODY_RATIO: f64 = 0.7;
/// Dark Cloud / Piercing 첫 캔들 몸통의 최소 배수 (평균 몸통 대비)
pub const DEFAULT_PENETRATION_MIN_BODY_MULTIPLE: f64 = 1.5;
/// Dark Cloud / Piercing 갭 허용 오차 (첫 캔들 몸통 대비)
pub const DEFAULT_PENETRATION_GAP_TOLERANCE: f64 = 0.1;
/// 캔들 쌍 컨텍스트(평균 몸통, 최근 범위) 조회 기간
pub const DEFAULT_CONTEXT_LOOKBACK: usize = 10;
/// 캔들 쌍 패턴을 보고할 최근 캔들 수
pub const DEFAULT_RECENT_BARS: usize = 5;
/// 차트 패턴 최소 신뢰도
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
/// 차트 패턴 최소 높이 (가격 대비)
pub const DEFAULT_MIN_HEIGHT_PCT: f64 = 0.01;
/// near_completion 판정 완성 비율
pub const DEFAULT_NEAR_COMPLETION_RATIO: f64 = 0.6;
/// 꼭짓점이 패턴 폭의 이 배수보다 멀면 수렴 패턴으로 보지 않음
pub const DEFAULT_MAX_APEX_DISTANCE_MULTIPLE: f64 = 5.0;
/// 돌파 확정에 필요한 넥라인 대비 여유 비율
pub const DEFAULT_BREAKOUT_MARGIN_PCT: f64 = 0.002;
/// partial_move 판정에 필요한 목표 대비 진행 비율
pub const DEFAULT_PARTIAL_MOVE_RATIO: f64 = 0.5;
/// 히스토리 통계를 내기 위한 최소 발생 횟수
pub const MIN_HISTORY_OCCURRENCES: usize = 5;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 기본 분석 파라미터
    pub analysis: AnalysisParams,
    /// 휴리스틱 임계값
    pub thresholds: Thresholds,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// 휴리스틱 임계값.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    // === 로컬 컨텍스트 ===
    pub trend_lookback: usize,
    pub trend_agreement: f64,
    pub volatility_lookback: usize,
    pub low_volatility_pct: f64,
    pub high_volatility_pct: f64,

    // === 캔들 쌍 패턴 ===
    pub tweezer_tolerance: f64,
    pub tweezer_range_zone: f64,
    pub harami_max_body_ratio: f64,
    pub penetration_min_body_multiple: f64,
    pub penetration_gap_tolerance: f64,
    pub context_lookback: usize,
    pub recent_bars: usize,

    // === 차트 패턴 ===
    pub min_confidence: f64,
    pub min_height_pct: f64,
    pub near_completion_ratio: f64,
    pub max_apex_distance_multiple: f64,

    // === 돌파 이후 평가 ===
    pub breakout_margin_pct: f64,
    pub partial_move_ratio: f64,

    // === 히스토리 ===
    pub min_history_occurrences: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            trend_lookback: DEFAULT_TREND_LOOKBACK,
            trend_agreement: DEFAULT_TREND_AGREEMENT,
            volatility_lookback: DEFAULT_VOLATILITY_LOOKBACK,
            low_volatility_pct: DEFAULT_LOW_VOLATILITY_PCT,
            high_volatility_pct: DEFAULT_HIGH_VOLATILITY_PCT,
            tweezer_tolerance: DEFAULT_TWEEZER_TOLERANCE,
            tweezer_range_zone: DEFAULT_TWEEZER_RANGE_ZONE,
            harami_max_body_ratio: DEFAULT_HARAMI_MAX_BODY_RATIO,
            penetration_min_body_multiple: DEFAULT_PENETRATION_MIN_BODY_MULTIPLE,
            penetration_gap_tolerance: DEFAULT_PENETRATION_GAP_TOLERANCE,
            context_lookback: DEFAULT_CONTEXT_LOOKBACK,
            recent_bars: DEFAULT_RECENT_BARS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_height_pct: DEFAULT_MIN_HEIGHT_PCT,
            near_completion_ratio: DEFAULT_NEAR_COMPLETION_RATIO,
            max_apex_distance_multiple: DEFAULT_MAX_APEX_DISTANCE_MULTIPLE,
            breakout_margin_pct: DEFAULT_BREAKOUT_MARGIN_PCT,
            partial_move_ratio: DEFAULT_PARTIAL_MOVE_RATIO,
            min_history_occurrences: MIN_HISTORY_OCCURRENCES,
        }
    }
}

impl Thresholds {
    /// 임계값 범위를 검증합니다.
    pub fn validate(&self) -> AnalysisResult<()> {
        let fractions = [
            ("trend_agreement", self.trend_agreement),
            ("tweezer_tolerance", self.tweezer_tolerance),
            ("tweezer_range_zone", self.tweezer_range_zone),
            ("harami_max_body_ratio", self.harami_max_body_ratio),
            ("penetration_gap_tolerance", self.penetration_gap_tolerance),
            ("min_confidence", self.min_confidence),
            ("min_height_pct", self.min_height_pct),
            ("near_completion_ratio", self.near_completion_ratio),
            ("breakout_margin_pct", self.breakout_margin_pct),
            ("partial_move_ratio", self.partial_move_ratio),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidParameter(format!(
                    "{}는 0 ~ 1 범위여야 합니다 (입력: {})",
                    name, value
                )));
            }
        }

        let positives = [
            ("low_volatility_pct", self.low_volatility_pct),
            ("high_volatility_pct", self.high_volatility_pct),
            (
                "penetration_min_body_multiple",
                self.penetration_min_body_multiple,
            ),
            ("max_apex_distance_multiple", self.max_apex_distance_multiple),
        ];
        for (name, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::InvalidParameter(format!(
                    "{}는 양수여야 합니다 (입력: {})",
                    name, value
                )));
            }
        }

        if self.low_volatility_pct > self.high_volatility_pct {
            return Err(AnalysisError::InvalidParameter(
                "low_volatility_pct가 high_volatility_pct보다 큽니다".to_string(),
            ));
        }
        if self.trend_lookback == 0 || self.volatility_lookback == 0 || self.recent_bars == 0 {
            return Err(AnalysisError::InvalidParameter(
                "조회 기간은 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드합니다.
    pub fn load(path: Option<&Path>) -> AnalysisResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.format", "compact")?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CHARTIST")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("analysis.history_horizons")
                    .with_list_parse_key("analysis.aftermath_horizons")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// 전체 설정을 검증합니다.
    pub fn validate(&self) -> AnalysisResult<()> {
        self.analysis.validate()?;
        self.thresholds.validate()
    }
}

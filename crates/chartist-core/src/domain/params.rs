//! 분석 요청 파라미터.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// 허용되는 최대 가격 허용 오차 (10%).
pub const MAX_TOLERANCE_PCT: f64 = 0.1;

/// 한 요청에서 분석할 수 있는 최대 캔들 수.
pub const MAX_LIMIT: usize = 10_000;

/// `window_days`, `history_lookback_days`의 최대값 (100년).
pub const MAX_DAYS: u32 = 36_500;

/// 분석 요청 파라미터.
///
/// 모든 값은 계산 전에 [`AnalysisParams::validate`]로 검증됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// 스윙 확정에 필요한 좌우 캔들 수
    pub swing_depth: usize,
    /// 같은 가격 레벨로 판단하는 상대 오차 (0 ~ 0.1)
    pub tolerance_pct: f64,
    /// 같은 종류 스윙 사이의 최소 간격 (캔들 수)
    pub min_bars_between_swings: usize,
    /// 분석할 최근 캔들 수
    pub limit: usize,
    /// 차트 패턴을 이 기간(일) 안에 끝난 것으로 제한
    pub window_days: Option<u32>,
    /// 히스토리 통계의 조회 기간 (일)
    pub history_lookback_days: u32,
    /// 히스토리 통계의 전방 수익률 기간 (캔들 수)
    pub history_horizons: Vec<usize>,
    /// 백테스트에서 제외할 최근 캔들 수
    pub history_exclude_last: usize,
    /// 돌파 이후 평가 기간 (캔들 수)
    pub aftermath_horizons: Vec<usize>,
    /// 미확정 마지막 캔들의 패턴 감지 참여 허용 여부
    pub allow_partial_patterns: bool,
    /// 기준 시각 (없으면 마지막 캔들 시간)
    pub as_of: Option<DateTime<Utc>>,
    /// 디버그 트레이스 포함 여부
    pub debug: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            swing_depth: 3,
            tolerance_pct: 0.02,
            min_bars_between_swings: 2,
            limit: 500,
            window_days: None,
            history_lookback_days: 365,
            history_horizons: vec![1, 3, 5],
            history_exclude_last: 2,
            aftermath_horizons: vec![3, 7, 14],
            allow_partial_patterns: false,
            as_of: None,
            debug: false,
        }
    }
}

impl AnalysisParams {
    /// 파라미터 범위를 검증합니다.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.swing_depth < 1 {
            return Err(invalid("swing_depth는 1 이상이어야 합니다"));
        }
        if !self.tolerance_pct.is_finite()
            || self.tolerance_pct < 0.0
            || self.tolerance_pct > MAX_TOLERANCE_PCT
        {
            return Err(invalid(format!(
                "tolerance_pct는 0 ~ {} 범위여야 합니다 (입력: {})",
                MAX_TOLERANCE_PCT, self.tolerance_pct
            )));
        }
        if self.min_bars_between_swings < 1 {
            return Err(invalid("min_bars_between_swings는 1 이상이어야 합니다"));
        }
        if self.limit < 1 || self.limit > MAX_LIMIT {
            return Err(invalid(format!(
                "limit는 1 ~ {} 범위여야 합니다 (입력: {})",
                MAX_LIMIT, self.limit
            )));
        }
        if let Some(days) = self.window_days {
            validate_days("window_days", days)?;
        }
        validate_days("history_lookback_days", self.history_lookback_days)?;
        validate_horizons("history_horizons", &self.history_horizons)?;
        validate_horizons("aftermath_horizons", &self.aftermath_horizons)?;
        Ok(())
    }
}

fn validate_days(name: &str, days: u32) -> AnalysisResult<()> {
    if days < 1 || days > MAX_DAYS {
        return Err(invalid(format!(
            "{}는 1 ~ {} 범위여야 합니다 (입력: {})",
            name, MAX_DAYS, days
        )));
    }
    Ok(())
}

fn validate_horizons(name: &str, horizons: &[usize]) -> AnalysisResult<()> {
    if horizons.is_empty() {
        return Err(invalid(format!("{}가 비어 있습니다", name)));
    }
    if let Some(h) = horizons.iter().find(|&&h| h == 0 || h > MAX_LIMIT) {
        return Err(invalid(format!("{}에 잘못된 기간이 있습니다: {}", name, h)));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> AnalysisError {
    AnalysisError::InvalidParameter(msg.into())
}

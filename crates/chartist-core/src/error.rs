//! 패턴 엔진의 에러 타입.
//!
//! 호출자에게 노출되는 에러 분류는 세 가지입니다:
//! - `insufficient_data`: 요청한 분석에 비해 시계열이 너무 짧음
//! - `invalid_parameter`: 범위를 벗어난 파라미터 또는 잘못된 입력 시계열
//! - `internal`: 정상 입력에서는 발생하지 않아야 하는 내부 오류

use thiserror::Error;

/// 분석 에러.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 데이터 부족
    #[error("데이터 부족: 필요 {required}개, 제공 {actual}개")]
    InsufficientData { required: usize, actual: usize },

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),

    /// 시간 순서가 맞지 않는 캔들 시계열
    #[error("시계열 순서 오류: 인덱스 {index}의 캔들 시간이 이전 캔들보다 늦지 않습니다")]
    UnorderedSeries { index: usize },

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 분석 작업을 위한 Result 타입.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    /// 호출자에게 전달되는 에러 코드를 반환합니다.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData { .. } => "insufficient_data",
            AnalysisError::InvalidParameter(_)
            | AnalysisError::UnorderedSeries { .. }
            | AnalysisError::Config(_) => "invalid_parameter",
            AnalysisError::Internal(_) => "internal",
        }
    }

    /// 재시도 가능한 에러인지 확인합니다.
    ///
    /// 코어는 순수 계산만 수행하므로 같은 입력으로 재시도해도 결과가 같습니다.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<config::ConfigError> for AnalysisError {
    fn from(err: config::ConfigError) -> Self {
        AnalysisError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::InvalidParameter(format!("입력 파싱 실패: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AnalysisError::InsufficientData {
            required: 7,
            actual: 3,
        };
        assert_eq!(err.code(), "insufficient_data");
        assert_eq!(err.to_string(), "데이터 부족: 필요 7개, 제공 3개");

        assert_eq!(
            AnalysisError::UnorderedSeries { index: 4 }.code(),
            "invalid_parameter"
        );
        assert_eq!(
            AnalysisError::InvalidParameter("tolerance_pct".to_string()).code(),
            "invalid_parameter"
        );
        assert_eq!(AnalysisError::Internal("x".to_string()).code(), "internal");
    }

    #[test]
    fn test_error_never_retryable() {
        assert!(!AnalysisError::Internal("overflow".to_string()).is_retryable());
        assert!(!AnalysisError::InsufficientData {
            required: 1,
            actual: 0
        }
        .is_retryable());
    }
}

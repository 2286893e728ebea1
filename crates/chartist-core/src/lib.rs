//! # Chartist Core
//!
//! 차트 패턴 엔진의 핵심 타입을 제공합니다:
//! - 캔들 및 검증된 캔들 시계열
//! - 분석 파라미터
//! - 에러 분류
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;

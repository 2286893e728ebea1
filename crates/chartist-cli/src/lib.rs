//! CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - JSON 캔들 파일 분석 (`analyze`)
//! - 지원 패턴 목록 (`patterns`)

pub mod commands;

pub use commands::*;

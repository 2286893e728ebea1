//! `patterns` 명령: 등록된 2캔들 패턴과 차트 패턴 목록.

use anyhow::Result;
use chartist_analytics::{ChartPatternType, DetectorRegistry};
use chartist_core::Thresholds;
use serde::Serialize;

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Invalid format: {}. Use: table, json", s)),
        }
    }
}

/// 패턴 목록 항목.
#[derive(Debug, Clone, Serialize)]
pub struct PatternEntry {
    pub id: String,
    pub label: &'static str,
    pub kind: &'static str,
    pub direction: String,
}

/// 2캔들 레지스트리와 차트 패턴 테이블에서 목록을 만듭니다.
pub fn pattern_entries(thresholds: &Thresholds) -> Result<Vec<PatternEntry>> {
    let registry = DetectorRegistry::new(thresholds);
    let mut entries = Vec::new();

    for pattern_type in registry.types() {
        entries.push(PatternEntry {
            id: enum_id(&pattern_type)?,
            label: pattern_type.label(),
            kind: "candle_pair",
            direction: enum_id(&pattern_type.direction())?,
        });
    }
    for pattern_type in ChartPatternType::ALL {
        entries.push(PatternEntry {
            id: enum_id(&pattern_type)?,
            label: pattern_type.label(),
            kind: "chart",
            direction: enum_id(&pattern_type.bias())?,
        });
    }
    Ok(entries)
}

/// 목록을 출력 형식에 맞게 렌더링합니다.
pub fn render_patterns(entries: &[PatternEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        OutputFormat::Table => {
            let mut out = format!("{:<30} {:<28} {:<12} {}\n", "ID", "NAME", "KIND", "DIRECTION");
            out.push_str(&"-".repeat(80));
            out.push('\n');
            for e in entries {
                out.push_str(&format!("{:<30} {:<28} {:<12} {}\n", e.id, e.label, e.kind, e.direction));
            }
            Ok(out)
        }
    }
}

/// serde 이름 (snake_case) 그대로의 식별자.
fn enum_id<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(anyhow::anyhow!("unexpected enum representation: {}", other)),
    }
}

//! `analyze` 명령: JSON 캔들 파일을 읽어 패턴 분석 보고서를 출력합니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chartist_analytics::{AnalysisReport, PatternAnalyzer};
use chartist_core::{AppConfig, CandleSeries, RawCandle, Timeframe};
use serde::Deserialize;
use tracing::info;

/// 분석 명령 설정.
#[derive(Debug, Default)]
pub struct AnalyzeConfig {
    /// 입력 JSON 파일
    pub input: PathBuf,
    /// 심볼 (입력 파일 값보다 우선)
    pub symbol: Option<String>,
    /// 타임프레임 (입력 파일 값보다 우선)
    pub timeframe: Option<String>,
    pub tolerance: Option<f64>,
    pub swing_depth: Option<usize>,
    pub allow_partial: bool,
    pub debug: bool,
    /// 보기 좋은 JSON 출력
    pub pretty: bool,
}

/// 입력 파일 형식: 캔들 배열 또는 메타데이터가 포함된 객체.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InputDocument {
    Series {
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        timeframe: Option<String>,
        candles: Vec<RawCandle>,
    },
    Candles(Vec<RawCandle>),
}

impl InputDocument {
    /// JSON 문자열을 파싱합니다.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("입력 JSON 형식이 올바르지 않습니다")
    }

    /// 명령줄 값을 우선 적용해 캔들 시계열을 만듭니다.
    pub fn into_series(self, symbol: Option<String>, timeframe: Option<String>) -> Result<CandleSeries> {
        let (doc_symbol, doc_timeframe, candles) = match self {
            InputDocument::Series {
                symbol,
                timeframe,
                candles,
            } => (symbol, timeframe, candles),
            InputDocument::Candles(candles) => (None, None, candles),
        };

        let symbol = symbol.or(doc_symbol).unwrap_or_else(|| "UNKNOWN".to_string());
        let interval = timeframe.or(doc_timeframe).unwrap_or_else(|| "1d".to_string());
        let timeframe: Timeframe = interval
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("지원하지 않는 타임프레임: {}", interval))?;

        CandleSeries::from_raw(symbol, timeframe, &candles).context("캔들 시계열 검증 실패")
    }
}

/// 명령줄 값을 설정 파일/환경 변수 값 위에 덮어씁니다.
pub fn apply_overrides(app: &mut AppConfig, config: &AnalyzeConfig) {
    let params = &mut app.analysis;
    if let Some(tolerance) = config.tolerance {
        params.tolerance_pct = tolerance;
    }
    if let Some(depth) = config.swing_depth {
        params.swing_depth = depth;
    }
    params.allow_partial_patterns |= config.allow_partial;
    params.debug |= config.debug;
}

/// 분석을 실행하고 보고서를 반환합니다.
pub fn analyze_file(config: &AnalyzeConfig, mut app: AppConfig) -> Result<AnalysisReport> {
    let json = read_input(&config.input)?;
    let series = InputDocument::parse(&json)?.into_series(config.symbol.clone(), config.timeframe.clone())?;
    info!(
        symbol = series.symbol(),
        timeframe = %series.timeframe(),
        candles = series.len(),
        skipped = series.skipped_records(),
        "입력 로드 완료"
    );

    apply_overrides(&mut app, config);
    let analyzer = PatternAnalyzer::new(app.thresholds.clone());
    let report = analyzer
        .analyze(&series, &app.analysis)
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))?;

    info!(
        chart_patterns = report.chart_patterns.len(),
        candle_patterns = report.candle_patterns.len(),
        "분석 완료"
    );
    Ok(report)
}

/// 보고서를 JSON 문자열로 직렬화합니다.
pub fn render(report: &AnalysisReport, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("입력 파일을 읽을 수 없습니다: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDLES: &str = r#"[
        {"time": "2024-01-01T00:00:00Z", "open": 100, "high": 101, "low": 99, "close": 100.5},
        {"isoTime": "2024-01-02T00:00:00Z", "open": 100.5, "high": 102, "low": 100, "close": 101, "confirmed": false}
    ]"#;

    #[test]
    fn test_parse_candle_array() {
        let series = InputDocument::parse(CANDLES)
            .unwrap()
            .into_series(Some("BTCUSDT".to_string()), None)
            .unwrap();
        assert_eq!(series.symbol(), "BTCUSDT");
        assert_eq!(series.timeframe(), Timeframe::D1);
        assert_eq!(series.len(), 2);
        assert!(series.has_provisional());
    }

    #[test]
    fn test_parse_series_object() {
        let json = format!(r#"{{"symbol": "ETHUSDT", "timeframe": "4h", "candles": {}}}"#, CANDLES);
        let series = InputDocument::parse(&json).unwrap().into_series(None, None).unwrap();
        assert_eq!(series.symbol(), "ETHUSDT");
        assert_eq!(series.timeframe(), Timeframe::H4);

        // 명령줄 값이 우선
        let series = InputDocument::parse(&json)
            .unwrap()
            .into_series(None, Some("1h".to_string()))
            .unwrap();
        assert_eq!(series.timeframe(), Timeframe::H1);
    }

    #[test]
    fn test_unknown_timeframe() {
        let result = InputDocument::parse(CANDLES).unwrap().into_series(None, Some("7x".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut app = AppConfig::default();
        let config = AnalyzeConfig {
            tolerance: Some(0.05),
            swing_depth: Some(4),
            debug: true,
            ..AnalyzeConfig::default()
        };
        apply_overrides(&mut app, &config);
        assert_eq!(app.analysis.tolerance_pct, 0.05);
        assert_eq!(app.analysis.swing_depth, 4);
        assert!(app.analysis.debug);
        assert!(!app.analysis.allow_partial_patterns);
    }
}

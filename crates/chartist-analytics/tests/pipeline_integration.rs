//! 분석 파이프라인 통합 테스트.

use chartist_analytics::{
    AftermathOutcome, CandlePairType, ChartPatternType, PatternAnalyzer, PatternStatus,
};
use chartist_core::{AnalysisParams, Candle, CandleSeries, RawCandle, Timeframe};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn time(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

fn push(candles: &mut Vec<Candle>, open: Decimal, close: Decimal) {
    let i = candles.len();
    candles.push(Candle::new(
        time(i),
        open,
        open.max(close) + dec!(1),
        open.min(close) - dec!(1),
        close,
    ));
}

/// 상승 장악형 + 다음 캔들 +2% 블록 반복.
fn engulfing_series(blocks: usize) -> CandleSeries {
    let mut candles = Vec::new();
    for _ in 0..blocks {
        push(&mut candles, dec!(104), dec!(100));
        push(&mut candles, dec!(99), dec!(105));
        push(&mut candles, dec!(105), dec!(107.1));
    }
    push(&mut candles, dec!(107), dec!(108));
    push(&mut candles, dec!(108), dec!(109));
    CandleSeries::new("BTCUSDT", Timeframe::D1, candles).unwrap()
}

/// 이중 천장 후 넥라인 돌파와 목표가 도달.
fn double_top_series() -> CandleSeries {
    let closes = [
        dec!(100),
        dec!(105),
        dec!(110),
        dec!(105),
        dec!(100),
        dec!(105),
        dec!(110),
        dec!(104),
        dec!(98),
        dec!(93),
        dec!(88),
        dec!(90),
        dec!(92),
    ];
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, c)| Candle::new(time(i), *c, *c + dec!(0.5), *c - dec!(0.5), *c))
        .collect();
    CandleSeries::new("ETHUSDT", Timeframe::D1, candles).unwrap()
}

#[test]
fn test_history_stats_with_five_occurrences() {
    let report = PatternAnalyzer::default()
        .analyze(&engulfing_series(5), &AnalysisParams::default())
        .unwrap();

    let engulfing = report
        .candle_patterns
        .iter()
        .find(|p| p.pattern_type == CandlePairType::BullishEngulfing)
        .expect("최근 상승 장악형");
    assert_eq!(engulfing.candle_range_index, [12, 13]);
    assert_eq!(engulfing.strength, 0.625);

    let stats = engulfing.history_stats.as_ref().expect("과거 통계");
    assert_eq!(stats.occurrences, 5);
    let one = &stats.horizons[&1];
    assert_eq!(one.avg_return, dec!(2.00));
    assert_eq!(one.win_rate, 1.0);
    assert_eq!(one.sample, 5);

    let json = serde_json::to_value(&report).unwrap();
    let horizon = &json["candle_patterns"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["type"] == "bullish_engulfing")
        .unwrap()["history_stats"]["horizons"]["1"];
    assert_eq!(horizon["avg_return"], "2.00");
    assert_eq!(horizon["sample"], 5);
}

#[test]
fn test_history_stats_null_with_four_occurrences() {
    let report = PatternAnalyzer::default()
        .analyze(&engulfing_series(4), &AnalysisParams::default())
        .unwrap();

    let engulfing = report
        .candle_patterns
        .iter()
        .find(|p| p.pattern_type == CandlePairType::BullishEngulfing)
        .unwrap();
    assert!(engulfing.history_stats.is_none());

    let json = serde_json::to_value(&report).unwrap();
    let first = json["candle_patterns"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["type"] == "bullish_engulfing")
        .unwrap()
        .clone();
    assert!(first["history_stats"].is_null());
}

#[test]
fn test_double_top_reaches_target() {
    let params = AnalysisParams {
        swing_depth: 2,
        ..AnalysisParams::default()
    };
    let report = PatternAnalyzer::default()
        .analyze(&double_top_series(), &params)
        .unwrap();

    let pattern = report
        .chart_patterns
        .iter()
        .find(|p| p.pattern_type == ChartPatternType::DoubleTop)
        .expect("이중 천장");
    assert_eq!(pattern.status, PatternStatus::Completed);
    assert_eq!(pattern.range.start, 2);
    assert_eq!(pattern.range.end, 6);
    assert_eq!(pattern.breakout_index, Some(8));
    assert_eq!(pattern.breakout_date, Some(time(8)));
    assert!(pattern.apex_date.is_none());

    let aftermath = pattern.aftermath.as_ref().expect("돌파 이후 평가");
    assert_eq!(aftermath.theoretical_target, dec!(88.5));
    assert!(aftermath.target_reached);
    assert_eq!(aftermath.days_to_target, Some(2));
    assert_eq!(aftermath.outcome, AftermathOutcome::TargetReached);
    assert!(aftermath.breakout_confirmed);
}

#[test]
fn test_identical_input_gives_identical_output() {
    let analyzer = PatternAnalyzer::default();
    let params = AnalysisParams {
        swing_depth: 2,
        debug: true,
        ..AnalysisParams::default()
    };
    let first = serde_json::to_string(&analyzer.analyze(&double_top_series(), &params).unwrap()).unwrap();
    let second = serde_json::to_string(&analyzer.analyze(&double_top_series(), &params).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_provisional_candle_only_when_allowed() {
    let mut candles = engulfing_series(5).candles().to_vec();
    candles.truncate(13);
    // 마지막 장악형 확인 캔들을 미확정으로
    let last = Candle::new(time(13), dec!(99), dec!(106), dec!(98), dec!(105)).into_provisional();
    candles.push(last);
    let series = CandleSeries::new("BTCUSDT", Timeframe::D1, candles).unwrap();

    let strict = PatternAnalyzer::default()
        .analyze(&series, &AnalysisParams::default())
        .unwrap();
    assert_eq!(strict.metadata.bars_analyzed, 13);
    assert!(!strict.metadata.partial_candle_used);
    assert!(strict.candle_patterns.iter().all(|p| !p.uses_partial_candle));

    let params = AnalysisParams {
        allow_partial_patterns: true,
        ..AnalysisParams::default()
    };
    let partial = PatternAnalyzer::default().analyze(&series, &params).unwrap();
    assert!(partial.metadata.partial_candle_used);
    let forming = partial
        .candle_patterns
        .iter()
        .find(|p| p.pattern_type == CandlePairType::BullishEngulfing && p.uses_partial_candle)
        .expect("미확정 캔들을 사용한 장악형");
    assert_eq!(forming.status, chartist_analytics::PairStatus::Forming);
    assert_eq!(forming.candle_range_index, [12, 13]);
}

#[test]
fn test_skipped_records_are_reported() {
    let mut raw: Vec<RawCandle> = double_top_series()
        .candles()
        .iter()
        .map(|c| RawCandle {
            time: c.open_time,
            open: c.open.to_string().parse().unwrap(),
            high: c.high.to_string().parse().unwrap(),
            low: c.low.to_string().parse().unwrap(),
            close: c.close.to_string().parse().unwrap(),
            volume: None,
            confirmed: true,
        })
        .collect();
    raw[5].close = f64::NAN;

    let series = CandleSeries::from_raw("ETHUSDT", Timeframe::D1, &raw).unwrap();
    let params = AnalysisParams {
        swing_depth: 2,
        ..AnalysisParams::default()
    };
    let report = PatternAnalyzer::default().analyze(&series, &params).unwrap();
    assert_eq!(report.metadata.skipped_candles, 1);
    assert_eq!(report.metadata.bars_analyzed, 12);
}

#[test]
fn test_window_days_filters_by_pattern_end_relative_to_as_of() {
    let analyzer = PatternAnalyzer::default();
    let series = double_top_series();
    let has_double_top = |params: &AnalysisParams| {
        let report = analyzer.analyze(&series, params).unwrap();
        let found = report
            .chart_patterns
            .iter()
            .any(|p| p.pattern_type == ChartPatternType::DoubleTop);
        (report, found)
    };

    // 이중 천장은 6일차에 끝남
    let (report, found) = has_double_top(&AnalysisParams {
        swing_depth: 2,
        window_days: Some(10),
        as_of: Some(time(12)),
        ..AnalysisParams::default()
    });
    assert!(found);
    assert_eq!(report.as_of, time(12));

    let (report, found) = has_double_top(&AnalysisParams {
        swing_depth: 2,
        window_days: Some(10),
        as_of: Some(time(20)),
        ..AnalysisParams::default()
    });
    assert!(!found);
    assert_eq!(report.as_of, time(20));
    assert!(report.chart_patterns.iter().all(|p| p.range.end_time >= time(10)));
}

#[test]
fn test_explicit_as_of_drives_days_since_breakout() {
    let params = AnalysisParams {
        swing_depth: 2,
        as_of: Some(time(20)),
        ..AnalysisParams::default()
    };
    let report = PatternAnalyzer::default()
        .analyze(&double_top_series(), &params)
        .unwrap();
    let pattern = report
        .chart_patterns
        .iter()
        .find(|p| p.pattern_type == ChartPatternType::DoubleTop)
        .unwrap();
    assert_eq!(pattern.days_since_breakout, Some(12.0));
}

#[test]
fn test_malformed_candle_in_middle_is_counted() {
    let mut candles = double_top_series().candles().to_vec();
    // 고가 < 저가
    candles[11].high = dec!(80);
    let series = CandleSeries::new("ETHUSDT", Timeframe::D1, candles).unwrap();
    let params = AnalysisParams {
        swing_depth: 2,
        ..AnalysisParams::default()
    };
    let report = PatternAnalyzer::default().analyze(&series, &params).unwrap();
    assert_eq!(report.metadata.skipped_candles, 1);
    assert_eq!(report.metadata.bars_analyzed, 13);
}

#[test]
fn test_skipped_records_outside_limit_are_not_counted() {
    let mut raw: Vec<RawCandle> = engulfing_series(5)
        .candles()
        .iter()
        .map(|c| RawCandle {
            time: c.open_time,
            open: c.open.to_string().parse().unwrap(),
            high: c.high.to_string().parse().unwrap(),
            low: c.low.to_string().parse().unwrap(),
            close: c.close.to_string().parse().unwrap(),
            volume: None,
            confirmed: true,
        })
        .collect();
    raw[0].open = f64::INFINITY;

    let series = CandleSeries::from_raw("BTCUSDT", Timeframe::D1, &raw).unwrap();
    let params = AnalysisParams {
        limit: 10,
        ..AnalysisParams::default()
    };
    let report = PatternAnalyzer::default().analyze(&series, &params).unwrap();
    assert_eq!(report.metadata.bars_analyzed, 10);
    assert_eq!(report.metadata.skipped_candles, 0);
}

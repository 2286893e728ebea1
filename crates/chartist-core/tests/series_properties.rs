//! 캔들 변환과 시계열 검증에 대한 속성 기반 테스트.

use chartist_core::{AnalysisError, CandleSeries, RawCandle, Timeframe};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn price() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => 0.01f64..100_000.0,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
    ]
}

fn raw(i: i64, open: f64, high: f64, low: f64, close: f64) -> RawCandle {
    RawCandle {
        time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i),
        open,
        high,
        low,
        close,
        volume: None,
        confirmed: true,
    }
}

proptest! {
    #[test]
    fn conversion_rejects_exactly_non_finite(open in price(), high in price(), low in price(), close in price()) {
        let finite = [open, high, low, close].iter().all(|p| p.is_finite());
        prop_assert_eq!(raw(0, open, high, low, close).to_candle().is_some(), finite);
    }

    #[test]
    fn skipped_plus_kept_equals_input(prices in prop::collection::vec((price(), price()), 0..40)) {
        let records: Vec<RawCandle> = prices
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| raw(i as i64, a, a.max(b), a.min(b), b))
            .collect();
        let series = CandleSeries::from_raw("BTCUSDT", Timeframe::H1, &records).unwrap();
        prop_assert_eq!(series.len() + series.skipped_records(), records.len());
    }

    #[test]
    fn out_of_order_series_is_rejected(len in 2usize..30, swap in 0usize..29) {
        let swap = swap % (len - 1);
        let mut records: Vec<RawCandle> = (0..len as i64).map(|i| raw(i, 100.0, 101.0, 99.0, 100.5)).collect();
        records.swap(swap, swap + 1);
        let err = CandleSeries::from_raw("BTCUSDT", Timeframe::H1, &records).unwrap_err();
        let is_unordered = matches!(err, AnalysisError::UnorderedSeries { .. });
        prop_assert!(is_unordered);
    }
}

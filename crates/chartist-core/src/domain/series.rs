//! 검증된 캔들 시계열.
//!
//! 코어는 시계열이 오래된 것부터 최신 순으로 정렬되어 있다는 전제를 둡니다.
//! 순서가 뒤집히면 추세/백테스트 결과가 조용히 틀려지므로, 생성 시점에 검증합니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::domain::candle::{Candle, RawCandle};
use crate::error::{AnalysisError, AnalysisResult};
use crate::types::Timeframe;

/// 오래된 것부터 최신 순으로 정렬된 캔들 시계열.
#[derive(Debug, Clone, Serialize)]
pub struct CandleSeries {
    symbol: String,
    timeframe: Timeframe,
    candles: Vec<Candle>,
    /// 변환 단계에서 버려진 원본 레코드의 시간
    skipped_times: Vec<DateTime<Utc>>,
}

impl CandleSeries {
    /// 캔들 목록으로 시계열을 생성합니다.
    ///
    /// # 에러
    /// - 캔들 시간이 엄격히 증가하지 않으면 `UnorderedSeries`
    /// - 미확정 캔들이 마지막 위치가 아니면 `InvalidParameter`
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    ) -> AnalysisResult<Self> {
        validate_order(&candles)?;
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            candles,
            skipped_times: Vec::new(),
        })
    }

    /// 외부 제공자의 원본 레코드로 시계열을 생성합니다.
    ///
    /// 유한하지 않은 가격을 가진 레코드는 건너뛰고 그 수를 기록합니다.
    pub fn from_raw(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        records: &[RawCandle],
    ) -> AnalysisResult<Self> {
        let mut candles = Vec::with_capacity(records.len());
        let mut skipped_times = Vec::new();

        for record in records {
            match record.to_candle() {
                Some(candle) => candles.push(candle),
                None => skipped_times.push(record.time),
            }
        }

        if !skipped_times.is_empty() {
            warn!(
                skipped = skipped_times.len(),
                total = records.len(),
                "Skipped non-finite candle records"
            );
        }

        let mut series = Self::new(symbol, timeframe, candles)?;
        series.skipped_times = skipped_times;
        Ok(series)
    }

    /// 거래 심볼.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// 타임프레임.
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// 전체 캔들 (미확정 캔들 포함).
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 변환 단계에서 버려진 원본 레코드 수.
    pub fn skipped_records(&self) -> usize {
        self.skipped_times.len()
    }

    /// 마지막 캔들이 미확정인지 확인합니다.
    pub fn has_provisional(&self) -> bool {
        self.candles.last().is_some_and(Candle::is_provisional)
    }

    /// 확정된 캔들만 반환합니다.
    pub fn confirmed(&self) -> &[Candle] {
        if self.has_provisional() {
            &self.candles[..self.candles.len() - 1]
        } else {
            &self.candles
        }
    }

    /// 분석에 사용할 캔들을 반환합니다.
    ///
    /// `allow_partial`이 거짓이면 미확정 캔들을 제외합니다.
    pub fn usable(&self, allow_partial: bool) -> &[Candle] {
        if allow_partial {
            &self.candles
        } else {
            self.confirmed()
        }
    }

    /// 최근 `limit`개 캔들만 남긴 시계열을 반환합니다.
    ///
    /// 버려진 레코드도 남은 구간 안의 것만 셉니다.
    pub fn most_recent(&self, limit: usize) -> Self {
        let start = self.candles.len().saturating_sub(limit);
        let skipped_times = match self.candles.get(start) {
            Some(first) if start > 0 => self
                .skipped_times
                .iter()
                .copied()
                .filter(|t| *t >= first.open_time)
                .collect(),
            _ => self.skipped_times.clone(),
        };
        Self {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            candles: self.candles[start..].to_vec(),
            skipped_times,
        }
    }
}

fn validate_order(candles: &[Candle]) -> AnalysisResult<()> {
    for (index, pair) in candles.windows(2).enumerate() {
        if pair[1].open_time <= pair[0].open_time {
            return Err(AnalysisError::UnorderedSeries { index: index + 1 });
        }
    }

    let last = candles.len().saturating_sub(1);
    if let Some(index) = candles
        .iter()
        .position(Candle::is_provisional)
        .filter(|&i| i != last)
    {
        return Err(AnalysisError::InvalidParameter(format!(
            "미확정 캔들은 마지막 위치에만 올 수 있습니다 (인덱스 {})",
            index
        )));
    }

    Ok(())
}

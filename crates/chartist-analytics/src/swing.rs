//! 스윙(피봇) 감지.
//!
//! 좌우 `depth`개 캔들 안에서 가장 높은 고가/가장 낮은 저가를 스윙으로 확정합니다.
//! 결과는 항상 고점/저점이 번갈아 나오도록 정리됩니다.

use chartist_core::{AnalysisParams, Candle};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 스윙 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    /// 고점
    High,
    /// 저점
    Low,
}

/// 확정된 스윙 피봇.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingPivot {
    /// 캔들 인덱스
    pub index: usize,
    /// 가격 (고점이면 고가, 저점이면 저가)
    pub price: Decimal,
    /// 종류
    pub kind: SwingKind,
    /// 캔들 시간
    pub time: DateTime<Utc>,
}

impl SwingPivot {
    /// `other`보다 더 극단적인 가격인지 확인합니다. 같으면 거짓 (앞선 피봇 유지).
    fn is_more_extreme_than(&self, other: &SwingPivot) -> bool {
        match self.kind {
            SwingKind::High => self.price > other.price,
            SwingKind::Low => self.price < other.price,
        }
    }
}

/// 스윙 감지기.
#[derive(Debug, Clone)]
pub struct SwingDetector {
    depth: usize,
    min_bars_between: usize,
}

impl SwingDetector {
    /// 새 스윙 감지기를 생성합니다.
    pub fn new(depth: usize, min_bars_between: usize) -> Self {
        Self {
            depth: depth.max(1),
            min_bars_between: min_bars_between.max(1),
        }
    }

    /// 분석 파라미터로 스윙 감지기를 생성합니다.
    pub fn from_params(params: &AnalysisParams) -> Self {
        Self::new(params.swing_depth, params.min_bars_between_swings)
    }

    /// 스윙 확정에 필요한 최소 캔들 수 (`2·depth + 1`).
    pub fn min_candles(&self) -> usize {
        2 * self.depth + 1
    }

    /// 캔들 시계열에서 고점/저점이 번갈아 나오는 스윙 목록을 찾습니다.
    ///
    /// 캔들 수가 [`min_candles`](Self::min_candles)보다 적으면 빈 목록을 반환합니다.
    pub fn detect(&self, candles: &[Candle]) -> Vec<SwingPivot> {
        if candles.len() < self.min_candles() {
            return Vec::new();
        }

        let mut highs = Vec::new();
        let mut lows = Vec::new();

        for i in self.depth..candles.len() - self.depth {
            let candle = &candles[i];
            if !candle.is_well_formed() {
                continue;
            }

            let left = candles[i - self.depth..i]
                .iter()
                .filter(|c| c.is_well_formed());
            let right = candles[i + 1..=i + self.depth]
                .iter()
                .filter(|c| c.is_well_formed());

            // 동률이면 가장 앞선 캔들이 피봇이 됨: 왼쪽은 엄격히, 오른쪽은 같아도 허용
            let is_high = left.clone().all(|c| c.high < candle.high)
                && right.clone().all(|c| c.high <= candle.high);
            let is_low = left.clone().all(|c| c.low > candle.low)
                && right.clone().all(|c| c.low >= candle.low);

            if is_high {
                highs.push(pivot(candle, i, SwingKind::High));
            }
            if is_low {
                lows.push(pivot(candle, i, SwingKind::Low));
            }
        }

        let mut merged = self.collapse_close(highs);
        merged.extend(self.collapse_close(lows));
        merged.sort_by_key(|p| (p.index, p.kind));

        enforce_alternation(merged)
    }

    /// `min_bars_between`보다 가까운 같은 종류 스윙을 더 극단적인 하나로 합칩니다.
    fn collapse_close(&self, pivots: Vec<SwingPivot>) -> Vec<SwingPivot> {
        let mut out: Vec<SwingPivot> = Vec::with_capacity(pivots.len());
        for p in pivots {
            match out.last_mut() {
                Some(last) if p.index - last.index < self.min_bars_between => {
                    if p.is_more_extreme_than(last) {
                        *last = p;
                    }
                }
                _ => out.push(p),
            }
        }
        out
    }
}

fn pivot(candle: &Candle, index: usize, kind: SwingKind) -> SwingPivot {
    SwingPivot {
        index,
        price: match kind {
            SwingKind::High => candle.high,
            SwingKind::Low => candle.low,
        },
        kind,
        time: candle.open_time,
    }
}

/// 연속된 같은 종류 스윙을 가장 극단적인 하나로 합쳐 교대를 보장합니다.
fn enforce_alternation(sorted: Vec<SwingPivot>) -> Vec<SwingPivot> {
    let mut out: Vec<SwingPivot> = Vec::with_capacity(sorted.len());
    for p in sorted {
        match out.last_mut() {
            Some(last) if last.kind == p.kind => {
                if p.is_more_extreme_than(last) {
                    *last = p;
                }
            }
            // 한 캔들이 고점이자 저점이면 교대를 잇는 쪽만 남김
            Some(last) if last.index == p.index => {}
            _ => out.push(p),
        }
    }
    out
}

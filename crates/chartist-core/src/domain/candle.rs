//! 캔들 데이터 타입.
//!
//! 이 모듈은 패턴 엔진이 다루는 캔들 타입을 정의합니다:
//! - `Candle` - 검증된 OHLCV 캔들 (가격은 `Decimal`)
//! - `CandleState` - 확정/미확정(진행 중) 상태
//! - `RawCandle` - 외부 시세 제공자가 전달하는 원본 레코드 (`f64` 가격)

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 캔들 확정 상태.
///
/// 마지막 캔들은 아직 마감되지 않았을 수 있으며, 이 경우 `Provisional`입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleState {
    /// 마감된 캔들
    #[default]
    Confirmed,
    /// 아직 진행 중인 캔들 (시계열의 마지막에만 올 수 있음)
    Provisional,
}

/// OHLCV 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    /// 확정 상태
    #[serde(default)]
    pub state: CandleState,
}

impl Candle {
    /// 확정된 새 캔들을 생성합니다.
    pub fn new(
        open_time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume: None,
            state: CandleState::Confirmed,
        }
    }

    /// 미확정 캔들로 표시합니다.
    pub fn into_provisional(mut self) -> Self {
        self.state = CandleState::Provisional;
        self
    }

    /// 미확정 캔들인지 확인합니다.
    pub fn is_provisional(&self) -> bool {
        self.state == CandleState::Provisional
    }

    /// 캔들 몸통 크기(절대값)를 반환합니다.
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 몸통 상단 (시가와 종가 중 큰 값).
    pub fn body_top(&self) -> Decimal {
        self.open.max(self.close)
    }

    /// 몸통 하단 (시가와 종가 중 작은 값).
    pub fn body_bottom(&self) -> Decimal {
        self.open.min(self.close)
    }

    /// 몸통 중간값.
    pub fn body_mid(&self) -> Decimal {
        (self.open + self.close) / Decimal::TWO
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// 실제 범위(True Range)를 반환합니다.
    pub fn true_range(&self, prev_close: Option<Decimal>) -> Decimal {
        match prev_close {
            Some(pc) => self
                .range()
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.range(),
        }
    }

    /// OHLC 값이 서로 모순되지 않는지 확인합니다.
    ///
    /// 가격은 양수여야 하고, 고가/저가가 시가와 종가를 감싸야 합니다.
    pub fn is_well_formed(&self) -> bool {
        self.low > Decimal::ZERO
            && self.high >= self.low
            && self.high >= self.body_top()
            && self.low <= self.body_bottom()
    }
}

/// 외부 시세 제공자가 전달하는 원본 캔들 레코드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCandle {
    /// 캔들 시작 시간 (RFC 3339)
    #[serde(alias = "isoTime", alias = "open_time")]
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    /// 마감 여부 (생략 시 확정으로 간주)
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

impl RawCandle {
    /// `Candle`로 변환합니다.
    ///
    /// 가격 중 하나라도 유한한 값이 아니면 `None`을 반환합니다.
    pub fn to_candle(&self) -> Option<Candle> {
        let open = Decimal::from_f64(self.open)?;
        let high = Decimal::from_f64(self.high)?;
        let low = Decimal::from_f64(self.low)?;
        let close = Decimal::from_f64(self.close)?;

        let mut candle = Candle::new(self.time, open, high, low, close);
        if let Some(volume) = self.volume {
            // 거래량이 깨진 경우 가격은 살리고 거래량만 버림
            candle.volume = Decimal::from_f64(volume);
        }
        if !self.confirmed {
            candle.state = CandleState::Provisional;
        }
        Some(candle)
    }
}

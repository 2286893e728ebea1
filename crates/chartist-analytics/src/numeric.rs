//! `Decimal`/`f64` 변환과 비율 보정 헬퍼.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 설정값(`f64`)을 `Decimal`로 변환합니다. 변환할 수 없으면 `fallback`을 씁니다.
pub(crate) fn decimal_from(value: f64, fallback: Decimal) -> Decimal {
    Decimal::try_from(value).unwrap_or(fallback)
}

/// `Decimal` 비율을 `f64`로 변환합니다.
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// 값을 [0, 1] 범위로 제한합니다. NaN은 0으로 처리합니다.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 소수점 `dp` 자리로 반올림합니다.
pub(crate) fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// 0으로 나누기를 피하는 나눗셈.
pub(crate) fn safe_div(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        None
    } else {
        numerator.checked_div(denominator)
    }
}

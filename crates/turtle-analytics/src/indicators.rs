//! 기술적 지표 계산.
//!
//! 일봉 시리즈는 최신-우선(most-recent-first)으로 정규화한 뒤
//! 계산합니다. 돌파 기준선(돈치안)은 당일 봉을 제외한 구간에서
//! 구하므로, high20은 bars[1..=20], low10은 bars[1..=10]입니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use turtle_core::{DailyBar, Price};

/// 지표 계산 오류.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 데이터 부족 오류
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// 분석 실행마다 재계산되는 지표 묶음. 캐시하지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    /// ATR(20), N값
    pub atr: Decimal,
    /// 직전 20일 최고가 (당일 제외)
    pub high20: Price,
    /// 직전 10일 최저가 (당일 제외)
    pub low10: Price,
    /// 직전 20일 최저가 (당일 제외)
    pub low20: Price,
    /// 20일 평균 대비 당일 거래량 배수
    pub volume_ratio: f64,
    /// 52주 최고가 (장기 시리즈 메타데이터, 조회 실패 시 None)
    pub high52w: Option<Price>,
    /// 52주 최저가
    pub low52w: Option<Price>,
}

impl IndicatorSnapshot {
    /// 장기 시리즈에서 얻은 52주 고가/저가를 설정합니다.
    pub fn with_fifty_two_week(mut self, high: Price, low: Price) -> Self {
        self.high52w = Some(high);
        self.low52w = Some(low);
        self
    }
}

/// 시리즈를 최신-우선으로 정규화합니다.
pub fn recent_first(mut bars: Vec<DailyBar>) -> Vec<DailyBar> {
    bars.sort_by(|a, b| b.date.cmp(&a.date));
    bars
}

/// ATR을 계산합니다.
///
/// 최신-우선 시리즈의 앞에서부터 정확히 `period`개의 True Range만
/// 산술 평균합니다. 더 긴 시리즈가 주어져도 창은 고정입니다.
pub fn atr(bars: &[DailyBar], period: usize) -> IndicatorResult<Decimal> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter("period는 1 이상이어야 합니다".into()));
    }
    let required = period + 1;
    if bars.len() < required {
        return Err(IndicatorError::InsufficientData {
            required,
            provided: bars.len(),
        });
    }

    let mut sum = Decimal::ZERO;
    for i in 0..period {
        // 최신-우선이므로 직전 봉은 i+1
        sum += bars[i].true_range(bars[i + 1].close);
    }
    Ok(sum / Decimal::from(period as u64))
}

/// 당일 봉을 제외한 구간 고가 최댓값.
fn window_high(bars: &[DailyBar], window: usize) -> IndicatorResult<Price> {
    require(bars, window + 1)?;
    bars[1..=window]
        .iter()
        .map(|b| b.high)
        .max()
        .ok_or(IndicatorError::InvalidParameter("빈 구간".into()))
}

/// 당일 봉을 제외한 구간 저가 최솟값.
fn window_low(bars: &[DailyBar], window: usize) -> IndicatorResult<Price> {
    require(bars, window + 1)?;
    bars[1..=window]
        .iter()
        .map(|b| b.low)
        .min()
        .ok_or(IndicatorError::InvalidParameter("빈 구간".into()))
}

fn require(bars: &[DailyBar], required: usize) -> IndicatorResult<()> {
    if bars.len() < required {
        return Err(IndicatorError::InsufficientData {
            required,
            provided: bars.len(),
        });
    }
    Ok(())
}

/// 20일 평균 대비 당일 거래량 배수.
fn volume_ratio(bars: &[DailyBar]) -> IndicatorResult<f64> {
    require(bars, 21)?;
    let avg: f64 = bars[1..=20].iter().map(|b| b.volume as f64).sum::<f64>() / 20.0;
    if avg <= 0.0 {
        return Ok(0.0);
    }
    Ok(bars[0].volume as f64 / avg)
}

/// 최신-우선 시리즈에서 지표 묶음을 계산합니다. 21개 이상의 봉이
/// 필요합니다.
pub fn snapshot(bars: &[DailyBar]) -> IndicatorResult<IndicatorSnapshot> {
    Ok(IndicatorSnapshot {
        atr: atr(bars, 20)?,
        high20: window_high(bars, 20)?,
        low10: window_low(bars, 10)?,
        low20: window_low(bars, 20)?,
        volume_ratio: volume_ratio(bars)?,
        high52w: None,
        low52w: None,
    })
}

/// 손익률(%)을 계산합니다.
pub fn pl_rate(avg_price: Decimal, current_price: Decimal) -> f64 {
    if avg_price <= Decimal::ZERO {
        return 0.0;
    }
    ((current_price - avg_price) / avg_price * Decimal::from(100))
        .round_dp(2)
        .to_f64()
        .unwrap_or(0.0)
}

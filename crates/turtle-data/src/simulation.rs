//! 합성 일봉 시뮬레이션.
//!
//! 모든 실데이터 티어가 실패했을 때의 최종 폴백입니다.
//! 30% 확률로 요청 구간의 70% 지점부터 돌파 패턴을 주입하고,
//! 그 외에는 약한 하락 편향의 랜덤워크를 생성합니다.
//! 마지막 봉의 종가는 해석된 현재가에 고정됩니다.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use turtle_core::{DailyBar, StockCode};

/// 합성 일봉 시리즈를 생성합니다 (과거→최신 순).
///
/// `pin_close`는 해석된 현재가로, 마지막 봉의 종가로 고정됩니다.
pub fn synthetic_series(code: &StockCode, days: usize, pin_close: Decimal) -> Vec<DailyBar> {
    let mut rng = rand::thread_rng();
    let current_price: f64 = pin_close.try_into().unwrap_or(50_000.0);

    // 터틀 신호 검증을 위해 30% 확률로 돌파 패턴 주입
    let generate_breakout = rng.gen::<f64>() < 0.3;
    let breakout_day = (days as f64 * 0.7).floor() as usize;

    let today = chrono::Utc::now().date_naive();
    let mut bars = Vec::with_capacity(days);

    for i in 0..days {
        let date = today - Duration::days((days - 1 - i) as i64);

        let day_price = if generate_breakout && i >= breakout_day {
            // 돌파 패턴: 85% 기준가에서 일당 ~2%씩 점진 상승
            let base_price = current_price * 0.85;
            let breakout_boost = 1.0 + (i - breakout_day) as f64 * 0.02;
            (base_price * breakout_boost).round()
        } else {
            // 횡보/약한 하락 편향 랜덤워크
            let trend_factor = 1.0 + (rng.gen::<f64>() - 0.6) * 0.02;
            (current_price * trend_factor * (0.95 + i as f64 * 0.001)).round()
        };

        // 1.5~3% 일중 변동성
        let volatility = 0.015 + rng.gen::<f64>() * 0.015;
        let high = (day_price * (1.0 + volatility)).round();
        let low = (day_price * (1.0 - volatility)).round();
        let open = low + ((high - low) * rng.gen::<f64>()).round();

        bars.push(DailyBar {
            code: code.clone(),
            date,
            open: to_decimal(open),
            high: to_decimal(high),
            low: to_decimal(low),
            close: to_decimal(day_price),
            volume: rng.gen_range(500_000..=3_500_000),
        });
    }

    if let Some(last) = bars.last_mut() {
        last.close = pin_close;
    }

    bars
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

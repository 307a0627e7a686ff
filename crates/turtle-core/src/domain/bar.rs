//! 일봉(OHLCV) 데이터 구조체.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::StockCode;

/// 가격 타입. 금액 연산의 정밀도를 위해 Decimal을 사용합니다.
pub type Price = Decimal;

/// 일봉 하나.
///
/// 시퀀스 정렬 방향은 소스마다 다르며(차트 API는 과거→최신),
/// 지표 계산 전에 최신-우선(most-recent-first)으로 정규화합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 종목 코드
    pub code: StockCode,
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: i64,
}

impl DailyBar {
    /// 당일 변동폭 (고가 - 저가).
    pub fn range(&self) -> Price {
        self.high - self.low
    }

    /// 양봉 여부.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 직전 종가 대비 실질 변동폭(True Range).
    ///
    /// TR = max(고가-저가, |고가-직전종가|, |저가-직전종가|)
    pub fn true_range(&self, prev_close: Price) -> Price {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(open: Price, high: Price, low: Price, close: Price) -> DailyBar {
        DailyBar {
            code: StockCode::new_unchecked("005930"),
            date: NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1_000_000,
        }
    }

    #[test]
    fn test_true_range_uses_widest_span() {
        let b = bar(dec!(100), dec!(110), dec!(95), dec!(105));
        // 갭 없는 경우: 고가-저가
        assert_eq!(b.true_range(dec!(102)), dec!(15));
        // 갭 상승: |고가-직전종가|가 아닌 |저가-직전종가|가 최대
        assert_eq!(b.true_range(dec!(130)), dec!(35));
    }

    #[test]
    fn test_bullish() {
        assert!(bar(dec!(100), dec!(110), dec!(95), dec!(105)).is_bullish());
        assert!(!bar(dec!(105), dec!(110), dec!(95), dec!(100)).is_bullish());
    }
}

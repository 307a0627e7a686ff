//! 터틀 돌파 시그널 엔진.
//!
//! System 1 돌파 판정(20일 고점/10일 저점)과 리스크 기반 포지션
//! 사이징, 보유 포지션 매도 조건 판정을 담당합니다.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use turtle_core::{
    Price, Provenance, RecommendedAction, SellUrgency, Signal, SignalKind, StockCode,
};

use crate::indicators::IndicatorSnapshot;

/// 매도 조건 판정 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellCheck {
    pub urgency: SellUrgency,
    pub reason: String,
}

/// 터틀 분석기.
#[derive(Debug, Clone)]
pub struct TurtleAnalyzer {
    investment_budget: Decimal,
}

impl TurtleAnalyzer {
    /// 투자 예산(원)으로 분석기를 생성합니다.
    pub fn new(investment_budget: Decimal) -> Self {
        Self { investment_budget }
    }

    /// 돌파 여부를 판정해 시그널을 생성합니다.
    ///
    /// 엄격 부등호를 사용합니다: 현재가가 high20과 정확히 같으면
    /// 돌파가 아닙니다. 매수 판정이 매도 판정보다 먼저이며, 하나의
    /// 분석에서 시그널은 최대 1개입니다.
    pub fn analyze(
        &self,
        code: &StockCode,
        name: &str,
        date: NaiveDate,
        current_price: Price,
        snapshot: &IndicatorSnapshot,
        provenance: Provenance,
    ) -> Option<Signal> {
        let (kind, breakout_price) = if current_price > snapshot.high20 {
            (SignalKind::Buy20, snapshot.high20)
        } else if current_price < snapshot.low10 {
            (SignalKind::Sell10, snapshot.low10)
        } else {
            return None;
        };

        debug!(
            symbol = %code,
            kind = kind.as_str(),
            %current_price,
            %breakout_price,
            "돌파 시그널 감지"
        );

        let mut signal = Signal::new(code.clone(), name, date, kind, current_price, breakout_price)
            .with_volume_ratio(snapshot.volume_ratio)
            .with_provenance(provenance);

        if kind.is_buy() {
            if let Some(action) = self.recommended_action(current_price, snapshot.atr) {
                signal = signal.with_action(action);
            }
        }

        Some(signal)
    }

    /// 매수 시그널에 딸린 권장 액션을 계산합니다.
    ///
    /// 리스크 예산은 총 예산의 2%, 손절 거리는 2N(=2×ATR)입니다.
    /// ATR이 0 이하이면 사이징이 불가능하므로 None을 반환합니다.
    pub fn recommended_action(&self, price: Price, atr: Decimal) -> Option<RecommendedAction> {
        if atr <= Decimal::ZERO {
            return None;
        }

        // 리스크 한도는 총 예산의 2%
        let risk_budget = self.investment_budget * Decimal::new(2, 2);
        let stop_distance = atr * Decimal::from(2);
        let quantity = (risk_budget / stop_distance).floor();
        let quantity_i64 = quantity.to_i64()?;

        Some(RecommendedAction {
            quantity: quantity_i64,
            stop_loss_price: (price - stop_distance).round_dp(0),
            risk_budget,
            actual_risk: quantity * stop_distance,
            profit_1n: quantity * atr,
            profit_2n: quantity * stop_distance,
        })
    }

    /// 보유 포지션의 매도 조건을 우선순위대로 판정합니다.
    ///
    /// 1. 손실 -20% 초과 → URGENT
    /// 2. 10일 저점 이탈 (System 1 청산) → HIGH
    /// 3. 52주 저점 이탈 (System 2 청산) → HIGH
    /// 4. 손실 -10% 초과 → MEDIUM
    pub fn check_sell(
        &self,
        pl_rate: f64,
        current_price: Price,
        low10: Price,
        low_52w: Option<Price>,
    ) -> Option<SellCheck> {
        if pl_rate < -20.0 {
            return Some(SellCheck {
                urgency: SellUrgency::Urgent,
                reason: format!("손실 {pl_rate:.2}%로 -20% 한도 초과, 즉시 청산"),
            });
        }
        if current_price < low10 {
            return Some(SellCheck {
                urgency: SellUrgency::High,
                reason: format!("10일 저점({low10}) 이탈, System 1 청산"),
            });
        }
        if let Some(low) = low_52w {
            if current_price < low {
                return Some(SellCheck {
                    urgency: SellUrgency::High,
                    reason: format!("52주 저점({low}) 이탈, System 2 청산"),
                });
            }
        }
        if pl_rate < -10.0 {
            return Some(SellCheck {
                urgency: SellUrgency::Medium,
                reason: format!("손실 {pl_rate:.2}%로 -10% 한도 초과, 청산 검토"),
            });
        }
        None
    }
}

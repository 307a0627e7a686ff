//! 보유 포지션 추적 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::StockCode;

/// 증권사가 보고한 보유 종목.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerPosition {
    /// 종목 코드
    pub code: StockCode,
    /// 종목명
    pub name: String,
    /// 보유 수량
    pub quantity: i64,
    /// 평균 매입가
    pub avg_price: Decimal,
    /// 현재가
    pub current_price: Decimal,
    /// 평가 손익 (원)
    pub unrealized_pl: Decimal,
    /// 손익률 (%)
    pub pl_rate: f64,
}

/// 터틀 전략 기준으로 추적되는 포지션.
///
/// 최초 동기화 때 지연 생성되며, 이후 동기화마다 수량/가격/손익을
/// 갱신합니다. 소유권은 PortfolioTracker의 인메모리 맵에 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurtlePosition {
    /// 종목 코드
    pub code: StockCode,
    /// 종목명
    pub name: String,
    /// 보유 수량
    pub quantity: i64,
    /// 평균 매입가
    pub avg_price: Decimal,
    /// 현재가
    pub current_price: Decimal,
    /// 최초 진입가 (생성 시 평균 매입가로 가정)
    pub original_entry_price: Decimal,
    /// 진입 시점 N값 (ATR, 원 단위 반올림)
    pub original_n: Decimal,
    /// 현재 유닛 수
    pub current_units: u32,
    /// 최대 유닛 수
    pub max_units: u32,
    /// 손절가 = 평균 매입가 - 2N
    pub stop_loss_price: Decimal,
    /// 다음 추가 매수가 (최대 유닛 도달 시 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_add_price: Option<Decimal>,
    /// 리스크 금액 = 수량 × 2N
    pub risk_amount: Decimal,
    /// 리스크 비율 (%) = 2N / 평균 매입가 × 100
    pub risk_percent: f64,
    /// 평가 손익
    pub unrealized_pl: Decimal,
    /// 직전 동기화 대비 수량 변경 여부
    pub quantity_changed: bool,
    /// 마지막 동기화 시각
    pub synced_at: DateTime<Utc>,
}

/// 매도 조건 판정의 긴급도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SellUrgency {
    /// 즉시 청산 (손실 -20% 초과)
    Urgent,
    /// 높음 (돌파 이탈)
    High,
    /// 중간 (손실 -10% 초과)
    Medium,
}

/// 전체 포지션 리스크 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    /// 추적 중인 포지션 수
    pub position_count: usize,
    /// 리스크 금액 합계 (원)
    pub total_risk_amount: Decimal,
    /// 평균 리스크 비율 (%)
    pub avg_risk_percent: f64,
}

impl RiskSummary {
    /// 빈 요약.
    pub fn empty() -> Self {
        Self {
            position_count: 0,
            total_risk_amount: Decimal::ZERO,
            avg_risk_percent: 0.0,
        }
    }
}

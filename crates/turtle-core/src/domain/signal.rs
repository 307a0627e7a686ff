//! 터틀 시그널 및 권장 액션.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::provenance::Provenance;
use crate::types::StockCode;

/// 시그널 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// 20일 고점 돌파 매수 (System 1)
    #[serde(rename = "BUY_20")]
    Buy20,
    /// 10일 저점 이탈 매도 (System 1)
    #[serde(rename = "SELL_10")]
    Sell10,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Buy20 => "BUY_20",
            SignalKind::Sell10 => "SELL_10",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, SignalKind::Buy20)
    }
}

/// 시그널 강도. 20일 평균 거래량 대비 배수로 판정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Weak,
    Medium,
    Strong,
}

impl SignalStrength {
    /// 거래량 배수로 강도를 판정합니다 (≥2.0 strong, ≥1.5 medium).
    pub fn from_volume_ratio(ratio: f64) -> Self {
        if ratio >= 2.0 {
            SignalStrength::Strong
        } else if ratio >= 1.5 {
            SignalStrength::Medium
        } else {
            SignalStrength::Weak
        }
    }
}

/// 매수 시그널에 딸린 리스크 기반 권장 액션.
///
/// 총 예산의 2%를 리스크 한도로, 2N(=2×ATR)을 손절 거리로 사용합니다.
/// 매도 시그널은 전량 청산을 가정하므로 액션을 갖지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedAction {
    /// 권장 수량 = floor(리스크 예산 / 손절 거리)
    pub quantity: i64,
    /// 손절가 = 현재가 - 2N
    pub stop_loss_price: Decimal,
    /// 리스크 예산 (예산의 2%)
    pub risk_budget: Decimal,
    /// 실제 리스크 = 수량 × 손절 거리
    pub actual_risk: Decimal,
    /// 1N 상승 시 예상 수익
    pub profit_1n: Decimal,
    /// 2N 상승 시 예상 수익
    pub profit_2n: Decimal,
}

/// 돌파 시그널.
///
/// 같은 날 재분석하면 그 날짜의 시그널 집합을 대체합니다(추가 아님).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// 시그널 식별자
    pub id: Uuid,
    /// 종목 코드
    pub code: StockCode,
    /// 종목명
    pub name: String,
    /// 시그널 발생일
    pub date: NaiveDate,
    /// 시그널 종류
    pub kind: SignalKind,
    /// 현재가
    pub current_price: Decimal,
    /// 돌파 기준가 (high20 또는 low10)
    pub breakout_price: Decimal,
    /// 강도
    pub strength: SignalStrength,
    /// 20일 평균 대비 거래량 배수
    pub volume_ratio: f64,
    /// 권장 액션 (매수 시그널 전용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RecommendedAction>,
    /// 가격 데이터 출처
    pub provenance: Provenance,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// 새 시그널을 생성합니다.
    pub fn new(
        code: StockCode,
        name: impl Into<String>,
        date: NaiveDate,
        kind: SignalKind,
        current_price: Decimal,
        breakout_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name: name.into(),
            date,
            kind,
            current_price,
            breakout_price,
            strength: SignalStrength::Weak,
            volume_ratio: 0.0,
            action: None,
            provenance: Provenance::Real,
            created_at: Utc::now(),
        }
    }

    /// 거래량 배수와 그에 따른 강도를 설정합니다.
    pub fn with_volume_ratio(mut self, ratio: f64) -> Self {
        self.volume_ratio = ratio;
        self.strength = SignalStrength::from_volume_ratio(ratio);
        self
    }

    /// 권장 액션을 설정합니다.
    pub fn with_action(mut self, action: RecommendedAction) -> Self {
        self.action = Some(action);
        self
    }

    /// 출처 태그를 설정합니다.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// 중복 제거/대체에 사용하는 자연 키 (종목, 종류, 날짜).
    pub fn natural_key(&self) -> (StockCode, SignalKind, NaiveDate) {
        (self.code.clone(), self.kind, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_strength_from_volume_ratio() {
        assert_eq!(SignalStrength::from_volume_ratio(2.5), SignalStrength::Strong);
        assert_eq!(SignalStrength::from_volume_ratio(2.0), SignalStrength::Strong);
        assert_eq!(SignalStrength::from_volume_ratio(1.7), SignalStrength::Medium);
        assert_eq!(SignalStrength::from_volume_ratio(1.2), SignalStrength::Weak);
    }

    #[test]
    fn test_signal_builder() {
        let signal = Signal::new(
            StockCode::new_unchecked("005930"),
            "삼성전자",
            NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(),
            SignalKind::Buy20,
            dec!(71200),
            dec!(70500),
        )
        .with_volume_ratio(2.1)
        .with_provenance(Provenance::Broker);

        assert_eq!(signal.strength, SignalStrength::Strong);
        assert_eq!(signal.provenance, Provenance::Broker);
        assert!(signal.action.is_none());
    }

    #[test]
    fn test_signal_kind_wire_format() {
        assert_eq!(serde_json::to_string(&SignalKind::Buy20).unwrap(), "\"BUY_20\"");
        assert_eq!(serde_json::to_string(&SignalKind::Sell10).unwrap(), "\"SELL_10\"");
    }
}

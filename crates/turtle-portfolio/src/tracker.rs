//! 포트폴리오 추적기.
//!
//! 진실의 원천은 증권사 계좌입니다. 동기화마다 증권사 보유 내역을
//! 받아 터틀 파생값(N, 손절가, 추가 매수가, 리스크)을 다시 계산하고,
//! 증권사에 없는 포지션은 제거합니다. N값을 계산할 일봉이 부족한
//! 종목은 건너뛰고 보고서에 기록합니다.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use turtle_core::{BrokerPosition, RiskSummary, StockCode, TurtlePosition};

/// 종목당 최대 유닛 수.
const MAX_UNITS: u32 = 4;

/// 동기화 결과 보고서.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// 갱신/생성된 포지션 수
    pub synced: usize,
    /// 제거된 포지션 수 (증권사 계좌에 더 이상 없음)
    pub removed: usize,
    /// 건너뛴 종목과 사유
    pub skipped: Vec<(StockCode, String)>,
}

/// 터틀 포트폴리오 추적기.
pub struct PortfolioTracker {
    positions: RwLock<HashMap<StockCode, TurtlePosition>>,
}

impl PortfolioTracker {
    pub fn new() -> Self {
        Self {
            positions: RwLock::new(HashMap::new()),
        }
    }

    /// 증권사 보유 내역과 종목별 N값(ATR)으로 추적 상태를 동기화합니다.
    ///
    /// `atr_by_code`에 없는 종목은 파생값 계산이 불가능하므로
    /// 건너뜁니다. 기존에 추적 중이던 포지션의 최초 진입가와 진입
    /// 시점 N값은 보존됩니다.
    pub async fn sync(
        &self,
        holdings: &[BrokerPosition],
        atr_by_code: &HashMap<StockCode, Decimal>,
    ) -> SyncReport {
        let mut positions = self.positions.write().await;
        let mut report = SyncReport {
            synced: 0,
            removed: 0,
            skipped: Vec::new(),
        };

        for holding in holdings {
            if holding.quantity <= 0 {
                continue;
            }
            let Some(atr) = atr_by_code.get(&holding.code) else {
                warn!(symbol = %holding.code, "N값 없음, 포지션 동기화 건너뜀");
                report
                    .skipped
                    .push((holding.code.clone(), "N값 계산 불가 (일봉 부족)".to_string()));
                continue;
            };

            let prior = positions.get(&holding.code);
            let next = derive_position(holding, *atr, prior);
            debug!(
                symbol = %holding.code,
                quantity = next.quantity,
                stop_loss = %next.stop_loss_price,
                units = next.current_units,
                "포지션 동기화"
            );
            positions.insert(holding.code.clone(), next);
            report.synced += 1;
        }

        // 증권사 계좌에 없는 포지션은 청산된 것으로 간주
        let held: Vec<StockCode> = holdings
            .iter()
            .filter(|h| h.quantity > 0)
            .map(|h| h.code.clone())
            .collect();
        let before = positions.len();
        positions.retain(|code, _| held.contains(code));
        report.removed = before - positions.len();

        info!(
            synced = report.synced,
            removed = report.removed,
            skipped = report.skipped.len(),
            "포트폴리오 동기화 완료"
        );
        report
    }

    /// 추적 중인 전체 포지션 (종목 코드 순).
    pub async fn positions(&self) -> Vec<TurtlePosition> {
        let positions = self.positions.read().await;
        let mut list: Vec<TurtlePosition> = positions.values().cloned().collect();
        list.sort_by(|a, b| a.code.as_str().cmp(b.code.as_str()));
        list
    }

    /// 종목별 포지션 조회.
    pub async fn get(&self, code: &StockCode) -> Option<TurtlePosition> {
        self.positions.read().await.get(code).cloned()
    }

    /// 전체 포지션 리스크 요약.
    pub async fn risk_summary(&self) -> RiskSummary {
        let positions = self.positions.read().await;
        if positions.is_empty() {
            return RiskSummary::empty();
        }
        let total_risk_amount: Decimal = positions.values().map(|p| p.risk_amount).sum();
        let avg_risk_percent = positions.values().map(|p| p.risk_percent).sum::<f64>()
            / positions.len() as f64;
        RiskSummary {
            position_count: positions.len(),
            total_risk_amount,
            avg_risk_percent: (avg_risk_percent * 100.0).round() / 100.0,
        }
    }
}

impl Default for PortfolioTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// 증권사 보고값과 N값으로 터틀 파생값을 계산합니다.
///
/// 최초 생성 시 최초 진입가는 평균 매입가로, 유닛 수는 1로
/// 가정합니다. 이후 동기화에서 수량이 늘었으면 유닛을 1 증가시키고
/// (최대 4), 진입 시점 값들은 유지합니다.
fn derive_position(
    holding: &BrokerPosition,
    atr: Decimal,
    prior: Option<&TurtlePosition>,
) -> TurtlePosition {
    let (original_entry_price, original_n, current_units, quantity_changed) = match prior {
        Some(prev) => {
            let changed = prev.quantity != holding.quantity;
            let units = if holding.quantity > prev.quantity {
                (prev.current_units + 1).min(MAX_UNITS)
            } else {
                prev.current_units
            };
            (prev.original_entry_price, prev.original_n, units, changed)
        }
        None => (holding.avg_price, atr.round_dp(0), 1, false),
    };

    let two_n = original_n * Decimal::from(2);
    let half_n = original_n / Decimal::from(2);

    let next_add_price = if current_units < MAX_UNITS {
        Some(
            (original_entry_price + half_n * Decimal::from(current_units)).round_dp(0),
        )
    } else {
        None
    };

    let risk_percent = if holding.avg_price > Decimal::ZERO {
        (two_n / holding.avg_price * Decimal::from(100))
            .round_dp(2)
            .to_f64()
            .unwrap_or(0.0)
    } else {
        0.0
    };

    TurtlePosition {
        code: holding.code.clone(),
        name: holding.name.clone(),
        quantity: holding.quantity,
        avg_price: holding.avg_price,
        current_price: holding.current_price,
        original_entry_price,
        original_n,
        current_units,
        max_units: MAX_UNITS,
        stop_loss_price: (holding.avg_price - two_n).round_dp(0),
        next_add_price,
        risk_amount: Decimal::from(holding.quantity) * two_n,
        risk_percent,
        unrealized_pl: holding.unrealized_pl,
        quantity_changed,
        synced_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holding(code: &str, quantity: i64, avg: Decimal, current: Decimal) -> BrokerPosition {
        BrokerPosition {
            code: StockCode::new_unchecked(code),
            name: "테스트종목".to_string(),
            quantity,
            avg_price: avg,
            current_price: current,
            unrealized_pl: (current - avg) * Decimal::from(quantity),
            pl_rate: 0.0,
        }
    }

    fn atr_map(entries: &[(&str, Decimal)]) -> HashMap<StockCode, Decimal> {
        entries
            .iter()
            .map(|(code, atr)| (StockCode::new_unchecked(*code), *atr))
            .collect()
    }

    #[tokio::test]
    async fn test_sync_creates_position_with_derived_values() {
        let tracker = PortfolioTracker::new();
        let atrs = atr_map(&[("005930", dec!(1000))]);

        let report = tracker
            .sync(&[holding("005930", 10, dec!(70000), dec!(71200))], &atrs)
            .await;
        assert_eq!(report.synced, 1);
        assert!(report.skipped.is_empty());

        let pos = tracker
            .get(&StockCode::new_unchecked("005930"))
            .await
            .unwrap();
        assert_eq!(pos.original_entry_price, dec!(70000));
        assert_eq!(pos.original_n, dec!(1000));
        assert_eq!(pos.current_units, 1);
        assert_eq!(pos.stop_loss_price, dec!(68000)); // 평균가 - 2N
        assert_eq!(pos.next_add_price, Some(dec!(70500))); // 진입가 + 0.5N×1
        assert_eq!(pos.risk_amount, dec!(20000)); // 10 × 2,000
        assert_eq!(pos.risk_percent, 2.86); // 2,000 / 70,000 × 100
        assert!(!pos.quantity_changed);
    }

    #[tokio::test]
    async fn test_resync_preserves_entry_and_detects_quantity_change() {
        let tracker = PortfolioTracker::new();
        let atrs = atr_map(&[("005930", dec!(1000))]);

        tracker
            .sync(&[holding("005930", 10, dec!(70000), dec!(71200))], &atrs)
            .await;
        // 추가 매수로 수량/평균가 변경, ATR도 변동
        let atrs2 = atr_map(&[("005930", dec!(1500))]);
        tracker
            .sync(&[holding("005930", 20, dec!(70300), dec!(71000))], &atrs2)
            .await;

        let pos = tracker
            .get(&StockCode::new_unchecked("005930"))
            .await
            .unwrap();
        // 진입 시점 값은 보존
        assert_eq!(pos.original_entry_price, dec!(70000));
        assert_eq!(pos.original_n, dec!(1000));
        assert_eq!(pos.current_units, 2);
        assert!(pos.quantity_changed);
        // 손절가는 현재 평균가 기준으로 재계산
        assert_eq!(pos.stop_loss_price, dec!(68300));
        // 다음 추가 매수가 = 진입가 + 0.5N×2
        assert_eq!(pos.next_add_price, Some(dec!(71000)));
    }

    #[tokio::test]
    async fn test_max_units_stops_pyramiding() {
        let tracker = PortfolioTracker::new();
        let atrs = atr_map(&[("005930", dec!(1000))]);

        let mut quantity = 10;
        for _ in 0..5 {
            tracker
                .sync(&[holding("005930", quantity, dec!(70000), dec!(71000))], &atrs)
                .await;
            quantity += 10;
        }

        let pos = tracker
            .get(&StockCode::new_unchecked("005930"))
            .await
            .unwrap();
        assert_eq!(pos.current_units, 4);
        assert_eq!(pos.next_add_price, None);
    }

    #[tokio::test]
    async fn test_sync_removes_closed_and_skips_without_atr() {
        let tracker = PortfolioTracker::new();
        let atrs = atr_map(&[("005930", dec!(1000)), ("000660", dec!(2500))]);

        tracker
            .sync(
                &[
                    holding("005930", 10, dec!(70000), dec!(71000)),
                    holding("000660", 5, dec!(120000), dec!(127000)),
                ],
                &atrs,
            )
            .await;

        // 005930 청산, 035420은 N값 없음
        let report = tracker
            .sync(
                &[
                    holding("000660", 5, dec!(120000), dec!(127000)),
                    holding("035420", 3, dec!(150000), dec!(152000)),
                ],
                &atrs,
            )
            .await;

        assert_eq!(report.synced, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0.as_str(), "035420");

        let positions = tracker.positions().await;
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].code.as_str(), "000660");
    }

    #[tokio::test]
    async fn test_risk_summary() {
        let tracker = PortfolioTracker::new();
        assert_eq!(tracker.risk_summary().await.position_count, 0);

        let atrs = atr_map(&[("005930", dec!(1000)), ("000660", dec!(2500))]);
        tracker
            .sync(
                &[
                    holding("005930", 10, dec!(70000), dec!(71000)),
                    holding("000660", 5, dec!(120000), dec!(127000)),
                ],
                &atrs,
            )
            .await;

        let summary = tracker.risk_summary().await;
        assert_eq!(summary.position_count, 2);
        // 10×2,000 + 5×5,000
        assert_eq!(summary.total_risk_amount, dec!(45000));
        // (2.86 + 4.17) / 2
        assert!((summary.avg_risk_percent - 3.51).abs() < 0.02);
    }
}

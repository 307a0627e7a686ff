//! 스냅샷/시그널 저장소 트레이트.
//!
//! 영속 계층은 외부 협력자의 몫이므로 여기서는 자연 키 기반
//! 생성/대체와 조회 계약만 정의하고, 인메모리 구현을 제공합니다.
//! 동시 수집 실행 간 조정은 하지 않습니다 (last-writer-wins).

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

use turtle_core::{FinancialSnapshot, Signal, StockCode};

/// 연간 재무 스냅샷 저장소.
///
/// 자연 키는 (종목 코드, 회계연도)이며 upsert로 키당 한 건을 유지합니다.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 키로 스냅샷을 조회합니다.
    async fn find(&self, code: &StockCode, data_year: i32) -> Option<FinancialSnapshot>;

    /// 스냅샷을 저장하거나 대체합니다.
    async fn upsert(&self, snapshot: FinancialSnapshot);

    /// 해당 수집 연도에 신선한 스냅샷이 있는지 확인합니다.
    async fn exists_fresh(&self, code: &StockCode, data_year: i32, collected_year: i32) -> bool;

    /// 기준 연도 미만의 스냅샷을 삭제하고 삭제 건수를 반환합니다.
    async fn delete_older_than(&self, cutoff_year: i32) -> usize;

    /// 회계연도별 스냅샷 건수.
    async fn count_by_year(&self) -> HashMap<i32, usize>;
}

/// 시그널 저장소.
///
/// 같은 날짜의 재분석은 그 날짜의 시그널 집합을 대체합니다.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// 해당 날짜의 시그널을 전부 교체합니다.
    async fn replace_day(&self, date: NaiveDate, signals: Vec<Signal>);

    /// 해당 날짜의 시그널을 조회합니다.
    async fn find_by_date(&self, date: NaiveDate) -> Vec<Signal>;

    /// 최근 시그널 `limit`개를 조회합니다 (최신순).
    async fn latest(&self, limit: usize) -> Vec<Signal>;
}

/// 인메모리 스냅샷 저장소.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<HashMap<(String, i32), FinancialSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn find(&self, code: &StockCode, data_year: i32) -> Option<FinancialSnapshot> {
        let inner = self.inner.read().await;
        inner.get(&(code.as_str().to_string(), data_year)).cloned()
    }

    async fn upsert(&self, snapshot: FinancialSnapshot) {
        let mut inner = self.inner.write().await;
        inner.insert(
            (snapshot.code.as_str().to_string(), snapshot.data_year),
            snapshot,
        );
    }

    async fn exists_fresh(&self, code: &StockCode, data_year: i32, collected_year: i32) -> bool {
        let inner = self.inner.read().await;
        inner
            .get(&(code.as_str().to_string(), data_year))
            .is_some_and(|s| s.is_fresh(collected_year))
    }

    async fn delete_older_than(&self, cutoff_year: i32) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.len();
        inner.retain(|(_, year), _| *year >= cutoff_year);
        before - inner.len()
    }

    async fn count_by_year(&self) -> HashMap<i32, usize> {
        let inner = self.inner.read().await;
        let mut counts = HashMap::new();
        for (_, year) in inner.keys() {
            *counts.entry(*year).or_insert(0) += 1;
        }
        counts
    }
}

/// 인메모리 시그널 저장소.
#[derive(Debug, Default)]
pub struct MemorySignalStore {
    inner: RwLock<Vec<Signal>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn replace_day(&self, date: NaiveDate, signals: Vec<Signal>) {
        let mut inner = self.inner.write().await;
        inner.retain(|s| s.date != date);
        inner.extend(signals);
    }

    async fn find_by_date(&self, date: NaiveDate) -> Vec<Signal> {
        let inner = self.inner.read().await;
        inner.iter().filter(|s| s.date == date).cloned().collect()
    }

    async fn latest(&self, limit: usize) -> Vec<Signal> {
        let inner = self.inner.read().await;
        let mut signals: Vec<Signal> = inner.clone();
        signals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        signals.truncate(limit);
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use turtle_core::{Provenance, SignalKind};

    fn snapshot(code: &str, data_year: i32, collected_year: i32) -> FinancialSnapshot {
        FinancialSnapshot {
            code: StockCode::new_unchecked(code),
            company_name: "테스트".to_string(),
            data_year,
            collected_year,
            revenue: dec!(1000),
            net_income: dec!(100),
            shares_outstanding: 1_000_000,
            revenue_growth_3y: 10.0,
            net_income_growth_3y: 12.0,
            provenance: Provenance::Real,
            updated_at: Utc::now(),
        }
    }

    fn signal(code: &str, date: NaiveDate) -> Signal {
        Signal::new(
            StockCode::new_unchecked(code),
            "테스트",
            date,
            SignalKind::Buy20,
            dec!(10000),
            dec!(9900),
        )
    }

    #[tokio::test]
    async fn test_snapshot_upsert_replaces_by_key() {
        let store = MemorySnapshotStore::new();
        store.upsert(snapshot("005930", 2024, 2025)).await;
        store.upsert(snapshot("005930", 2024, 2026)).await;

        let code = StockCode::new("005930").unwrap();
        let found = store.find(&code, 2024).await.unwrap();
        assert_eq!(found.collected_year, 2026);
        assert_eq!(store.count_by_year().await.get(&2024), Some(&1));
    }

    #[tokio::test]
    async fn test_exists_fresh_requires_collection_year() {
        let store = MemorySnapshotStore::new();
        store.upsert(snapshot("005930", 2024, 2025)).await;

        let code = StockCode::new("005930").unwrap();
        assert!(store.exists_fresh(&code, 2024, 2025).await);
        // 수집 연도가 넘어가면 재수집 대상
        assert!(!store.exists_fresh(&code, 2024, 2026).await);
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let store = MemorySnapshotStore::new();
        store.upsert(snapshot("005930", 2022, 2025)).await;
        store.upsert(snapshot("005930", 2023, 2025)).await;
        store.upsert(snapshot("005930", 2024, 2025)).await;

        let deleted = store.delete_older_than(2023).await;
        assert_eq!(deleted, 1);
        assert!(store
            .find(&StockCode::new("005930").unwrap(), 2022)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_replace_day_semantics() {
        let store = MemorySignalStore::new();
        let day = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let other_day = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();

        store
            .replace_day(day, vec![signal("005930", day), signal("000660", day)])
            .await;
        store.replace_day(other_day, vec![signal("035420", other_day)]).await;
        // 재분석: 그 날짜만 대체
        store.replace_day(day, vec![signal("005930", day)]).await;

        assert_eq!(store.find_by_date(day).await.len(), 1);
        assert_eq!(store.find_by_date(other_day).await.len(), 1);
    }
}

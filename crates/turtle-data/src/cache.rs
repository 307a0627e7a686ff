//! 연간 재무 스냅샷 캐시.
//!
//! 수집 연도 기준으로 신선한 스냅샷이 있으면 저장소에서 반환하고,
//! 없으면 레지스트리에서 3개년 재무제표와 상장주식수를 가져와
//! 최근 3개 회계연도 행으로 저장합니다. 과거 연도 행에는 최신
//! 수치로 계산한 성장률을 그대로 싣습니다 (과거 연도를 개별
//! 재계산하지 않는 단순화).

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use turtle_core::{growth_rate, FinancialSnapshot, FiscalCalendar, Provenance, StockCode};

use crate::error::{DataError, Result};
use crate::provider::RegistryClient;
use crate::store::SnapshotStore;

/// 벌크 수집 결과 통계.
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    /// 요청 종목 수
    pub total: usize,
    /// 신규 수집 성공
    pub success: usize,
    /// 수집 실패
    pub failed: usize,
    /// 신선한 스냅샷이 있어 건너뜀
    pub skipped: usize,
    /// 실행된 배치 수
    pub batches: usize,
    /// 종목별 오류 메시지
    pub errors: Vec<(String, String)>,
    /// 소요 시간
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 성공률 (%).
    pub fn success_rate(&self) -> f64 {
        let attempted = self.success + self.failed;
        if attempted == 0 {
            return 100.0;
        }
        self.success as f64 / attempted as f64 * 100.0
    }

    /// 수집 결과 요약 로그.
    pub fn log_summary(&self) {
        info!(
            total = self.total,
            success = self.success,
            failed = self.failed,
            skipped = self.skipped,
            batches = self.batches,
            elapsed_secs = self.elapsed.as_secs(),
            "재무데이터 수집 완료 (성공률 {:.1}%)",
            self.success_rate()
        );
        for (code, error) in &self.errors {
            warn!(symbol = %code, error = %error, "수집 실패 종목");
        }
    }
}

/// 캐시 현황.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// 회계연도별 스냅샷 건수 (연도 오름차순)
    pub by_year: Vec<(i32, usize)>,
    /// 전체 건수
    pub total: usize,
}

/// 재무데이터 캐시.
pub struct FinancialDataCache {
    store: Arc<dyn SnapshotStore>,
    registry: Option<Arc<RegistryClient>>,
    batch_delay: Duration,
}

impl FinancialDataCache {
    /// 새 캐시를 생성합니다.
    pub fn new(store: Arc<dyn SnapshotStore>, registry: Option<Arc<RegistryClient>>) -> Self {
        Self {
            store,
            registry,
            batch_delay: Duration::from_secs(2),
        }
    }

    /// 배치 간 딜레이를 설정합니다.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// 종목의 현재 대상 회계연도 스냅샷을 반환합니다.
    ///
    /// 수집 연도 기준으로 신선하면 저장소에서, 아니면 레지스트리에서
    /// 새로 수집합니다.
    pub async fn get(&self, code: &StockCode) -> Result<FinancialSnapshot> {
        self.get_as_of(code, FiscalCalendar::today_seoul()).await
    }

    /// 기준일을 지정한 조회 (테스트/재현용).
    pub async fn get_as_of(&self, code: &StockCode, today: NaiveDate) -> Result<FinancialSnapshot> {
        let target_year = FiscalCalendar::target_year(today);
        let collection_year = FiscalCalendar::collection_year(today);

        if let Some(snapshot) = self.store.find(code, target_year).await {
            if snapshot.is_fresh(collection_year) {
                debug!(symbol = %code, year = target_year, "캐시된 재무데이터 사용");
                return Ok(snapshot);
            }
        }

        self.collect(code, target_year, collection_year).await
    }

    /// 레지스트리에서 수집해 최근 3개 회계연도 행으로 저장합니다.
    async fn collect(
        &self,
        code: &StockCode,
        target_year: i32,
        collection_year: i32,
    ) -> Result<FinancialSnapshot> {
        let registry = self
            .registry
            .as_ref()
            .ok_or_else(|| DataError::NotConfigured("재무정보 레지스트리".to_string()))?;

        let statement = registry.three_year_statement(code, target_year).await?;

        let shares = match registry.shares_outstanding(code, target_year).await {
            Ok(shares) => shares,
            Err(e) => {
                warn!(symbol = %code, error = %e, "상장주식수 조회 실패, 0으로 저장");
                0
            }
        };

        let revenue_history: Vec<f64> = statement
            .revenue
            .iter()
            .map(|v| v.to_f64().unwrap_or(0.0))
            .collect();
        let net_income_history: Vec<f64> = statement
            .net_income
            .iter()
            .map(|v| v.to_f64().unwrap_or(0.0))
            .collect();
        let revenue_growth = growth_rate(&revenue_history);
        let net_income_growth = growth_rate(&net_income_history);

        // 최근 3개 회계연도 행을 최신 성장률로 저장
        let mut latest = None;
        for (i, year) in statement.years.iter().enumerate() {
            let snapshot = FinancialSnapshot {
                code: code.clone(),
                company_name: statement.company_name.clone(),
                data_year: *year,
                collected_year: collection_year,
                revenue: statement.revenue[i],
                net_income: statement.net_income[i],
                shares_outstanding: shares,
                revenue_growth_3y: revenue_growth,
                net_income_growth_3y: net_income_growth,
                provenance: Provenance::Real,
                updated_at: Utc::now(),
            };
            if *year == target_year {
                latest = Some(snapshot.clone());
            }
            self.store.upsert(snapshot).await;
        }

        info!(
            symbol = %code,
            year = target_year,
            revenue_growth = revenue_growth,
            net_income_growth = net_income_growth,
            "재무데이터 수집 완료"
        );

        latest.ok_or_else(|| DataError::NotFound(format!("대상 연도 데이터 없음: {}", code)))
    }

    /// 종목 목록을 배치 단위로 수집합니다.
    ///
    /// 배치 내에서는 동시 요청, 배치 사이에는 고정 딜레이로 제공자
    /// 호출 제한을 준수합니다. 신선한 스냅샷이 있는 종목은 건너뛰고,
    /// 개별 실패는 배치를 중단시키지 않습니다.
    pub async fn bulk_collect(&self, codes: &[StockCode], batch_size: usize) -> CollectionStats {
        self.bulk_collect_as_of(codes, batch_size, FiscalCalendar::today_seoul())
            .await
    }

    /// 기준일을 지정한 벌크 수집.
    pub async fn bulk_collect_as_of(
        &self,
        codes: &[StockCode],
        batch_size: usize,
        today: NaiveDate,
    ) -> CollectionStats {
        let started = Instant::now();
        let batch_size = batch_size.max(1);
        let target_year = FiscalCalendar::target_year(today);
        let collection_year = FiscalCalendar::collection_year(today);

        let mut stats = CollectionStats {
            total: codes.len(),
            ..Default::default()
        };

        let chunks: Vec<&[StockCode]> = codes.chunks(batch_size).collect();
        let chunk_count = chunks.len();
        for (batch_index, chunk) in chunks.into_iter().enumerate() {
            stats.batches += 1;

            let results = join_all(chunk.iter().map(|code| async move {
                if self
                    .store
                    .exists_fresh(code, target_year, collection_year)
                    .await
                {
                    debug!(symbol = %code, "신선한 스냅샷 존재, 건너뜀");
                    return (code.clone(), None);
                }
                let outcome = self.collect(code, target_year, collection_year).await;
                (code.clone(), Some(outcome))
            }))
            .await;

            for (code, outcome) in results {
                match outcome {
                    None => stats.skipped += 1,
                    Some(Ok(_)) => stats.success += 1,
                    Some(Err(e)) => {
                        stats.failed += 1;
                        stats.errors.push((code.to_string(), e.to_string()));
                    }
                }
            }

            if batch_index + 1 < chunk_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        stats.elapsed = started.elapsed();
        stats
    }

    /// 오래된 스냅샷을 정리합니다.
    ///
    /// `collection_year - keep_years` 미만 회계연도의 행을 삭제합니다.
    pub async fn cleanup(&self, keep_years: i32) -> usize {
        self.cleanup_as_of(keep_years, FiscalCalendar::today_seoul())
            .await
    }

    /// 기준일을 지정한 정리.
    pub async fn cleanup_as_of(&self, keep_years: i32, today: NaiveDate) -> usize {
        let cutoff = FiscalCalendar::collection_year(today) - keep_years;
        let deleted = self.store.delete_older_than(cutoff).await;
        info!(cutoff_year = cutoff, deleted = deleted, "오래된 재무데이터 정리 완료");
        deleted
    }

    /// 캐시 현황을 반환합니다.
    pub async fn stats(&self) -> CacheStats {
        let counts = self.store.count_by_year().await;
        let total = counts.values().sum();
        let mut by_year: Vec<(i32, usize)> = counts.into_iter().collect();
        by_year.sort_by_key(|(year, _)| *year);
        CacheStats { by_year, total }
    }
}

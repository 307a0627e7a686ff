//! 애플리케이션 상태.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use turtle_core::AppConfig;
use turtle_data::{
    BrokerClient, ChartProvider, FinancialDataCache, MemorySignalStore, MemorySnapshotStore,
    PriceResolver, RegistryClient, SignalStore, StockNames,
};
use turtle_portfolio::PortfolioTracker;

use crate::services::Orchestrator;

/// 전체 핸들러가 공유하는 애플리케이션 상태.
pub struct AppState {
    /// API 버전
    pub version: String,
    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
    /// 분석 오케스트레이터
    pub orchestrator: Arc<Orchestrator>,
    /// 재무 데이터 캐시
    pub cache: Arc<FinancialDataCache>,
    /// 시그널 저장소
    pub signals: Arc<dyn SignalStore>,
    /// 포트폴리오 추적기
    pub tracker: Arc<PortfolioTracker>,
    /// 외부 자동화 플랫폼용 공유 시크릿
    pub api_secret: Option<String>,
    /// 증권사 설정 여부
    pub has_broker: bool,
    /// 재무정보 레지스트리 설정 여부
    pub has_registry: bool,
}

impl AppState {
    /// 설정에서 상태를 구성합니다.
    ///
    /// 증권사/레지스트리 자격증명이 없으면 해당 컴포넌트 없이
    /// 기동하며, 시세 해석기가 폴백 티어로 동작합니다.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let chart = Arc::new(ChartProvider::new()?);

        let broker = match &config.broker {
            Some(broker_config) => {
                info!("증권사 API 설정 완료");
                Some(Arc::new(BrokerClient::new(broker_config.clone())?))
            }
            None => {
                warn!("증권사 API 미설정, 증권사 티어 없이 기동");
                None
            }
        };

        let registry = match &config.registry {
            Some(registry_config) => {
                info!("재무정보 레지스트리 설정 완료");
                Some(Arc::new(RegistryClient::new(registry_config.clone())?))
            }
            None => {
                warn!("재무정보 레지스트리 미설정, 슈퍼스톡스 검색 제한");
                None
            }
        };
        let has_broker = broker.is_some();
        let has_registry = registry.is_some();

        let resolver = Arc::new(PriceResolver::new(chart, broker.clone()));
        let cache = Arc::new(
            FinancialDataCache::new(Arc::new(MemorySnapshotStore::new()), registry)
                .with_batch_delay(config.analysis.batch_delay()),
        );
        let signals: Arc<dyn SignalStore> = Arc::new(MemorySignalStore::new());
        let tracker = Arc::new(PortfolioTracker::new());

        let orchestrator = Arc::new(Orchestrator::new(
            resolver,
            cache.clone(),
            signals.clone(),
            Arc::new(StockNames::new()),
            broker,
            tracker.clone(),
            config.analysis.clone(),
        ));

        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
            orchestrator,
            cache,
            signals,
            tracker,
            api_secret: config.api.api_secret.clone(),
            has_broker,
            has_registry,
        })
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 네트워크 의존성 없는 테스트용 상태.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    use std::time::Duration;
    use turtle_core::AnalysisConfig;

    let chart = ChartProvider::with_base_url("http://127.0.0.1:9").unwrap();
    let resolver = Arc::new(
        PriceResolver::new(Arc::new(chart), None).with_tier_timeout(Duration::from_millis(200)),
    );
    let cache = Arc::new(
        FinancialDataCache::new(Arc::new(MemorySnapshotStore::new()), None)
            .with_batch_delay(Duration::ZERO),
    );
    let signals: Arc<dyn SignalStore> = Arc::new(MemorySignalStore::new());
    let tracker = Arc::new(PortfolioTracker::new());
    let analysis = AnalysisConfig {
        batch_delay_ms: 0,
        watchlist: Some(vec![turtle_core::StockCode::new_unchecked("005930")]),
        ..AnalysisConfig::default()
    };

    let orchestrator = Arc::new(Orchestrator::new(
        resolver,
        cache.clone(),
        signals.clone(),
        Arc::new(StockNames::new()),
        None,
        tracker.clone(),
        analysis,
    ));

    AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: Utc::now(),
        orchestrator,
        cache,
        signals,
        tracker,
        api_secret: Some("test-secret".to_string()),
        has_broker: false,
        has_registry: false,
    }
}

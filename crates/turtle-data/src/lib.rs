//! # Turtle Data
//!
//! 시세·재무 데이터 수집 계층.
//!
//! - 순위 기반 폴백으로 시세를 해석하는 `PriceResolver`
//! - 증권사/차트/재무 레지스트리 REST 클라이언트
//! - 연간 재무 스냅샷 캐시 (`FinancialDataCache`)
//! - 스냅샷/시그널 저장소 트레이트와 인메모리 구현
//! - 종목명 해석 체인

pub mod cache;
pub mod error;
pub mod names;
pub mod provider;
pub mod resolver;
pub mod simulation;
pub mod store;

pub use cache::{CacheStats, CollectionStats, FinancialDataCache};
pub use error::{DataError, Result};
pub use names::StockNames;
pub use provider::{BrokerClient, ChartProvider, RegistryClient};
pub use resolver::{PriceResolver, ResolvedBars, ResolvedPrice};
pub use store::{MemorySignalStore, MemorySnapshotStore, SignalStore, SnapshotStore};

//! 외부 데이터 제공자 클라이언트.
//!
//! 각 제공자는 PriceResolver/FinancialDataCache의 폴백 티어 하나를
//! 담당합니다. 실패는 에러로 반환하고, 폴백 진행은 호출자가 결정합니다.

pub mod broker;
pub mod chart;
pub mod registry;

pub use broker::{AccountSummary, BrokerClient};
pub use chart::{ChartMeta, ChartProvider};
pub use registry::{RegistryClient, ThreeYearStatement};

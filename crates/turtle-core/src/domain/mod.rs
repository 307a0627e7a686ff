//! 도메인 모델 모듈.

pub mod bar;
pub mod growth;
pub mod position;
pub mod provenance;
pub mod signal;
pub mod snapshot;

pub use bar::{DailyBar, Price};
pub use growth::{growth_rate, round2};
pub use position::{BrokerPosition, RiskSummary, SellUrgency, TurtlePosition};
pub use provenance::Provenance;
pub use signal::{RecommendedAction, Signal, SignalKind, SignalStrength};
pub use snapshot::{FinancialSnapshot, FiscalCalendar, ScreeningCriteria};

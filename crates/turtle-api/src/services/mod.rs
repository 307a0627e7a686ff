//! 분석 오케스트레이션 서비스.

pub mod orchestrator;
pub mod summary;

pub use orchestrator::{
    AnalysisSummary, MakeAnalysisReport, Orchestrator, PortfolioReport, PremiumOpportunity,
    SellAlert, TurtleSection,
};

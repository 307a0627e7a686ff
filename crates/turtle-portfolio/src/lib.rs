//! # Turtle Portfolio
//!
//! 증권사 계좌와 터틀 전략 상태를 대조(reconcile)하는 포트폴리오
//! 추적기. 증권사가 보고하는 보유 내역에 손절가, 추가 매수가,
//! 리스크 지표를 파생해 인메모리로 유지합니다.

pub mod tracker;

pub use tracker::{PortfolioTracker, SyncReport};

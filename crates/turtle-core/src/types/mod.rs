//! 기본 타입 모듈.

pub mod symbol;

pub use symbol::{Market, StockCode};

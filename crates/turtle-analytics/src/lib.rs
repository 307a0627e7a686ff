//! # Turtle Analytics
//!
//! 터틀 돌파 시그널 엔진과 슈퍼스톡스 재무 스크리너.
//!
//! - `indicators`: ATR, 돈치안 채널, 거래량 배수 계산
//! - `turtle`: 돌파 시그널 생성, 리스크 기반 포지션 사이징, 매도 조건 판정
//! - `superstocks`: PSR 계산, 성장률/밸류에이션 점수와 등급

pub mod indicators;
pub mod superstocks;
pub mod turtle;

pub use indicators::{IndicatorError, IndicatorResult, IndicatorSnapshot};
pub use superstocks::{Evaluation, Grade, SuperstocksAnalyzer};
pub use turtle::{SellCheck, TurtleAnalyzer};

//! # Turtle Core
//!
//! 한국 상장 주식 스크리닝 시스템의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 종목 코드 및 시장 구분
//! - 일봉(OHLCV) 데이터 구조체
//! - 터틀 시그널 및 권장 액션
//! - 연간 재무 스냅샷과 회계연도 규칙
//! - 보유 포지션 추적 타입
//! - 데이터 출처(provenance) 등급
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;

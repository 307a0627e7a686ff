//! # Turtle API
//!
//! 터틀 시그널 분석과 슈퍼스톡스 스크리닝을 제공하는 Axum 기반
//! HTTP API 서버.
//!
//! # 엔드포인트
//!
//! - `POST /signals/analyze`: 감시 종목 터틀 돌파 분석
//! - `POST /signals/superstocks-search`: 슈퍼스톡스 조건 검색 (인증 필요)
//! - `POST /signals/make-analysis`: 외부 자동화용 통합 분석 (인증 필요)
//! - `GET /signals/health`: 컴포넌트 상태 확인

pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use error::{ApiErrorResponse, ApiResult};
pub use state::AppState;

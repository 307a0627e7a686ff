//! API 라우트 정의.

pub mod health;
pub mod signals;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// 전체 API 라우터를 생성합니다.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health::health_router())
        .nest("/signals", signals::signals_router())
}

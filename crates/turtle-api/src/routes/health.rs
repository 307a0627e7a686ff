//! 헬스 체크 endpoint.
//!
//! 로드밸런서/오케스트레이션 시스템용 liveness 체크와 컴포넌트별
//! 상태를 제공합니다.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 헬스 체크 응답 구조체.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 전체 서비스 상태 ("healthy" | "degraded")
    pub status: String,

    /// API 버전
    pub version: String,

    /// 서버 업타임(초)
    pub uptime_secs: i64,

    /// 현재 시간 (ISO 8601)
    pub timestamp: String,

    /// 개별 컴포넌트 상태
    pub components: ComponentHealth,
}

/// 개별 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// 증권사 API
    pub broker: ComponentStatus,

    /// 재무정보 레지스트리 API
    pub registry: ComponentStatus,

    /// 재무 데이터 캐시
    pub cache: ComponentStatus,

    /// 포트폴리오 추적기
    pub tracker: ComponentStatus,
}

/// 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// 상태 ("up" | "down" | "not_configured")
    pub status: String,

    /// 추가 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    /// 정상 상태.
    pub fn up() -> Self {
        Self {
            status: "up".to_string(),
            message: None,
        }
    }

    /// 미설정 상태.
    pub fn not_configured() -> Self {
        Self {
            status: "not_configured".to_string(),
            message: None,
        }
    }

    /// 정보 포함 정상 상태.
    pub fn up_with_info(message: impl Into<String>) -> Self {
        Self {
            status: "up".to_string(),
            message: Some(message.into()),
        }
    }
}

/// 간단한 헬스 체크 (liveness probe용).
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// 컴포넌트별 상태 확인.
///
/// 제공자 미설정은 에러가 아니며, 폴백 티어로 서비스가 계속
/// 동작하므로 항상 200을 반환합니다.
/// GET /signals/health
pub async fn health_detail(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache_stats = state.cache.stats().await;
    let risk = state.tracker.risk_summary().await;

    let status = if state.has_broker && state.has_registry {
        "healthy"
    } else {
        "degraded"
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        components: ComponentHealth {
            broker: if state.has_broker {
                ComponentStatus::up()
            } else {
                ComponentStatus::not_configured()
            },
            registry: if state.has_registry {
                ComponentStatus::up()
            } else {
                ComponentStatus::not_configured()
            },
            cache: ComponentStatus::up_with_info(format!(
                "{}건 캐시됨",
                cache_stats.total
            )),
            tracker: ComponentStatus::up_with_info(format!(
                "{}개 포지션 추적 중",
                risk.position_count
            )),
        },
    };

    (StatusCode::OK, Json(response))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        let app = Router::new().route("/health", get(health_check));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_detail_reports_components() {
        use crate::state::create_test_state;

        let state = Arc::new(create_test_state());
        let app = Router::new()
            .route("/signals/health", get(health_detail))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/signals/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();

        // 테스트 상태는 제공자 미설정이므로 degraded
        assert_eq!(health.status, "degraded");
        assert_eq!(health.components.broker.status, "not_configured");
        assert_eq!(health.components.registry.status, "not_configured");
        assert_eq!(health.components.cache.status, "up");
    }
}

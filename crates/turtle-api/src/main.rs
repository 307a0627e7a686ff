//! 터틀 시그널 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다. 터틀 돌파 분석,
//! 슈퍼스톡스 스크리닝, 외부 자동화용 통합 분석 엔드포인트를
//! 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use turtle_api::routes::create_api_router;
use turtle_api::state::AppState;
use turtle_core::{init_logging_from_env, AppConfig};

/// CORS 미들웨어 구성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용하고,
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS에 유효한 origin이 없어 전체 허용");
                AllowOrigin::any()
            } else {
                info!(count = origins.len(), "CORS origin 제한 설정");
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS 미설정, 전체 origin 허용 (개발 모드)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>) -> Router {
    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 통합 분석은 배치 딜레이 포함 오래 걸릴 수 있음
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(120),
        ))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging_from_env().map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {e}"))?;

    info!("터틀 시그널 API 서버 시작");

    let config = AppConfig::from_env();
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.api.host,
                port = config.api.port,
                "소켓 주소가 유효하지 않습니다. API_HOST, API_PORT 환경변수를 확인하세요."
            );
            anyhow::anyhow!("주소 파싱 실패: {e}")
        })?;

    if config.api.api_secret.is_none() {
        warn!("MAKE_API_KEY 미설정, 외부 플랫폼 엔드포인트가 인증 없이 열립니다");
    }

    let state = Arc::new(AppState::from_config(&config)?);
    info!(
        version = %state.version,
        has_broker = state.has_broker,
        has_registry = state.has_registry,
        "애플리케이션 상태 초기화 완료"
    );

    let app = create_router(state);

    info!(%addr, "API 서버 리스닝");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("서버가 정상 종료되었습니다");
    Ok(())
}

/// Graceful shutdown 시그널 대기 (Ctrl+C 또는 SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Ctrl+C 핸들러 설치 실패");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("시그널 핸들러 설치 실패")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Ctrl+C 수신, 정상 종료 시작");
        }
        _ = terminate => {
            warn!("SIGTERM 수신, 정상 종료 시작");
        }
    }
}

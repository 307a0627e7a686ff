//! 시그널 분석 endpoint.
//!
//! 터틀 돌파 분석, 슈퍼스톡스 조건 검색, 외부 자동화 플랫폼용 통합
//! 분석을 제공합니다. 외부 플랫폼 엔드포인트는 요청 본문의 `apiKey`
//! 공유 시크릿으로 인증합니다.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use turtle_core::{ScreeningCriteria, Signal, StockCode};

use crate::error::{ApiErrorResponse, ApiResult};
use crate::routes::health;
use crate::services::MakeAnalysisReport;
use crate::state::AppState;

/// 터틀 분석 요청.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// 분석할 종목 코드 목록 (생략 시 감시 유니버스)
    #[serde(default)]
    pub stock_codes: Option<Vec<String>>,
}

/// 터틀 분석 응답.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub count: usize,
    pub signals: Vec<Signal>,
}

/// 외부 자동화 플랫폼 공통 요청.
///
/// superstocks-search와 make-analysis가 같은 본문을 받습니다.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeAnalysisRequest {
    /// 공유 시크릿
    #[serde(default)]
    pub api_key: Option<String>,
    /// 분석 대상 종목 (생략 시 감시 유니버스)
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    /// 스크리닝 조건 오버라이드
    #[serde(default)]
    pub conditions: Option<ScreeningCriteria>,
    /// 투자 예산(원) 오버라이드
    #[serde(default)]
    pub investment_budget: Option<Decimal>,
}

/// 통합 분석 응답.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeAnalysisResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: MakeAnalysisReport,
}

/// 공유 시크릿 검증.
///
/// 시크릿이 설정된 경우 요청의 `apiKey`가 정확히 일치해야 합니다.
/// 시크릿 미설정 시 개발 모드로 간주하고 통과시킵니다.
fn authorize(state: &AppState, api_key: Option<&str>) -> Result<(), (StatusCode, Json<ApiErrorResponse>)> {
    let Some(secret) = &state.api_secret else {
        warn!("공유 시크릿 미설정, 인증 없이 요청 허용 (개발 모드)");
        return Ok(());
    };

    if api_key == Some(secret.as_str()) {
        return Ok(());
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(ApiErrorResponse::simple("UNAUTHORIZED")),
    ))
}

/// 요청 본문의 종목 코드 문자열을 검증합니다.
fn parse_codes(
    raw: Option<Vec<String>>,
) -> Result<Option<Vec<StockCode>>, (StatusCode, Json<ApiErrorResponse>)> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let mut codes = Vec::with_capacity(raw.len());
    for value in raw {
        let code = StockCode::new(value.trim()).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorResponse::new("INVALID_INPUT", e.to_string())),
            )
        })?;
        codes.push(code);
    }
    Ok(Some(codes))
}

/// 감시 유니버스 터틀 돌파 분석.
///
/// POST /signals/analyze
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let codes = parse_codes(request.stock_codes)?;

    let signals = state.orchestrator.analyze(codes, None).await;
    Ok(Json(AnalyzeResponse {
        success: true,
        count: signals.len(),
        signals,
    }))
}

/// 통합 분석을 실행하고 응답을 만듭니다.
async fn run_analysis(
    state: &AppState,
    request: MakeAnalysisRequest,
    default_criteria: ScreeningCriteria,
) -> ApiResult<Json<MakeAnalysisResponse>> {
    authorize(state, request.api_key.as_deref())?;

    let codes = parse_codes(request.symbols)?;
    let criteria = request.conditions.unwrap_or(default_criteria);

    let report = state
        .orchestrator
        .make_analysis(criteria, codes, request.investment_budget)
        .await;
    Ok(Json(MakeAnalysisResponse {
        success: true,
        report,
    }))
}

/// 슈퍼스톡스 조건 검색.
///
/// 통합 분석과 같은 보고서를 반환하되, 조건 생략 시 완화 기준을
/// 사용합니다.
/// POST /signals/superstocks-search
pub async fn superstocks_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MakeAnalysisRequest>,
) -> ApiResult<Json<MakeAnalysisResponse>> {
    run_analysis(&state, request, ScreeningCriteria::default()).await
}

/// 외부 자동화 플랫폼용 통합 분석.
///
/// 엄격 기준 스크리닝과 터틀 분석, 포트폴리오 점검을 한 번에
/// 실행하고 슬랙 메시지까지 만들어 반환합니다.
/// POST /signals/make-analysis
pub async fn make_analysis(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MakeAnalysisRequest>,
) -> ApiResult<Json<MakeAnalysisResponse>> {
    run_analysis(&state, request, ScreeningCriteria::strict()).await
}

/// 시그널 라우터 생성.
pub fn signals_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/superstocks-search", post(superstocks_search))
        .route("/make-analysis", post(make_analysis))
        .route("/health", get(health::health_detail))
}

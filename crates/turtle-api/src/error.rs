//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트에서 일관된 에러 형식을 제공합니다.

use axum::http::{Method, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "success": false,
///   "error": "UNAUTHORIZED",
///   "message": "API 키가 유효하지 않습니다",
///   "timestamp": 1756080000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 항상 false
    pub success: bool,
    /// 에러 코드 (예: "UNAUTHORIZED", "INVALID_INPUT")
    pub error: String,
    /// 사람이 읽을 수 있는 에러 메시지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 추가 상세 정보
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// HTTP 메서드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// 요청 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: Some(message.into()),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
            method: None,
            path: None,
        }
    }

    /// 에러 코드만 담은 간단한 에러.
    pub fn simple(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: None,
            details: None,
            timestamp: None,
            method: None,
            path: None,
        }
    }

    /// 상세 정보를 추가합니다.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// 요청 정보(메서드, 경로)를 추가합니다.
    #[must_use]
    pub fn with_request_info(mut self, method: &Method, uri: &Uri) -> Self {
        self.method = Some(method.to_string());
        self.path = Some(uri.path().to_string());
        self
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "[{}] {}", self.error, message),
            None => write!(f, "[{}]", self.error),
        }
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (axum::http::StatusCode, axum::Json<ApiErrorResponse>)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_new() {
        let error = ApiErrorResponse::new("INVALID_INPUT", "종목 코드 형식 오류");
        assert!(!error.success);
        assert_eq!(error.error, "INVALID_INPUT");
        assert!(error.timestamp.is_some());
    }

    #[test]
    fn test_simple_omits_optional_fields() {
        let json = serde_json::to_string(&ApiErrorResponse::simple("UNAUTHORIZED")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"UNAUTHORIZED"}"#);
    }

    #[test]
    fn test_with_request_info() {
        let uri: Uri = "/signals/make-analysis".parse().unwrap();
        let error =
            ApiErrorResponse::new("UNAUTHORIZED", "인증 실패").with_request_info(&Method::POST, &uri);

        assert_eq!(error.method, Some("POST".to_string()));
        assert_eq!(error.path, Some("/signals/make-analysis".to_string()));
    }
}

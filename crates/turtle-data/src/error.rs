//! 데이터 계층 에러 타입.

use thiserror::Error;

/// 데이터 수집/저장 관련 에러.
#[derive(Debug, Error)]
pub enum DataError {
    /// 네트워크/연결 에러
    #[error("네트워크 오류: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("요청 타임아웃: {0}")]
    Timeout(String),

    /// 인증/권한 에러
    #[error("인증 실패: {0}")]
    Unauthorized(String),

    /// 제공자 API 에러 코드
    #[error("API 오류 {code}: {message}")]
    ApiError { code: String, message: String },

    /// 파싱/역직렬화 에러
    #[error("파싱 오류: {0}")]
    Parse(String),

    /// 데이터 없음
    #[error("데이터 없음: {0}")]
    NotFound(String),

    /// 제공자 미설정
    #[error("제공자 미설정: {0}")]
    NotConfigured(String),

    /// 저장소 오류
    #[error("저장소 오류: {0}")]
    Store(String),
}

impl DataError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Network(_) | DataError::Timeout(_))
    }

    /// 남은 실행 동안 해당 제공자를 건너뛰어야 하는 에러인지 확인.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DataError::Unauthorized(_) | DataError::NotConfigured(_))
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Timeout(err.to_string())
        } else if err.is_connect() {
            DataError::Network(err.to_string())
        } else if err.is_decode() {
            DataError::Parse(err.to_string())
        } else {
            DataError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Parse(err.to_string())
    }
}

/// 데이터 계층 결과 타입.
pub type Result<T> = std::result::Result<T, DataError>;

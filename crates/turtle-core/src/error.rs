//! 핵심 에러 타입.

use thiserror::Error;

/// 도메인 공통 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 잘못된 종목 코드 형식
    #[error("잘못된 종목 코드: {0}")]
    InvalidStockCode(String),

    /// 잘못된 설정 값
    #[error("설정 오류: {0}")]
    Config(String),

    /// 직렬화/역직렬화 오류
    #[error("직렬화 오류: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

/// 핵심 모듈 결과 타입.
pub type Result<T> = std::result::Result<T, CoreError>;

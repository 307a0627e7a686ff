//! 종목 코드 및 시장 구분.
//!
//! 이 모듈은 한국 상장 주식 식별 타입을 정의합니다:
//! - `Market` - 시장 구분 (코스피, 코스닥)
//! - `StockCode` - 6자리 종목 코드

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// 시장 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// 유가증권시장
    Kospi,
    /// 코스닥시장
    Kosdaq,
    /// 판별 불가
    Unknown,
}

impl Market {
    /// 야후 파이낸스 심볼 접미사를 반환합니다.
    pub fn yahoo_suffix(&self) -> &'static str {
        match self {
            Market::Kospi => ".KS",
            Market::Kosdaq => ".KQ",
            // 판별 불가 시 코스피 접미사로 시도
            Market::Unknown => ".KS",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Kospi => write!(f, "KOSPI"),
            Market::Kosdaq => write!(f, "KOSDAQ"),
            Market::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// 6자리 종목 코드.
///
/// 코드 첫 자리로 시장을 추정합니다 (0/1 → 코스피, 2/3 → 코스닥).
/// 정확한 시장 구분은 조회용 레지스트리가 제공하며, 이 추정은
/// 레지스트리가 없을 때의 폴백입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockCode(String);

impl StockCode {
    /// 종목 코드를 생성합니다. 6자리 숫자가 아니면 에러를 반환합니다.
    pub fn new(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(code))
        } else {
            Err(CoreError::InvalidStockCode(code))
        }
    }

    /// 검증 없이 생성합니다. 상수 테이블 등 이미 검증된 입력 전용.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// 코드 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 첫 자리 숫자로 시장을 추정합니다.
    pub fn market(&self) -> Market {
        match self.0.chars().next() {
            Some('0') | Some('1') => Market::Kospi,
            Some('2') | Some('3') => Market::Kosdaq,
            _ => Market::Unknown,
        }
    }

    /// 야후 파이낸스 형식 심볼을 반환합니다 (예: "005930.KS").
    pub fn yahoo_symbol(&self) -> String {
        format!("{}{}", self.0, self.market().yahoo_suffix())
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StockCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stock_code_validation() {
        assert!(StockCode::new("005930").is_ok());
        assert!(StockCode::new("12345").is_err());
        assert!(StockCode::new("12345A").is_err());
        assert!(StockCode::new("1234567").is_err());
    }

    #[test]
    fn test_market_inference() {
        assert_eq!(StockCode::new("005930").unwrap().market(), Market::Kospi);
        assert_eq!(StockCode::new("196170").unwrap().market(), Market::Kospi);
        assert_eq!(StockCode::new("247540").unwrap().market(), Market::Kosdaq);
        assert_eq!(StockCode::new("352820").unwrap().market(), Market::Kosdaq);
        assert_eq!(StockCode::new("900310").unwrap().market(), Market::Unknown);
    }

    #[test]
    fn test_yahoo_symbol() {
        assert_eq!(StockCode::new("005930").unwrap().yahoo_symbol(), "005930.KS");
        assert_eq!(StockCode::new("247540").unwrap().yahoo_symbol(), "247540.KQ");
    }

    proptest! {
        #[test]
        fn valid_codes_roundtrip(code in "[0-9]{6}") {
            let parsed = StockCode::new(code.clone()).unwrap();
            prop_assert_eq!(parsed.as_str(), code.as_str());
            prop_assert_ne!(parsed.yahoo_symbol().len(), 6);
        }
    }
}

//! 데이터 출처(provenance) 등급.
//!
//! 실데이터와 추정/시뮬레이션 데이터가 섞이는 것을 허용하되,
//! 모든 가격·재무 결과에 출처 태그를 달아 하위 소비자가
//! 신뢰도 낮은 결과를 걸러낼 수 있게 합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 가격/재무 데이터의 출처 등급.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// 공개 차트 API 실시세
    Real,
    /// 증권사 API 시세
    Broker,
    /// 캐시/하드코딩 최근 종가
    Cached,
    /// 규칙 기반 추정치
    Estimated,
    /// 합성 시뮬레이션 데이터
    Simulated,
}

impl Provenance {
    /// 신뢰도 순위. 높을수록 신뢰할 수 있는 출처입니다.
    pub fn confidence(&self) -> u8 {
        match self {
            Provenance::Real => 4,
            Provenance::Broker => 3,
            Provenance::Cached => 2,
            Provenance::Estimated => 1,
            Provenance::Simulated => 0,
        }
    }

    /// 실거래 판단에 사용할 수 있는 출처인지 여부.
    pub fn is_live(&self) -> bool {
        matches!(self, Provenance::Real | Provenance::Broker)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Real => "real",
            Provenance::Broker => "broker",
            Provenance::Cached => "cached",
            Provenance::Estimated => "estimated",
            Provenance::Simulated => "simulated",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ordering() {
        assert!(Provenance::Real.confidence() > Provenance::Broker.confidence());
        assert!(Provenance::Broker.confidence() > Provenance::Cached.confidence());
        assert!(Provenance::Estimated.confidence() > Provenance::Simulated.confidence());
    }

    #[test]
    fn test_live_sources() {
        assert!(Provenance::Real.is_live());
        assert!(Provenance::Broker.is_live());
        assert!(!Provenance::Simulated.is_live());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Provenance::Simulated).unwrap(),
            "\"simulated\""
        );
    }
}

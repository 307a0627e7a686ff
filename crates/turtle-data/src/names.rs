//! 종목명 해석 체인.
//!
//! 메모리 캐시 → 정적 테이블 → 시장 추정 플레이스홀더 순으로
//! 종목명을 해석합니다. 증권사 보유종목 응답 등에서 실명을 알게 되면
//! `learn`으로 캐시에 반영합니다.

use std::collections::HashMap;
use std::sync::RwLock;

use turtle_core::{Market, StockCode};

/// 주요 종목 정적 이름 테이블.
const STATIC_NAMES: &[(&str, &str)] = &[
    ("005930", "삼성전자"),
    ("000660", "SK하이닉스"),
    ("035420", "NAVER"),
    ("005380", "현대차"),
    ("012330", "현대모비스"),
    ("000270", "기아"),
    ("051910", "LG화학"),
    ("035720", "카카오"),
    ("251270", "넷마블"),
    ("036570", "엔씨소프트"),
    ("352820", "하이브"),
    ("326030", "SK바이오팜"),
    ("145020", "휴젤"),
    ("042700", "한미반도체"),
    ("259960", "크래프톤"),
    ("196170", "알테오젠"),
    ("328130", "루닛"),
    ("105560", "KB금융"),
    ("055550", "신한지주"),
    ("017670", "SK텔레콤"),
];

/// 종목명 캐시.
#[derive(Debug, Default)]
pub struct StockNames {
    cache: RwLock<HashMap<String, String>>,
}

impl StockNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// 종목명을 해석합니다. 항상 사용 가능한 이름을 반환합니다.
    pub fn resolve(&self, code: &StockCode) -> String {
        if let Ok(cache) = self.cache.read() {
            if let Some(name) = cache.get(code.as_str()) {
                return name.clone();
            }
        }

        if let Some((_, name)) = STATIC_NAMES.iter().find(|(c, _)| *c == code.as_str()) {
            return (*name).to_string();
        }

        // 시장 추정 플레이스홀더
        match code.market() {
            Market::Kospi => format!("코스피{}", code),
            Market::Kosdaq => format!("코스닥{}", code),
            Market::Unknown => format!("종목{}", code),
        }
    }

    /// 외부 응답에서 확인된 실명을 캐시에 반영합니다.
    pub fn learn(&self, code: &StockCode, name: impl Into<String>) {
        let name = name.into();
        if name.is_empty() {
            return;
        }
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(code.as_str().to_string(), name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_table_hit() {
        let names = StockNames::new();
        let code = StockCode::new("005930").unwrap();
        assert_eq!(names.resolve(&code), "삼성전자");
    }

    #[test]
    fn test_placeholder_by_market() {
        let names = StockNames::new();
        assert_eq!(
            names.resolve(&StockCode::new("068270").unwrap()),
            "코스피068270"
        );
        assert_eq!(
            names.resolve(&StockCode::new("247540").unwrap()),
            "코스닥247540"
        );
        assert_eq!(
            names.resolve(&StockCode::new("900310").unwrap()),
            "종목900310"
        );
    }

    #[test]
    fn test_learned_name_overrides_placeholder() {
        let names = StockNames::new();
        let code = StockCode::new("247540").unwrap();
        names.learn(&code, "에코프로비엠");
        assert_eq!(names.resolve(&code), "에코프로비엠");
        // 빈 이름은 무시
        names.learn(&code, "");
        assert_eq!(names.resolve(&code), "에코프로비엠");
    }
}

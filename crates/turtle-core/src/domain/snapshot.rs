//! 연간 재무 스냅샷 및 회계연도 규칙.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::provenance::Provenance;
use crate::types::StockCode;

/// 종목의 연간 재무 스냅샷.
///
/// 자연 키는 (code, data_year)이며 키당 최대 한 건을 유지합니다(upsert).
/// `collected_year`는 수집 시점의 달력 연도 스탬프로, 수집년도가 바뀌면
/// 같은 회계연도라도 재수집 대상이 됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    /// 종목 코드
    pub code: StockCode,
    /// 회사명
    pub company_name: String,
    /// 재무제표 회계연도
    pub data_year: i32,
    /// 수집 연도 (달력 기준)
    pub collected_year: i32,
    /// 매출액 (억원)
    pub revenue: Decimal,
    /// 당기순이익 (억원)
    pub net_income: Decimal,
    /// 상장주식수
    pub shares_outstanding: i64,
    /// 3년 매출 성장률 (%, 소수 2자리)
    pub revenue_growth_3y: f64,
    /// 3년 순이익 성장률 (%, 소수 2자리)
    pub net_income_growth_3y: f64,
    /// 데이터 출처
    pub provenance: Provenance,
    /// 마지막 갱신 시각
    pub updated_at: DateTime<Utc>,
}

impl FinancialSnapshot {
    /// 해당 수집 연도 기준으로 신선한 스냅샷인지 여부.
    pub fn is_fresh(&self, collection_year: i32) -> bool {
        self.collected_year == collection_year
    }
}

/// 회계연도 규칙.
///
/// 연간 보고서는 이듬해 4월 1일 이후에야 신뢰할 수 있다고 가정합니다.
/// 4월 이전에는 2년 전, 4월 1일부터는 1년 전 회계연도를 대상으로 합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiscalCalendar;

impl FiscalCalendar {
    /// 기준일의 수집 대상 회계연도.
    pub fn target_year(date: NaiveDate) -> i32 {
        if date.month() >= 4 {
            date.year() - 1
        } else {
            date.year() - 2
        }
    }

    /// 기준일의 수집 연도 (달력 연도).
    pub fn collection_year(date: NaiveDate) -> i32 {
        date.year()
    }

    /// 서울 기준 오늘 날짜.
    pub fn today_seoul() -> NaiveDate {
        Utc::now().with_timezone(&Seoul).date_naive()
    }
}

/// 슈퍼스톡스 스크리닝 조건.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreeningCriteria {
    /// 최소 3년 매출 성장률 (%)
    pub min_revenue_growth: f64,
    /// 최소 3년 순이익 성장률 (%)
    pub min_net_income_growth: f64,
    /// 최대 PSR
    pub max_psr: f64,
    /// 최소 주가 (원)
    pub min_price: Decimal,
    /// 최대 주가 (원)
    pub max_price: Decimal,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            min_revenue_growth: 15.0,
            min_net_income_growth: 15.0,
            max_psr: 2.5,
            min_price: Decimal::from(1_000),
            max_price: Decimal::from(500_000),
        }
    }
}

impl ScreeningCriteria {
    /// 정기 분석용 엄격한 기준 (성장률 20%, PSR 2.0 이하).
    pub fn strict() -> Self {
        Self {
            min_revenue_growth: 20.0,
            min_net_income_growth: 20.0,
            max_psr: 2.0,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_target_year_before_april() {
        // 3월까지는 2년 전 회계연도
        assert_eq!(FiscalCalendar::target_year(date(2026, 3, 31)), 2024);
        assert_eq!(FiscalCalendar::target_year(date(2026, 1, 1)), 2024);
    }

    #[test]
    fn test_target_year_from_april() {
        // 4월 1일부터는 1년 전 회계연도
        assert_eq!(FiscalCalendar::target_year(date(2026, 4, 1)), 2025);
        assert_eq!(FiscalCalendar::target_year(date(2026, 12, 31)), 2025);
    }

    #[test]
    fn test_collection_year_is_calendar_year() {
        assert_eq!(FiscalCalendar::collection_year(date(2026, 2, 1)), 2026);
        assert_eq!(FiscalCalendar::collection_year(date(2026, 8, 25)), 2026);
    }

    #[test]
    fn test_criteria_defaults() {
        let c = ScreeningCriteria::default();
        assert_eq!(c.min_revenue_growth, 15.0);
        assert_eq!(c.max_psr, 2.5);

        let strict = ScreeningCriteria::strict();
        assert_eq!(strict.min_revenue_growth, 20.0);
        assert_eq!(strict.max_psr, 2.0);
    }
}

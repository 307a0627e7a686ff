//! 슈퍼스톡스 재무 스크리너.
//!
//! 3년 성장률과 PSR(주가매출비율)로 종목을 점수화하고 등급을
//! 매깁니다. 시가총액 = 현재가 × 상장주식수, PSR = 시가총액 / 매출액.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use turtle_core::{
    round2, FinancialSnapshot, Price, Provenance, ScreeningCriteria, StockCode,
};

/// 1억원.
const EOK_WON: i64 = 100_000_000;

/// PSR 계산 불가 시의 상한값.
const PSR_CLAMP: f64 = 999.0;

/// 스크리닝 등급.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    /// 90점 이상
    Excellent,
    /// 70점 이상
    Good,
    /// 50점 이상
    Fair,
    Poor,
}

impl Grade {
    /// 점수로 등급을 판정합니다.
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Grade::Excellent,
            70.. => Grade::Good,
            50.. => Grade::Fair,
            _ => Grade::Poor,
        }
    }
}

/// 종목별 스크리닝 평가 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// 종목 코드
    pub code: StockCode,
    /// 종목명
    pub name: String,
    /// 평가에 사용한 현재가
    pub current_price: Price,
    /// 3년 매출 성장률 (%)
    pub revenue_growth_3y: f64,
    /// 3년 순이익 성장률 (%)
    pub net_income_growth_3y: f64,
    /// PSR (소수 둘째 자리)
    pub psr: f64,
    /// 종합 점수
    pub score: u32,
    /// 등급
    pub grade: Grade,
    /// 기준 통과 여부
    pub qualified: bool,
    /// 재무 데이터 출처
    pub provenance: Provenance,
}

/// 슈퍼스톡스 분석기.
#[derive(Debug, Clone)]
pub struct SuperstocksAnalyzer {
    criteria: ScreeningCriteria,
}

/// PSR을 계산합니다. 매출액은 원 단위입니다.
///
/// 매출이나 주식수가 0 이하이거나 계산 결과가 유한하지 않으면
/// 999.0으로 클램프합니다.
pub fn psr(price: Price, shares_outstanding: i64, revenue_won: Decimal) -> f64 {
    if shares_outstanding <= 0 || revenue_won <= Decimal::ZERO {
        return PSR_CLAMP;
    }
    let market_cap = price * Decimal::from(shares_outstanding);
    let ratio = (market_cap / revenue_won).to_f64().unwrap_or(PSR_CLAMP);
    if !ratio.is_finite() || ratio < 0.0 {
        return PSR_CLAMP;
    }
    round2(ratio)
}

/// 억원 단위 매출액으로 PSR을 계산합니다.
pub fn psr_from_eok(price: Price, shares_outstanding: i64, revenue_eok: Decimal) -> f64 {
    psr(price, shares_outstanding, revenue_eok * Decimal::from(EOK_WON))
}

/// 상장주식수를 모를 때의 대체 추정치.
///
/// PSR이 0.5~2.5 사이에 오도록 역산한 주식수입니다. 이 추정으로
/// 평가한 결과는 Estimated 출처로 강등됩니다.
pub fn estimate_shares(price: Price, revenue_eok: Decimal) -> i64 {
    if price <= Decimal::ZERO || revenue_eok <= Decimal::ZERO {
        return 0;
    }
    let assumed_psr =
        Decimal::from_f64_retain(rand::thread_rng().gen_range(0.5..2.5)).unwrap_or(Decimal::ONE);
    let market_cap = revenue_eok * Decimal::from(EOK_WON) * assumed_psr;
    (market_cap / price).floor().to_i64().unwrap_or(0)
}

impl SuperstocksAnalyzer {
    /// 스크리닝 기준으로 분석기를 생성합니다.
    pub fn new(criteria: ScreeningCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &ScreeningCriteria {
        &self.criteria
    }

    /// 재무 스냅샷과 현재가로 종목을 평가합니다.
    ///
    /// 스냅샷의 상장주식수가 0 이하이면 주식수를 추정하고 결과
    /// 출처를 Estimated로 강등합니다.
    pub fn evaluate(&self, snapshot: &FinancialSnapshot, current_price: Price) -> Evaluation {
        let (shares, provenance) = if snapshot.shares_outstanding > 0 {
            (snapshot.shares_outstanding, snapshot.provenance)
        } else {
            (
                estimate_shares(current_price, snapshot.revenue),
                Provenance::Estimated,
            )
        };

        let psr = psr_from_eok(current_price, shares, snapshot.revenue);
        let score = self.score(snapshot.revenue_growth_3y, snapshot.net_income_growth_3y, psr);
        let qualified = self.qualifies(
            snapshot.revenue_growth_3y,
            snapshot.net_income_growth_3y,
            psr,
            current_price,
        );

        debug!(
            symbol = %snapshot.code,
            psr,
            score,
            qualified,
            "슈퍼스톡스 평가 완료"
        );

        Evaluation {
            code: snapshot.code.clone(),
            name: snapshot.company_name.clone(),
            current_price,
            revenue_growth_3y: snapshot.revenue_growth_3y,
            net_income_growth_3y: snapshot.net_income_growth_3y,
            psr,
            score,
            grade: Grade::from_score(score),
            qualified,
            provenance,
        }
    }

    /// 성장률과 PSR로 종합 점수를 계산합니다.
    ///
    /// 매출/순이익 성장률 각각 ≥30% → 50점, ≥20% → 40점, ≥15% → 30점.
    /// PSR ≤1.0 → 20점, ≤2.0 → 15점, ≤2.5 → 10점.
    pub fn score(&self, revenue_growth: f64, net_income_growth: f64, psr: f64) -> u32 {
        let growth_points = |growth: f64| -> u32 {
            if growth >= 30.0 {
                50
            } else if growth >= 20.0 {
                40
            } else if growth >= 15.0 {
                30
            } else {
                0
            }
        };
        let psr_points = if psr <= 1.0 {
            20
        } else if psr <= 2.0 {
            15
        } else if psr <= 2.5 {
            10
        } else {
            0
        };
        growth_points(revenue_growth) + growth_points(net_income_growth) + psr_points
    }

    /// 전 기준 동시 충족 여부.
    fn qualifies(
        &self,
        revenue_growth: f64,
        net_income_growth: f64,
        psr: f64,
        price: Price,
    ) -> bool {
        revenue_growth >= self.criteria.min_revenue_growth
            && net_income_growth >= self.criteria.min_net_income_growth
            && psr <= self.criteria.max_psr
            && price >= self.criteria.min_price
            && price <= self.criteria.max_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn snapshot(revenue_eok: Decimal, shares: i64, rev_growth: f64, ni_growth: f64) -> FinancialSnapshot {
        FinancialSnapshot {
            code: StockCode::new_unchecked("005930"),
            company_name: "삼성전자".to_string(),
            data_year: 2024,
            collected_year: 2026,
            revenue: revenue_eok,
            net_income: revenue_eok / dec!(10),
            shares_outstanding: shares,
            revenue_growth_3y: rev_growth,
            net_income_growth_3y: ni_growth,
            provenance: Provenance::Real,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_psr_basic() {
        // 시가총액 = 50,000 × 1,000,000 = 500억, 매출 250억 → PSR 2.0
        assert_eq!(psr_from_eok(dec!(50000), 1_000_000, dec!(250)), 2.0);
    }

    #[test]
    fn test_psr_clamps_degenerate_inputs() {
        assert_eq!(psr(dec!(50000), 0, dec!(1000)), 999.0);
        assert_eq!(psr(dec!(50000), 1_000_000, dec!(0)), 999.0);
        assert_eq!(psr(dec!(50000), -5, dec!(1000)), 999.0);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::from_score(120), Grade::Excellent);
        assert_eq!(Grade::from_score(90), Grade::Excellent);
        assert_eq!(Grade::from_score(89), Grade::Good);
        assert_eq!(Grade::from_score(70), Grade::Good);
        assert_eq!(Grade::from_score(50), Grade::Fair);
        assert_eq!(Grade::from_score(49), Grade::Poor);
    }

    #[test]
    fn test_score_tiers() {
        let a = SuperstocksAnalyzer::new(ScreeningCriteria::default());
        // 성장률 둘 다 ≥30, PSR ≤1.0 → 만점 120
        assert_eq!(a.score(35.0, 30.0, 0.8), 120);
        // 20%대 성장 + PSR 1.5 → 40 + 40 + 15
        assert_eq!(a.score(25.0, 20.0, 1.5), 95);
        // 15% 미만 성장은 0점
        assert_eq!(a.score(14.9, 14.9, 3.0), 0);
    }

    #[test]
    fn test_evaluation_qualifies() {
        let a = SuperstocksAnalyzer::new(ScreeningCriteria::default());
        // PSR = 50,000 × 1,000,000 / 250억 = 2.0 ≤ 2.5
        let eval = a.evaluate(&snapshot(dec!(250), 1_000_000, 20.0, 18.0), dec!(50000));
        assert!(eval.qualified);
        assert_eq!(eval.psr, 2.0);
        assert_eq!(eval.provenance, Provenance::Real);
    }

    #[test]
    fn test_strict_criteria_reject() {
        let a = SuperstocksAnalyzer::new(ScreeningCriteria::strict());
        // 성장률 18%는 완화 기준(15%)은 통과하지만 엄격 기준(20%)은 탈락
        let eval = a.evaluate(&snapshot(dec!(250), 1_000_000, 18.0, 18.0), dec!(50000));
        assert!(!eval.qualified);
    }

    #[test]
    fn test_price_band() {
        let a = SuperstocksAnalyzer::new(ScreeningCriteria::default());
        // 기본 가격 범위 1,000~500,000원 밖이면 탈락
        let eval = a.evaluate(&snapshot(dec!(250000), 1_000_000, 30.0, 30.0), dec!(600000));
        assert!(!eval.qualified);
    }

    #[test]
    fn test_estimated_shares_downgrade_provenance() {
        let a = SuperstocksAnalyzer::new(ScreeningCriteria::default());
        let eval = a.evaluate(&snapshot(dec!(250), 0, 20.0, 18.0), dec!(50000));
        assert_eq!(eval.provenance, Provenance::Estimated);
        // 역산 PSR은 0.5~2.5 범위
        assert!(eval.psr >= 0.4 && eval.psr <= 2.6, "psr={}", eval.psr);
    }

    proptest::proptest! {
        #[test]
        fn psr_is_always_finite_and_bounded(
            price in 1i64..1_000_000,
            shares in -1_000i64..100_000_000,
            revenue in -100i64..1_000_000,
        ) {
            let ratio = psr_from_eok(Decimal::from(price), shares, Decimal::from(revenue));
            proptest::prop_assert!(ratio.is_finite());
            proptest::prop_assert!(ratio >= 0.0);
        }
    }
}

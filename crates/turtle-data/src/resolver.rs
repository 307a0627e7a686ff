//! 순위 기반 시세 해석기.
//!
//! 선언된 우선순위대로 제공자 티어를 시도해 첫 성공을 출처 태그와
//! 함께 반환합니다. 어떤 티어가 요청을 처리했는지 구조화 로그로
//! 남기며, 호출자에게는 절대 에러를 전파하지 않습니다. 모든 티어가
//! 실패하면 가격은 추정치, 일봉은 합성 시리즈로 강등됩니다.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use turtle_core::{DailyBar, Price, Provenance, StockCode};

use crate::provider::{BrokerClient, ChartProvider};
use crate::simulation;

/// 티어별 타임아웃 기본값.
const TIER_TIMEOUT_SECS: u64 = 5;

/// 주요 종목 최근 확인 종가 테이블. 모든 실시세 티어 실패 시 사용.
const LAST_KNOWN_CLOSE: &[(&str, i64)] = &[
    ("005930", 71_200),
    ("000660", 127_000),
    ("035420", 152_000),
    ("005380", 45_000),
    ("012330", 220_000),
    ("000270", 89_000),
    ("051910", 320_000),
    ("035720", 58_000),
    ("251270", 45_000),
    ("036570", 210_000),
    ("352820", 180_000),
    ("326030", 95_000),
    ("145020", 78_000),
    ("042700", 65_000),
    ("259960", 85_000),
    ("196170", 85_000),
    ("328130", 39_000),
];

/// 출처 태그가 붙은 현재가.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    pub price: Price,
    pub provenance: Provenance,
}

/// 출처 태그가 붙은 일봉 시리즈 (과거→최신 순).
#[derive(Debug, Clone)]
pub struct ResolvedBars {
    pub bars: Vec<DailyBar>,
    pub provenance: Provenance,
}

/// 시세 해석기.
pub struct PriceResolver {
    chart: Arc<ChartProvider>,
    broker: Option<Arc<BrokerClient>>,
    tier_timeout: Duration,
}

impl PriceResolver {
    /// 새 해석기를 생성합니다.
    pub fn new(chart: Arc<ChartProvider>, broker: Option<Arc<BrokerClient>>) -> Self {
        Self {
            chart,
            broker,
            tier_timeout: Duration::from_secs(TIER_TIMEOUT_SECS),
        }
    }

    /// 티어별 타임아웃을 설정합니다.
    pub fn with_tier_timeout(mut self, tier_timeout: Duration) -> Self {
        self.tier_timeout = tier_timeout;
        self
    }

    /// 현재가를 해석합니다. 항상 사용 가능한 가격을 반환합니다.
    ///
    /// 티어 순서: 증권사 실시세 → 차트 실시세/전일 종가 →
    /// 최근 확인 종가 테이블 → 업종 추정가.
    pub async fn current_price(&self, code: &StockCode) -> ResolvedPrice {
        if let Some(broker) = &self.broker {
            match timeout(self.tier_timeout, broker.current_price(code)).await {
                Ok(Ok(price)) if price > Decimal::ZERO => {
                    debug!(symbol = %code, tier = "broker", %price, "현재가 해석 완료");
                    return ResolvedPrice {
                        price,
                        provenance: Provenance::Broker,
                    };
                }
                Ok(Ok(_)) => warn!(symbol = %code, tier = "broker", "유효하지 않은 가격"),
                Ok(Err(e)) => warn!(symbol = %code, tier = "broker", error = %e, "티어 실패"),
                Err(_) => warn!(symbol = %code, tier = "broker", "티어 타임아웃"),
            }
        }

        match timeout(self.tier_timeout, self.chart.quote_meta(code)).await {
            Ok(Ok(meta)) => {
                let quote = meta.regular_market_price.or(meta.chart_previous_close);
                if let Some(price) = quote.and_then(Decimal::from_f64_retain) {
                    if price > Decimal::ZERO {
                        debug!(symbol = %code, tier = "chart", %price, "현재가 해석 완료");
                        return ResolvedPrice {
                            price: price.round_dp(2),
                            provenance: Provenance::Real,
                        };
                    }
                }
                warn!(symbol = %code, tier = "chart", "시세 필드 없음");
            }
            Ok(Err(e)) => warn!(symbol = %code, tier = "chart", error = %e, "티어 실패"),
            Err(_) => warn!(symbol = %code, tier = "chart", "티어 타임아웃"),
        }

        if let Some((_, close)) = LAST_KNOWN_CLOSE.iter().find(|(c, _)| *c == code.as_str()) {
            debug!(symbol = %code, tier = "cached", price = close, "전일 종가 사용");
            return ResolvedPrice {
                price: Decimal::from(*close),
                provenance: Provenance::Cached,
            };
        }

        let estimated = Self::estimate_by_industry(code);
        debug!(symbol = %code, tier = "estimated", price = %estimated, "추정가 사용");
        ResolvedPrice {
            price: estimated,
            provenance: Provenance::Estimated,
        }
    }

    /// 종목코드 첫 자리 패턴으로 업종 대략가를 추정합니다.
    fn estimate_by_industry(code: &StockCode) -> Decimal {
        let estimate = match code.as_str().chars().next() {
            Some('3') => 45_000,
            Some('2') => 35_000,
            Some('1') => 55_000,
            Some('0') => 85_000,
            _ => 50_000,
        };
        Decimal::from(estimate)
    }

    /// 최근 `count` 거래일의 일봉을 해석합니다 (과거→최신 순).
    ///
    /// 티어 순서: 차트 제공자 → 증권사 차트 → 합성 시리즈.
    /// 합성 시리즈의 마지막 종가는 해석된 현재가에 고정됩니다.
    pub async fn daily_bars(&self, code: &StockCode, count: usize) -> ResolvedBars {
        match timeout(self.tier_timeout, self.chart.daily_bars(code, count)).await {
            Ok(Ok(bars)) if !bars.is_empty() => {
                debug!(symbol = %code, tier = "chart", count = bars.len(), "일봉 해석 완료");
                return ResolvedBars {
                    bars,
                    provenance: Provenance::Real,
                };
            }
            Ok(Ok(_)) => warn!(symbol = %code, tier = "chart", "빈 일봉 응답"),
            Ok(Err(e)) => warn!(symbol = %code, tier = "chart", error = %e, "티어 실패"),
            Err(_) => warn!(symbol = %code, tier = "chart", "티어 타임아웃"),
        }

        if let Some(broker) = &self.broker {
            match timeout(self.tier_timeout, broker.daily_bars(code, count)).await {
                Ok(Ok(bars)) if !bars.is_empty() => {
                    debug!(symbol = %code, tier = "broker", count = bars.len(), "일봉 해석 완료");
                    return ResolvedBars {
                        bars,
                        provenance: Provenance::Broker,
                    };
                }
                Ok(Ok(_)) => warn!(symbol = %code, tier = "broker", "빈 일봉 응답"),
                Ok(Err(e)) => warn!(symbol = %code, tier = "broker", error = %e, "티어 실패"),
                Err(_) => warn!(symbol = %code, tier = "broker", "티어 타임아웃"),
            }
        }

        let pin = self.current_price(code).await;
        warn!(symbol = %code, tier = "simulated", "실데이터 없음, 합성 시리즈 사용");
        ResolvedBars {
            bars: simulation::synthetic_series(code, count, pin.price),
            provenance: Provenance::Simulated,
        }
    }

    /// 52주 고가/저가를 조회합니다. ATR/돌파 창과는 별도의 장기
    /// 시리즈 메타데이터에서 가져옵니다.
    pub async fn fifty_two_week(&self, code: &StockCode) -> Option<(Price, Price)> {
        match timeout(self.tier_timeout, self.chart.quote_meta(code)).await {
            Ok(Ok(meta)) => match (meta.fifty_two_week_high, meta.fifty_two_week_low) {
                (Some(high), Some(low)) => Some((
                    Decimal::from_f64_retain(high)?.round_dp(2),
                    Decimal::from_f64_retain(low)?.round_dp(2),
                )),
                _ => None,
            },
            _ => None,
        }
    }

    /// 차트 메타데이터의 상장주식수 힌트.
    pub async fn shares_outstanding_hint(&self, code: &StockCode) -> Option<i64> {
        match timeout(self.tier_timeout, self.chart.quote_meta(code)).await {
            Ok(Ok(meta)) => meta.shares_outstanding,
            _ => None,
        }
    }
}

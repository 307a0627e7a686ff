//! 공개 차트 API 클라이언트.
//!
//! 야후 파이낸스 v8 차트 엔드포인트로 일봉(OHLCV)과 메타데이터
//! (실시간가, 전일 종가, 52주 고저, 상장주식수)를 조회합니다.
//! 인증이 필요 없는 1차 시세 티어입니다.
//!
//! # 심볼 형식
//! 거래소 접미사가 붙은 형식을 사용합니다:
//! "005930.KS" (코스피), "247540.KQ" (코스닥).

use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use turtle_core::{DailyBar, StockCode};

use crate::error::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// 차트 API 메타데이터.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartMeta {
    /// 실시간(정규장) 가격
    pub regular_market_price: Option<f64>,
    /// 전일 종가
    pub chart_previous_close: Option<f64>,
    /// 52주 최고가
    pub fifty_two_week_high: Option<f64>,
    /// 52주 최저가
    pub fifty_two_week_low: Option<f64>,
    /// 상장주식수
    pub shares_outstanding: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartNode,
}

#[derive(Debug, Deserialize)]
struct ChartNode {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteBlock {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

/// 차트 데이터 제공자.
pub struct ChartProvider {
    client: Client,
    base_url: String,
}

impl ChartProvider {
    /// 새 차트 제공자를 생성합니다.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// 베이스 URL을 지정해 생성합니다 (테스트용).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DataError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// 요청 일수에 맞는 range 파라미터를 반환합니다.
    fn range_for(count: usize) -> &'static str {
        if count <= 5 {
            "5d"
        } else if count <= 20 {
            "1mo"
        } else if count <= 60 {
            "3mo"
        } else if count <= 120 {
            "6mo"
        } else if count <= 250 {
            "1y"
        } else {
            "2y"
        }
    }

    async fn fetch_chart(&self, code: &StockCode, range: &str) -> Result<ChartResult> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url,
            code.yahoo_symbol(),
            range
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DataError::ApiError {
                code: response.status().as_u16().to_string(),
                message: format!("차트 조회 실패: {}", code),
            });
        }

        let parsed: ChartResponse = response.json().await?;
        if let Some(error) = parsed.chart.error {
            return Err(DataError::ApiError {
                code: "chart".to_string(),
                message: error.to_string(),
            });
        }

        parsed
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| DataError::NotFound(format!("차트 결과 없음: {}", code)))
    }

    /// 최근 `count` 거래일의 일봉을 조회합니다 (과거→최신 순).
    ///
    /// null 항목(휴장 등)은 건너뜁니다.
    pub async fn daily_bars(&self, code: &StockCode, count: usize) -> Result<Vec<DailyBar>> {
        let result = self.fetch_chart(code, Self::range_for(count)).await?;

        let timestamps = result
            .timestamp
            .ok_or_else(|| DataError::NotFound(format!("타임스탬프 없음: {}", code)))?;
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::NotFound(format!("시세 블록 없음: {}", code)))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let (open, high, low, close) = match (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) {
                (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
                _ => continue,
            };

            let date = Utc
                .timestamp_opt(*ts, 0)
                .single()
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::Parse(format!("잘못된 타임스탬프: {}", ts)))?;

            bars.push(DailyBar {
                code: code.clone(),
                date,
                open: to_price(open)?,
                high: to_price(high)?,
                low: to_price(low)?,
                close: to_price(close)?,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }

        // 최신 count개만 유지
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }

        debug!(symbol = %code, count = bars.len(), "차트 일봉 조회 완료");
        Ok(bars)
    }

    /// 차트 메타데이터를 조회합니다 (실시간가, 52주 고저, 상장주식수).
    pub async fn quote_meta(&self, code: &StockCode) -> Result<ChartMeta> {
        let result = self.fetch_chart(code, "1y").await?;
        Ok(result.meta)
    }
}

fn to_price(value: f64) -> Result<Decimal> {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| DataError::Parse(format!("가격 변환 실패: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> String {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 71200.0,
                        "chartPreviousClose": 70500.0,
                        "fiftyTwoWeekHigh": 88800.0,
                        "fiftyTwoWeekLow": 49900.0,
                        "sharesOutstanding": 5969782550i64
                    },
                    "timestamp": [1755993600, 1756080000, 1756166400],
                    "indicators": {
                        "quote": [{
                            "open": [70000.0, 70500.0, null],
                            "high": [71000.0, 71500.0, null],
                            "low": [69500.0, 70000.0, null],
                            "close": [70500.0, 71200.0, null],
                            "volume": [12000000i64, 15000000i64, null]
                        }]
                    }
                }],
                "error": null
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_daily_bars_skips_null_entries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v8/finance/chart/005930.KS")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(sample_body())
            .create_async()
            .await;

        let provider = ChartProvider::with_base_url(server.url()).unwrap();
        let code = StockCode::new("005930").unwrap();
        let bars = provider.daily_bars(&code, 30).await.unwrap();

        mock.assert_async().await;
        // null 항목 하나는 건너뜀
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, Decimal::from(71200));
        assert!(bars[0].date < bars[1].date);
    }

    #[tokio::test]
    async fn test_quote_meta_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v8/finance/chart/005930.KS")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(sample_body())
            .create_async()
            .await;

        let provider = ChartProvider::with_base_url(server.url()).unwrap();
        let code = StockCode::new("005930").unwrap();
        let meta = provider.quote_meta(&code).await.unwrap();

        assert_eq!(meta.regular_market_price, Some(71200.0));
        assert_eq!(meta.fifty_two_week_low, Some(49900.0));
        assert_eq!(meta.shares_outstanding, Some(5_969_782_550));
    }

    #[tokio::test]
    async fn test_http_error_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v8/finance/chart/005930.KS")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let provider = ChartProvider::with_base_url(server.url()).unwrap();
        let code = StockCode::new("005930").unwrap();
        let err = provider.daily_bars(&code, 30).await.unwrap_err();

        assert!(matches!(err, DataError::ApiError { .. }));
    }

    #[test]
    fn test_range_selection() {
        assert_eq!(ChartProvider::range_for(5), "5d");
        assert_eq!(ChartProvider::range_for(30), "3mo");
        assert_eq!(ChartProvider::range_for(250), "1y");
        assert_eq!(ChartProvider::range_for(400), "2y");
    }
}

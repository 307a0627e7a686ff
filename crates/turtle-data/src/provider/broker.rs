//! 증권사 REST API 클라이언트.
//!
//! OAuth 2.0 client_credentials 토큰 발급 후 Bearer 인증으로
//! 현재가/일봉/계좌평가 엔드포인트를 호출합니다.
//!
//! # 필드 매핑
//!
//! | 제공자 필드             | 의미               |
//! |------------------------|--------------------|
//! | `stck_prpr`            | 주식 현재가        |
//! | `dt`/`op_pric`/`hg_pric`/`lw_pric`/`cls_pric`/`tr_vol` | 일봉 OHLCV |
//! | `prsm_dpst_aset_amt`   | 추정예탁자산금액   |
//! | `tot_evlt_amt`         | 총평가금액         |
//! | `tot_pur_amt`          | 총매입금액         |
//! | `acnt_evlt_remn_indv_tot` | 보유종목 배열   |
//! | `qty`/`avg_pric`/`prsnt_pric`/`evlt_pl` | 수량/평균단가/현재가/평가손익 |

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Seoul;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use turtle_core::{BrokerConfig, BrokerPosition, DailyBar, StockCode};

use crate::error::{DataError, Result};

/// 토큰 갱신 임계값 (남은 시간이 이 값보다 적으면 갱신).
const TOKEN_REFRESH_THRESHOLD_MINUTES: i64 = 10;

/// 토큰 발급 응답.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// 접근 토큰
    token: Option<String>,
    /// 만료 시각 ("YYYYMMDDHHMMSS", KST)
    expires_dt: Option<String>,
    return_code: Option<i32>,
    return_msg: Option<String>,
}

/// 만료 추적이 포함된 토큰 상태.
#[derive(Debug, Clone)]
struct TokenState {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    fn is_expired_or_expiring(&self) -> bool {
        let threshold = Utc::now() + Duration::minutes(TOKEN_REFRESH_THRESHOLD_MINUTES);
        self.expires_at <= threshold
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    rt_cd: Option<String>,
    msg1: Option<String>,
    output: Option<QuoteOutput>,
}

#[derive(Debug, Deserialize)]
struct QuoteOutput {
    /// 주식 현재가
    stck_prpr: String,
}

#[derive(Debug, Deserialize)]
struct ChartApiResponse {
    return_code: Option<i32>,
    return_msg: Option<String>,
    #[serde(default)]
    chart_data: Vec<ChartRow>,
}

#[derive(Debug, Deserialize)]
struct ChartRow {
    /// 거래일 ("YYYYMMDD")
    dt: String,
    op_pric: Option<String>,
    hg_pric: Option<String>,
    lw_pric: Option<String>,
    cls_pric: Option<String>,
    tr_vol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    return_code: Option<i32>,
    return_msg: Option<String>,
    /// 추정예탁자산금액
    prsm_dpst_aset_amt: Option<String>,
    /// 총평가금액
    tot_evlt_amt: Option<String>,
    /// 총매입금액
    tot_pur_amt: Option<String>,
    #[serde(default)]
    acnt_evlt_remn_indv_tot: Vec<HoldingRow>,
}

#[derive(Debug, Deserialize)]
struct HoldingRow {
    stk_cd: Option<String>,
    stk_nm: Option<String>,
    qty: Option<String>,
    avg_pric: Option<String>,
    prsnt_pric: Option<String>,
    evlt_pl: Option<String>,
}

/// 계좌 요약.
#[derive(Debug, Clone)]
pub struct AccountSummary {
    /// 추정예탁자산 (원)
    pub total_asset: Decimal,
    /// 보유종목 평가금액 합계 (원)
    pub stock_value: Decimal,
    /// 현금 = 총자산 - 평가금액
    pub cash: Decimal,
}

/// 증권사 API 클라이언트.
///
/// 토큰은 내부에서 캐시하며 만료 임박 시 자동 재발급합니다.
pub struct BrokerClient {
    config: BrokerConfig,
    client: Client,
    token: Arc<RwLock<Option<TokenState>>>,
}

impl BrokerClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(config: BrokerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| DataError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self {
            config,
            client,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// 유효한 인증 헤더 값을 확보합니다. 필요 시 토큰을 재발급합니다.
    async fn ensure_token(&self) -> Result<String> {
        {
            let guard = self.token.read().await;
            if let Some(state) = guard.as_ref() {
                if !state.is_expired_or_expiring() {
                    return Ok(state.auth_header());
                }
            }
        }

        let mut guard = self.token.write().await;
        // 쓰기 잠금 대기 중 다른 태스크가 갱신했을 수 있음
        if let Some(state) = guard.as_ref() {
            if !state.is_expired_or_expiring() {
                return Ok(state.auth_header());
            }
        }

        let state = self.issue_token().await?;
        let header = state.auth_header();
        info!(expires_at = %state.expires_at, "증권사 토큰 발급 완료");
        *guard = Some(state);
        Ok(header)
    }

    async fn issue_token(&self) -> Result<TokenState> {
        let url = format!("{}/oauth2/token", self.config.base_url);
        let body = json!({
            "grant_type": "client_credentials",
            "appkey": self.config.app_key,
            "secretkey": self.config.app_secret,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let parsed: TokenResponse = response.json().await?;

        if !status.is_success() {
            return Err(DataError::Unauthorized(format!(
                "토큰 발급 실패 ({}): {}",
                status,
                parsed.return_msg.unwrap_or_default()
            )));
        }

        let token = parsed.token.ok_or_else(|| {
            DataError::Unauthorized(format!(
                "토큰 발급 실패 (코드 {:?}): {}",
                parsed.return_code,
                parsed.return_msg.unwrap_or_default()
            ))
        })?;

        let expires_at = parsed
            .expires_dt
            .as_deref()
            .and_then(parse_kst_datetime)
            .unwrap_or_else(|| Utc::now() + Duration::hours(24));

        Ok(TokenState {
            access_token: token,
            expires_at,
        })
    }

    /// 현재가를 조회합니다.
    pub async fn current_price(&self, code: &StockCode) -> Result<Decimal> {
        let auth = self.ensure_token().await?;
        let url = format!(
            "{}/uapi/domestic-stock/v1/quotations/inquire-price",
            self.config.base_url
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", auth)
            .header("appkey", &self.config.app_key)
            .header("appsecret", &self.config.app_secret)
            .header("tr_id", "FHKST01010100")
            .query(&[
                ("fid_cond_mrkt_div_code", "J"),
                ("fid_input_iscd", code.as_str()),
            ])
            .send()
            .await?;

        let parsed: QuoteResponse = response.json().await?;
        if parsed.rt_cd.as_deref() != Some("0") {
            return Err(DataError::ApiError {
                code: parsed.rt_cd.unwrap_or_default(),
                message: parsed.msg1.unwrap_or_else(|| "현재가 조회 실패".to_string()),
            });
        }

        let output = parsed
            .output
            .ok_or_else(|| DataError::Parse(format!("현재가 응답 본문 없음: {}", code)))?;
        parse_decimal(&output.stck_prpr)
    }

    /// 최근 `days` 거래일의 일봉을 조회합니다 (과거→최신 순).
    ///
    /// 제공자 응답은 최신-우선이므로 여기서 뒤집어 반환합니다.
    pub async fn daily_bars(&self, code: &StockCode, days: usize) -> Result<Vec<DailyBar>> {
        let auth = self.ensure_token().await?;
        let url = format!("{}/api/dostk/chart", self.config.base_url);
        let base_dt = Utc::now().with_timezone(&Seoul).format("%Y%m%d").to_string();

        let body = json!({
            "stk_cd": code.as_str(),
            "base_dt": base_dt,
            "upd_stkpc_tp": "1",
        });

        let response = self
            .client
            .post(&url)
            .header("authorization", auth)
            .header("cont-yn", "N")
            .header("next-key", "")
            .header("api-id", "ka10081")
            .json(&body)
            .send()
            .await?;

        let parsed: ChartApiResponse = response.json().await?;
        if parsed.return_code != Some(0) {
            return Err(DataError::ApiError {
                code: parsed.return_code.map(|c| c.to_string()).unwrap_or_default(),
                message: parsed.return_msg.unwrap_or_else(|| "일봉 조회 실패".to_string()),
            });
        }

        let mut bars = Vec::new();
        for row in parsed.chart_data.into_iter().take(days) {
            let date = NaiveDate::parse_from_str(&row.dt, "%Y%m%d")
                .map_err(|e| DataError::Parse(format!("일봉 날짜 파싱 실패 {}: {}", row.dt, e)))?;
            bars.push(DailyBar {
                code: code.clone(),
                date,
                open: parse_decimal(row.op_pric.as_deref().unwrap_or("0"))?,
                high: parse_decimal(row.hg_pric.as_deref().unwrap_or("0"))?,
                low: parse_decimal(row.lw_pric.as_deref().unwrap_or("0"))?,
                close: parse_decimal(row.cls_pric.as_deref().unwrap_or("0"))?,
                volume: parse_decimal(row.tr_vol.as_deref().unwrap_or("0"))?
                    .to_i64()
                    .unwrap_or(0),
            });
        }
        bars.reverse();

        debug!(symbol = %code, count = bars.len(), "증권사 일봉 조회 완료");
        Ok(bars)
    }

    /// 계좌평가 잔고와 보유종목을 조회합니다.
    pub async fn account_positions(&self) -> Result<(AccountSummary, Vec<BrokerPosition>)> {
        let auth = self.ensure_token().await?;
        let url = format!("{}/api/dostk/acnt", self.config.base_url);

        // qry_tp 1:합산, dmst_stex_tp KRX:한국거래소
        let body = json!({ "qry_tp": "1", "dmst_stex_tp": "KRX" });

        let response = self
            .client
            .post(&url)
            .header("authorization", auth)
            .header("cont-yn", "N")
            .header("next-key", "")
            .header("api-id", "kt00018")
            .json(&body)
            .send()
            .await?;

        let parsed: AccountResponse = response.json().await?;
        if parsed.return_code != Some(0) {
            return Err(DataError::ApiError {
                code: parsed.return_code.map(|c| c.to_string()).unwrap_or_default(),
                message: parsed.return_msg.unwrap_or_else(|| "계좌 조회 실패".to_string()),
            });
        }

        let total_asset = parse_decimal(parsed.prsm_dpst_aset_amt.as_deref().unwrap_or("0"))?;
        let stock_value = parse_decimal(parsed.tot_evlt_amt.as_deref().unwrap_or("0"))?;
        let summary = AccountSummary {
            total_asset,
            stock_value,
            cash: total_asset - stock_value,
        };

        let mut positions = Vec::new();
        for row in parsed.acnt_evlt_remn_indv_tot {
            let quantity = parse_decimal(row.qty.as_deref().unwrap_or("0"))?
                .to_i64()
                .unwrap_or(0);
            if quantity <= 0 {
                continue;
            }

            // 종목 코드에 "A" 접두사가 붙어 오는 경우가 있음
            let raw_code = row.stk_cd.unwrap_or_default();
            let code = match StockCode::new(raw_code.trim_start_matches('A')) {
                Ok(code) => code,
                Err(_) => {
                    warn!(raw = %raw_code, "보유종목 코드 형식 불일치, 건너뜀");
                    continue;
                }
            };

            let avg_price = parse_decimal(row.avg_pric.as_deref().unwrap_or("0"))?;
            let current_price = parse_decimal(row.prsnt_pric.as_deref().unwrap_or("0"))?;
            let unrealized_pl = parse_signed_decimal(row.evlt_pl.as_deref().unwrap_or("0"))?;

            let cost = avg_price * Decimal::from(quantity);
            let pl_rate = if cost > Decimal::ZERO {
                (unrealized_pl / cost * Decimal::from(100))
                    .round_dp(2)
                    .to_f64()
                    .unwrap_or(0.0)
            } else {
                0.0
            };

            positions.push(BrokerPosition {
                code,
                name: row.stk_nm.unwrap_or_default(),
                quantity,
                avg_price,
                current_price,
                unrealized_pl,
                pl_rate,
            });
        }

        info!(
            total_asset = %summary.total_asset,
            positions = positions.len(),
            "계좌 조회 완료"
        );
        Ok((summary, positions))
    }
}

/// 부호 접두사를 제거하고 절대값으로 파싱합니다 (가격 필드용).
fn parse_decimal(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim().trim_start_matches(['+', '-']);
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    trimmed
        .replace(',', "")
        .parse()
        .map_err(|e| DataError::Parse(format!("숫자 파싱 실패 '{}': {}", raw, e)))
}

/// 부호를 유지한 채 파싱합니다 (손익 필드용).
fn parse_signed_decimal(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim().trim_start_matches('+');
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    trimmed
        .replace(',', "")
        .parse()
        .map_err(|e| DataError::Parse(format!("숫자 파싱 실패 '{}': {}", raw, e)))
}

/// "YYYYMMDDHHMMSS" (KST) 형식을 UTC로 변환합니다.
fn parse_kst_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S").ok()?;
    Seoul
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> BrokerConfig {
        BrokerConfig {
            app_key: "test-key".to_string(),
            app_secret: "test-secret".to_string(),
            account_no: "12345678".to_string(),
            base_url,
        }
    }

    fn mock_token(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "token": "abc123",
                    "expires_dt": "20991231235959",
                    "return_code": 0
                })
                .to_string(),
            )
            .create()
    }

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal("71200").unwrap(), Decimal::from(71200));
        assert_eq!(parse_decimal("+71200").unwrap(), Decimal::from(71200));
        assert_eq!(parse_decimal("-71200").unwrap(), Decimal::from(71200));
        assert_eq!(parse_decimal("").unwrap(), Decimal::ZERO);
        assert_eq!(
            parse_signed_decimal("-12500").unwrap(),
            Decimal::from(-12500)
        );
        assert_eq!(parse_signed_decimal("+300").unwrap(), Decimal::from(300));
    }

    #[test]
    fn test_parse_kst_datetime() {
        let dt = parse_kst_datetime("20260825150000").unwrap();
        // KST 15:00 == UTC 06:00
        assert_eq!(dt.format("%H:%M").to_string(), "06:00");
        assert!(parse_kst_datetime("invalid").is_none());
    }

    #[tokio::test]
    async fn test_current_price_with_token_exchange() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = mock_token(&mut server);
        let quote_mock = server
            .mock("GET", "/uapi/domestic-stock/v1/quotations/inquire-price")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "rt_cd": "0",
                    "output": { "stck_prpr": "71200" }
                })
                .to_string(),
            )
            .create();

        let client = BrokerClient::new(test_config(server.url())).unwrap();
        let code = StockCode::new("005930").unwrap();
        let price = client.current_price(&code).await.unwrap();

        token_mock.assert();
        quote_mock.assert();
        assert_eq!(price, Decimal::from(71200));
    }

    #[tokio::test]
    async fn test_token_reused_across_calls() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = mock_token(&mut server).expect(1);
        server
            .mock("GET", "/uapi/domestic-stock/v1/quotations/inquire-price")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                serde_json::json!({ "rt_cd": "0", "output": { "stck_prpr": "1000" } })
                    .to_string(),
            )
            .expect(2)
            .create();

        let client = BrokerClient::new(test_config(server.url())).unwrap();
        let code = StockCode::new("005930").unwrap();
        client.current_price(&code).await.unwrap();
        client.current_price(&code).await.unwrap();

        token_mock.assert();
    }

    #[tokio::test]
    async fn test_daily_bars_reversed_to_oldest_first() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server);
        server
            .mock("POST", "/api/dostk/chart")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "return_code": 0,
                    "chart_data": [
                        { "dt": "20260825", "op_pric": "70500", "hg_pric": "71500",
                          "lw_pric": "70000", "cls_pric": "71200", "tr_vol": "15000000" },
                        { "dt": "20260824", "op_pric": "70000", "hg_pric": "71000",
                          "lw_pric": "69500", "cls_pric": "70500", "tr_vol": "12000000" }
                    ]
                })
                .to_string(),
            )
            .create();

        let client = BrokerClient::new(test_config(server.url())).unwrap();
        let code = StockCode::new("005930").unwrap();
        let bars = client.daily_bars(&code, 30).await.unwrap();

        assert_eq!(bars.len(), 2);
        assert!(bars[0].date < bars[1].date);
        assert_eq!(bars[1].close, Decimal::from(71200));
    }

    #[tokio::test]
    async fn test_account_positions_parsing() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server);
        server
            .mock("POST", "/api/dostk/acnt")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "return_code": 0,
                    "prsm_dpst_aset_amt": "50000000",
                    "tot_evlt_amt": "14240000",
                    "tot_pur_amt": "14000000",
                    "acnt_evlt_remn_indv_tot": [
                        { "stk_cd": "A005930", "stk_nm": "삼성전자", "qty": "200",
                          "avg_pric": "70000", "prsnt_pric": "71200", "evlt_pl": "+240000" },
                        { "stk_cd": "A000660", "stk_nm": "SK하이닉스", "qty": "0",
                          "avg_pric": "0", "prsnt_pric": "0", "evlt_pl": "0" }
                    ]
                })
                .to_string(),
            )
            .create();

        let client = BrokerClient::new(test_config(server.url())).unwrap();
        let (summary, positions) = client.account_positions().await.unwrap();

        assert_eq!(summary.cash, Decimal::from(35_760_000));
        // 수량 0 종목은 제외
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].code.as_str(), "005930");
        assert_eq!(positions[0].unrealized_pl, Decimal::from(240_000));
        // 240,000 / 14,000,000 = 1.71%
        assert!((positions[0].pl_rate - 1.71).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_auth_failure_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(401)
            .with_body(
                serde_json::json!({ "return_code": 3, "return_msg": "앱키 확인" }).to_string(),
            )
            .create();

        let client = BrokerClient::new(test_config(server.url())).unwrap();
        let code = StockCode::new("005930").unwrap();
        let err = client.current_price(&code).await.unwrap_err();

        assert!(matches!(err, DataError::Unauthorized(_)));
        assert!(err.is_fatal());
    }
}

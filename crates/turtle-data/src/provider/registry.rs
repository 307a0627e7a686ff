//! 재무정보 레지스트리(DART) API 클라이언트.
//!
//! API 키 인증으로 사업보고서(reprt_code 11011)의 다중계정 재무제표와
//! 상장주식수를 조회합니다. 계정 과목은 고정 스키마가 아니라 한글
//! 레이블이므로, 표준 필드별 후보 레이블 목록(별칭 테이블)으로
//! 첫-일치 우선 추출합니다.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use turtle_core::{RegistryConfig, StockCode};

use crate::error::{DataError, Result};

/// 금액을 억원으로 환산하는 분모.
const EOK_WON: i64 = 100_000_000;

/// 표준 재무 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Revenue,
    NetIncome,
    OperatingIncome,
    TotalAssets,
    TotalEquity,
}

/// 표준 필드 → 계정 과목 레이블 후보 (우선순위 순).
///
/// 제공자 응답의 `account_nm`에 부분 문자열로 매칭하며,
/// 필드마다 가장 먼저 일치한 행을 사용합니다.
const ACCOUNT_ALIASES: &[(AccountField, &[&str])] = &[
    (AccountField::Revenue, &["매출액", "영업수익"]),
    (AccountField::NetIncome, &["당기순이익"]),
    (AccountField::OperatingIncome, &["영업이익"]),
    (AccountField::TotalAssets, &["자산총계"]),
    (AccountField::TotalEquity, &["자본총계"]),
];

/// 알려진 대형주의 기업코드 테이블. 벌크 XML 다운로드 전 1차 해석용.
const CORP_CODES: &[(&str, &str, &str)] = &[
    ("005930", "00126380", "삼성전자"),
    ("000660", "00164779", "SK하이닉스"),
    ("035420", "00593624", "NAVER"),
    ("005380", "00164742", "현대차"),
    ("012330", "00268317", "현대모비스"),
    ("000270", "00164509", "기아"),
    ("105560", "00103522", "KB금융"),
    ("055550", "00126186", "신한지주"),
    ("035720", "00593652", "카카오"),
    ("051910", "00356370", "LG화학"),
    ("006400", "00126343", "삼성SDI"),
    ("096770", "00126362", "SK이노베이션"),
    ("017670", "00164765", "SK텔레콤"),
    ("034730", "00164731", "SK"),
    ("009150", "00126349", "삼성전기"),
    ("042700", "00164787", "한미반도체"),
    ("251270", "00593651", "넷마블"),
    ("036570", "00593625", "엔씨소프트"),
    ("352820", "00593659", "하이브"),
    ("259960", "00593655", "크래프톤"),
];

/// 3개년 재무제표 (과거→최신 순).
#[derive(Debug, Clone)]
pub struct ThreeYearStatement {
    /// 회계연도 3개 (과거→최신)
    pub years: [i32; 3],
    /// 연도별 매출액 (억원)
    pub revenue: [Decimal; 3],
    /// 연도별 당기순이익 (억원)
    pub net_income: [Decimal; 3],
    /// 회사명 (기업코드 테이블 기준)
    pub company_name: String,
}

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    list: Vec<AccountRow>,
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    /// 계정 과목명
    account_nm: Option<String>,
    /// 당기 금액
    thstrm_amount: Option<String>,
    /// 전기 금액
    frmtrm_amount: Option<String>,
    /// 전전기 금액
    bfefrmtrm_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SharesResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    list: Vec<SharesRow>,
}

#[derive(Debug, Deserialize)]
struct SharesRow {
    /// 발행(상장)주식 총수
    istc_totqy: Option<String>,
}

/// 레지스트리 클라이언트.
pub struct RegistryClient {
    config: RegistryConfig,
    client: Client,
}

impl RegistryClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| DataError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 종목 코드에 대응하는 기업코드와 회사명을 해석합니다.
    pub fn corp_code(code: &StockCode) -> Option<(&'static str, &'static str)> {
        CORP_CODES
            .iter()
            .find(|(stock, _, _)| *stock == code.as_str())
            .map(|(_, corp, name)| (*corp, *name))
    }

    /// 별칭 테이블로 계정 과목 행을 찾습니다 (첫-일치 우선).
    fn find_account<'a>(rows: &'a [AccountRow], field: AccountField) -> Option<&'a AccountRow> {
        let aliases = ACCOUNT_ALIASES
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| *aliases)?;

        for alias in aliases {
            if let Some(row) = rows
                .iter()
                .find(|r| r.account_nm.as_deref().is_some_and(|nm| nm.contains(alias)))
            {
                return Some(row);
            }
        }
        None
    }

    /// 최근 3개년 매출/순이익을 한 번의 다중계정 조회로 가져옵니다.
    ///
    /// `target_year`가 당기이며, 전기/전전기 금액이 같은 행에 실려 옵니다.
    pub async fn three_year_statement(
        &self,
        code: &StockCode,
        target_year: i32,
    ) -> Result<ThreeYearStatement> {
        let (corp_code, company_name) = Self::corp_code(code)
            .ok_or_else(|| DataError::NotFound(format!("기업코드 없음: {}", code)))?;

        let url = format!("{}/fnlttMultiAcnt.json", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("crtfc_key", self.config.api_key.as_str()),
                ("corp_code", corp_code),
                ("bsns_year", &target_year.to_string()),
                // 사업보고서
                ("reprt_code", "11011"),
            ])
            .send()
            .await?;

        let parsed: RegistryResponse = response.json().await?;
        if parsed.status != "000" {
            return Err(registry_error(parsed.status, parsed.message, code));
        }

        let revenue_row = Self::find_account(&parsed.list, AccountField::Revenue)
            .ok_or_else(|| DataError::NotFound(format!("매출액 계정 없음: {}", code)))?;
        let net_income_row = Self::find_account(&parsed.list, AccountField::NetIncome)
            .ok_or_else(|| DataError::NotFound(format!("당기순이익 계정 없음: {}", code)))?;

        let statement = ThreeYearStatement {
            years: [target_year - 2, target_year - 1, target_year],
            revenue: [
                parse_eok_won(revenue_row.bfefrmtrm_amount.as_deref())?,
                parse_eok_won(revenue_row.frmtrm_amount.as_deref())?,
                parse_eok_won(revenue_row.thstrm_amount.as_deref())?,
            ],
            net_income: [
                parse_eok_won(net_income_row.bfefrmtrm_amount.as_deref())?,
                parse_eok_won(net_income_row.frmtrm_amount.as_deref())?,
                parse_eok_won(net_income_row.thstrm_amount.as_deref())?,
            ],
            company_name: company_name.to_string(),
        };

        debug!(
            symbol = %code,
            years = ?statement.years,
            "3개년 재무제표 조회 완료"
        );
        Ok(statement)
    }

    /// 상장주식수를 조회합니다.
    pub async fn shares_outstanding(&self, code: &StockCode, year: i32) -> Result<i64> {
        let (corp_code, _) = Self::corp_code(code)
            .ok_or_else(|| DataError::NotFound(format!("기업코드 없음: {}", code)))?;

        let url = format!("{}/stockTotqySttus.json", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("crtfc_key", self.config.api_key.as_str()),
                ("corp_code", corp_code),
                ("bsns_year", &year.to_string()),
                ("reprt_code", "11011"),
            ])
            .send()
            .await?;

        let parsed: SharesResponse = response.json().await?;
        if parsed.status != "000" {
            return Err(registry_error(parsed.status, parsed.message, code));
        }

        parsed
            .list
            .first()
            .and_then(|row| row.istc_totqy.as_deref())
            .and_then(|raw| raw.replace(',', "").parse().ok())
            .ok_or_else(|| {
                warn!(symbol = %code, "상장주식수 필드 없음");
                DataError::NotFound(format!("상장주식수 없음: {}", code))
            })
    }
}

fn registry_error(status: String, message: Option<String>, code: &StockCode) -> DataError {
    let message = message.unwrap_or_default();
    match status.as_str() {
        // 013: 조회 데이터 없음
        "013" => DataError::NotFound(format!("{}: {}", code, message)),
        // 010/011: 미등록/만료 키
        "010" | "011" => DataError::Unauthorized(message),
        _ => DataError::ApiError { code: status, message },
    }
}

/// 쉼표 포함 원 단위 금액을 억원 Decimal로 변환합니다.
fn parse_eok_won(raw: Option<&str>) -> Result<Decimal> {
    let raw = raw.unwrap_or("0").trim();
    if raw.is_empty() || raw == "-" {
        return Ok(Decimal::ZERO);
    }
    let won: i64 = raw
        .replace(',', "")
        .parse()
        .map_err(|e| DataError::Parse(format!("금액 파싱 실패 '{}': {}", raw, e)))?;
    Ok((Decimal::from(won) / Decimal::from(EOK_WON)).round_dp(1))
}

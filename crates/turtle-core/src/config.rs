//! 환경변수 기반 설정 모듈.

use rust_decimal::Decimal;
use std::time::Duration;

use crate::types::StockCode;

/// 서비스 전체 설정.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP 서버 설정
    pub api: ApiConfig,
    /// 증권사 API 설정 (미설정 시 해당 티어 건너뜀)
    pub broker: Option<BrokerConfig>,
    /// 재무정보 레지스트리 API 설정
    pub registry: Option<RegistryConfig>,
    /// 분석/수집 설정
    pub analysis: AnalysisConfig,
}

/// HTTP 서버 설정.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// 바인딩 호스트
    pub host: String,
    /// 바인딩 포트
    pub port: u16,
    /// 외부 자동화 플랫폼용 공유 시크릿
    pub api_secret: Option<String>,
}

/// 증권사 REST API 설정.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// 앱 키
    pub app_key: String,
    /// 앱 시크릿
    pub app_secret: String,
    /// 계좌번호
    pub account_no: String,
    /// API 베이스 URL
    pub base_url: String,
}

/// 재무정보 레지스트리 API 설정.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// API 키
    pub api_key: String,
    /// API 베이스 URL
    pub base_url: String,
}

/// 분석/수집 설정.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// 총 투자 예산 (원)
    pub investment_budget: Decimal,
    /// 배치당 종목 수
    pub batch_size: usize,
    /// 배치 간 딜레이 (밀리초)
    pub batch_delay_ms: u64,
    /// 감시 종목 오버라이드 (미설정 시 기본 유니버스 사용)
    pub watchlist: Option<Vec<StockCode>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            investment_budget: Decimal::from(10_000_000),
            batch_size: 5,
            batch_delay_ms: 2_000,
            watchlist: None,
        }
    }
}

impl AnalysisConfig {
    /// 배치 간 딜레이를 Duration으로 반환합니다.
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl AppConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 증권사/레지스트리 자격증명은 선택 사항이며, 없으면 해당 제공자
    /// 티어를 건너뛰고 다음 폴백으로 넘어갑니다.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let broker = match (
            std::env::var("KIWOOM_APP_KEY").ok(),
            std::env::var("KIWOOM_APP_SECRET").ok(),
        ) {
            (Some(app_key), Some(app_secret)) => Some(BrokerConfig {
                app_key,
                app_secret,
                account_no: std::env::var("KIWOOM_ACCOUNT_NO").unwrap_or_default(),
                base_url: std::env::var("KIWOOM_BASE_URL")
                    .unwrap_or_else(|_| "https://api.kiwoom.com".to_string()),
            }),
            _ => None,
        };

        let registry = std::env::var("DART_API_KEY").ok().map(|api_key| RegistryConfig {
            api_key,
            base_url: std::env::var("DART_BASE_URL")
                .unwrap_or_else(|_| "https://opendart.fss.or.kr/api".to_string()),
        });

        let watchlist = std::env::var("WATCHLIST").ok().map(|raw| {
            raw.split(',')
                .filter_map(|s| StockCode::new(s.trim()).ok())
                .collect()
        });

        Self {
            api: ApiConfig {
                host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_var_parse("API_PORT", 3000),
                api_secret: std::env::var("MAKE_API_KEY").ok(),
            },
            broker,
            registry,
            analysis: AnalysisConfig {
                investment_budget: env_var_parse(
                    "INVESTMENT_BUDGET",
                    Decimal::from(10_000_000),
                ),
                batch_size: env_var_parse("COLLECT_BATCH_SIZE", 5),
                batch_delay_ms: env_var_parse("COLLECT_BATCH_DELAY_MS", 2_000),
                watchlist,
            },
        }
    }
}

/// 환경변수 값을 파싱합니다 (실패 시 기본값 사용).
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

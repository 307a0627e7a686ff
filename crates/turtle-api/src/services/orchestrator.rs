//! 분석 오케스트레이터.
//!
//! 시세 해석기, 재무 캐시, 분석기, 포트폴리오 추적기를 묶어 전체
//! 분석 흐름을 실행합니다. 종목은 배치 단위로 동시 처리하며 배치
//! 사이에만 딜레이를 둡니다. 종목 하나의 실패가 전체 실행을 중단하지
//! 않습니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use turtle_analytics::{
    indicators, Evaluation, SellCheck, SuperstocksAnalyzer, TurtleAnalyzer,
};
use turtle_core::{
    AnalysisConfig, FiscalCalendar, Provenance, RiskSummary, ScreeningCriteria, Signal,
    SignalKind, StockCode, TurtlePosition,
};
use turtle_data::{
    BrokerClient, FinancialDataCache, PriceResolver, SignalStore, StockNames,
};
use turtle_portfolio::PortfolioTracker;

use crate::services::summary;

/// 기본 감시 유니버스. WATCHLIST 환경변수로 오버라이드할 수 있습니다.
const DEFAULT_UNIVERSE: &[&str] = &[
    "005930", "000660", "035420", "005380", "012330", "000270", "051910", "035720", "251270",
    "036570", "352820", "326030", "145020", "042700", "259960", "196170", "328130",
];

/// 돌파 판정에 필요한 일봉 수 (지표 창 20 + 당일 봉).
const ANALYSIS_BAR_COUNT: usize = 25;

/// 통합 분석 요약.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// 분석한 종목 수
    pub analyzed_count: usize,
    /// 스크리닝 통과 종목 수
    pub qualified_count: usize,
    /// 매수 시그널 수
    pub buy_signal_count: usize,
    /// 매도 시그널 수
    pub sell_signal_count: usize,
    /// 프리미엄 기회 수 (매수 시그널 ∩ 스크리닝 통과)
    pub premium_count: usize,
    /// 분석 시각
    pub analyzed_at: DateTime<Utc>,
}

/// 터틀 시그널 섹션.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurtleSection {
    pub signals: Vec<Signal>,
}

/// 프리미엄 기회: 돌파 매수 시그널과 스크리닝 통과가 겹친 종목.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumOpportunity {
    pub code: StockCode,
    pub name: String,
    pub current_price: Decimal,
    /// 스크리닝 점수
    pub score: u32,
    pub psr: f64,
    /// 시그널 거래량 배수
    pub volume_ratio: f64,
}

/// 보유 포지션 매도 경보.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellAlert {
    pub code: StockCode,
    pub name: String,
    pub pl_rate: f64,
    #[serde(flatten)]
    pub check: SellCheck,
}

/// 포트폴리오 섹션.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReport {
    pub positions: Vec<TurtlePosition>,
    pub sell_alerts: Vec<SellAlert>,
    pub risk_summary: RiskSummary,
}

/// 외부 자동화 플랫폼용 통합 분석 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeAnalysisReport {
    pub summary: AnalysisSummary,
    pub qualified_stocks: Vec<Evaluation>,
    pub turtle_trading: TurtleSection,
    pub premium_opportunities: Vec<PremiumOpportunity>,
    /// 증권사 미설정 시 생략
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<PortfolioReport>,
    pub slack_message: String,
}

/// 분석 오케스트레이터.
pub struct Orchestrator {
    resolver: Arc<PriceResolver>,
    cache: Arc<FinancialDataCache>,
    signals: Arc<dyn SignalStore>,
    names: Arc<StockNames>,
    broker: Option<Arc<BrokerClient>>,
    tracker: Arc<PortfolioTracker>,
    analysis: AnalysisConfig,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<PriceResolver>,
        cache: Arc<FinancialDataCache>,
        signals: Arc<dyn SignalStore>,
        names: Arc<StockNames>,
        broker: Option<Arc<BrokerClient>>,
        tracker: Arc<PortfolioTracker>,
        analysis: AnalysisConfig,
    ) -> Self {
        Self {
            resolver,
            cache,
            signals,
            names,
            broker,
            tracker,
            analysis,
        }
    }

    /// 예산을 명시적으로 받아 분석기를 만듭니다. 전역 변수 대신
    /// 호출 체인으로 전달되므로 요청별 오버라이드가 가능합니다.
    fn analyzer(&self, budget_override: Option<Decimal>) -> TurtleAnalyzer {
        TurtleAnalyzer::new(budget_override.unwrap_or(self.analysis.investment_budget))
    }

    /// 분석 대상 유니버스를 결정합니다.
    ///
    /// 우선순위: 요청 본문의 종목 목록 → WATCHLIST 설정 → 기본 유니버스.
    pub fn universe(&self, requested: Option<Vec<StockCode>>) -> Vec<StockCode> {
        if let Some(codes) = requested {
            if !codes.is_empty() {
                return codes;
            }
        }
        if let Some(watchlist) = &self.analysis.watchlist {
            if !watchlist.is_empty() {
                return watchlist.clone();
            }
        }
        DEFAULT_UNIVERSE
            .iter()
            .map(|code| StockCode::new_unchecked(*code))
            .collect()
    }

    /// 유니버스 전체를 터틀 분석합니다.
    ///
    /// 같은 날짜의 기존 시그널은 결과로 대체됩니다. 종목별 시그널은
    /// 자연 키 (종목, 종류, 날짜)로 중복 제거됩니다.
    pub async fn analyze(
        &self,
        requested: Option<Vec<StockCode>>,
        budget_override: Option<Decimal>,
    ) -> Vec<Signal> {
        let codes = self.universe(requested);
        let date = FiscalCalendar::today_seoul();
        let analyzer = self.analyzer(budget_override);
        info!(count = codes.len(), %date, "터틀 분석 시작");

        let mut signals: Vec<Signal> = Vec::new();
        let mut chunks = codes.chunks(self.analysis.batch_size.max(1)).peekable();
        while let Some(chunk) = chunks.next() {
            let batch =
                join_all(chunk.iter().map(|code| self.analyze_one(&analyzer, code, date))).await;
            signals.extend(batch.into_iter().flatten());

            if chunks.peek().is_some() {
                tokio::time::sleep(self.analysis.batch_delay()).await;
            }
        }

        // 자연 키 기준 중복 제거
        let mut seen = HashSet::new();
        signals.retain(|signal| seen.insert(signal.natural_key()));

        self.signals.replace_day(date, signals.clone()).await;
        info!(
            signals = signals.len(),
            buys = signals.iter().filter(|s| s.kind.is_buy()).count(),
            "터틀 분석 완료"
        );
        signals
    }

    /// 종목 하나를 분석합니다. 실패는 로그만 남기고 None을 반환합니다.
    async fn analyze_one(
        &self,
        analyzer: &TurtleAnalyzer,
        code: &StockCode,
        date: NaiveDate,
    ) -> Option<Signal> {
        let resolved = self.resolver.daily_bars(code, ANALYSIS_BAR_COUNT).await;
        let bars = indicators::recent_first(resolved.bars);

        let mut snapshot = match indicators::snapshot(&bars) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(symbol = %code, error = %e, "지표 계산 불가, 종목 건너뜀");
                return None;
            }
        };

        // 52주 고가/저가는 장기 시리즈 메타데이터에서 별도 조회
        if let Some((high, low)) = self.resolver.fifty_two_week(code).await {
            snapshot = snapshot.with_fifty_two_week(high, low);
        }

        let price = self.resolver.current_price(code).await;
        // 시그널 출처는 가격과 일봉 중 신뢰도가 낮은 쪽
        let provenance = lower_confidence(price.provenance, resolved.provenance);
        let name = self.names.resolve(code);

        analyzer.analyze(code, &name, date, price.price, &snapshot, provenance)
    }

    /// 슈퍼스톡스 조건 검색.
    ///
    /// 재무 데이터를 배치 수집한 뒤 전 종목을 평가합니다. 재무
    /// 데이터가 없는 종목은 건너뜁니다. 결과는 점수 내림차순입니다.
    pub async fn superstocks_search(
        &self,
        requested: Option<Vec<StockCode>>,
        criteria: ScreeningCriteria,
    ) -> Vec<Evaluation> {
        let codes = self.universe(requested);
        let analyzer = SuperstocksAnalyzer::new(criteria);

        let stats = self
            .cache
            .bulk_collect(&codes, self.analysis.batch_size.max(1))
            .await;
        stats.log_summary();

        let mut evaluations = Vec::new();
        for code in &codes {
            let mut snapshot = match self.cache.get(code).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    debug!(symbol = %code, error = %e, "재무 데이터 없음, 평가 건너뜀");
                    continue;
                }
            };
            self.names.learn(code, snapshot.company_name.clone());

            // 상장주식수가 없으면 시세 메타데이터의 힌트를 먼저 시도
            if snapshot.shares_outstanding <= 0 {
                if let Some(shares) = self.resolver.shares_outstanding_hint(code).await {
                    snapshot.shares_outstanding = shares;
                }
            }

            let price = self.resolver.current_price(code).await;
            evaluations.push(analyzer.evaluate(&snapshot, price.price));
        }

        evaluations.sort_by(|a, b| b.score.cmp(&a.score));
        info!(
            evaluated = evaluations.len(),
            qualified = evaluations.iter().filter(|e| e.qualified).count(),
            "슈퍼스톡스 검색 완료"
        );
        evaluations
    }

    /// 통합 분석: 터틀 시그널 + 스크리닝 + 포트폴리오 점검.
    ///
    /// 스크리닝 기준과 투자 예산은 호출자가 결정합니다. 예산이 None이면
    /// 설정값을 사용합니다.
    pub async fn make_analysis(
        &self,
        criteria: ScreeningCriteria,
        requested: Option<Vec<StockCode>>,
        budget_override: Option<Decimal>,
    ) -> MakeAnalysisReport {
        let signals = self.analyze(requested.clone(), budget_override).await;
        let evaluations = self.superstocks_search(requested.clone(), criteria).await;

        let qualified: Vec<Evaluation> = evaluations
            .iter()
            .filter(|e| e.qualified)
            .cloned()
            .collect();
        let qualified_codes: HashSet<&str> =
            qualified.iter().map(|e| e.code.as_str()).collect();

        // 프리미엄 기회: 돌파 매수와 스크리닝 통과가 겹치는 종목
        let premium: Vec<PremiumOpportunity> = signals
            .iter()
            .filter(|s| s.kind == SignalKind::Buy20 && qualified_codes.contains(s.code.as_str()))
            .filter_map(|signal| {
                let evaluation = qualified.iter().find(|e| e.code == signal.code)?;
                Some(PremiumOpportunity {
                    code: signal.code.clone(),
                    name: signal.name.clone(),
                    current_price: signal.current_price,
                    score: evaluation.score,
                    psr: evaluation.psr,
                    volume_ratio: signal.volume_ratio,
                })
            })
            .collect();

        let portfolio = self.sync_portfolio().await;

        let summary = AnalysisSummary {
            analyzed_count: self.universe(requested).len(),
            qualified_count: qualified.len(),
            buy_signal_count: signals.iter().filter(|s| s.kind.is_buy()).count(),
            sell_signal_count: signals.iter().filter(|s| !s.kind.is_buy()).count(),
            premium_count: premium.len(),
            analyzed_at: Utc::now(),
        };

        let slack_message =
            summary::slack_message(&summary, &qualified, &signals, &premium, portfolio.as_ref());

        MakeAnalysisReport {
            summary,
            qualified_stocks: qualified,
            turtle_trading: TurtleSection { signals },
            premium_opportunities: premium,
            portfolio,
            slack_message,
        }
    }

    /// 증권사 계좌를 동기화하고 보유 포지션의 매도 조건을 점검합니다.
    ///
    /// 증권사가 설정되지 않았거나 조회에 실패하면 None을 반환합니다.
    pub async fn sync_portfolio(&self) -> Option<PortfolioReport> {
        let broker = self.broker.as_ref()?;

        let (account, holdings) = match broker.account_positions().await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "계좌 조회 실패, 포트폴리오 점검 건너뜀");
                return None;
            }
        };
        debug!(
            total_asset = %account.total_asset,
            cash = %account.cash,
            holdings = holdings.len(),
            "계좌 조회 완료"
        );

        // 종목별 N값 계산
        let mut atr_by_code: HashMap<StockCode, Decimal> = HashMap::new();
        let mut low10_by_code: HashMap<StockCode, Decimal> = HashMap::new();
        for holding in &holdings {
            self.names.learn(&holding.code, holding.name.clone());
            let resolved = self.resolver.daily_bars(&holding.code, ANALYSIS_BAR_COUNT).await;
            let bars = indicators::recent_first(resolved.bars);
            match indicators::snapshot(&bars) {
                Ok(snapshot) => {
                    atr_by_code.insert(holding.code.clone(), snapshot.atr);
                    low10_by_code.insert(holding.code.clone(), snapshot.low10);
                }
                Err(e) => {
                    warn!(symbol = %holding.code, error = %e, "보유 종목 N값 계산 불가");
                }
            }
        }

        let report = self.tracker.sync(&holdings, &atr_by_code).await;
        if !report.skipped.is_empty() {
            warn!(skipped = report.skipped.len(), "일부 보유 종목 동기화 건너뜀");
        }

        // 매도 조건 점검
        let analyzer = self.analyzer(None);
        let mut sell_alerts = Vec::new();
        for holding in &holdings {
            let Some(low10) = low10_by_code.get(&holding.code) else {
                continue;
            };
            let low_52w = self
                .resolver
                .fifty_two_week(&holding.code)
                .await
                .map(|(_, low)| low);

            if let Some(check) =
                analyzer.check_sell(holding.pl_rate, holding.current_price, *low10, low_52w)
            {
                sell_alerts.push(SellAlert {
                    code: holding.code.clone(),
                    name: holding.name.clone(),
                    pl_rate: holding.pl_rate,
                    check,
                });
            }
        }

        Some(PortfolioReport {
            positions: self.tracker.positions().await,
            sell_alerts,
            risk_summary: self.tracker.risk_summary().await,
        })
    }
}

/// 두 출처 중 신뢰도가 낮은 쪽.
fn lower_confidence(a: Provenance, b: Provenance) -> Provenance {
    if a.confidence() <= b.confidence() {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use turtle_data::{ChartProvider, MemorySignalStore, MemorySnapshotStore};

    /// 네트워크 없이 동작하는 오케스트레이터 (모든 티어가 폴백으로 강등).
    fn offline_orchestrator(watchlist: Option<Vec<StockCode>>) -> Orchestrator {
        let chart = ChartProvider::with_base_url("http://127.0.0.1:9").unwrap();
        let resolver = Arc::new(
            PriceResolver::new(Arc::new(chart), None)
                .with_tier_timeout(Duration::from_millis(200)),
        );
        let cache = Arc::new(
            FinancialDataCache::new(Arc::new(MemorySnapshotStore::new()), None)
                .with_batch_delay(Duration::ZERO),
        );
        let analysis = AnalysisConfig {
            batch_delay_ms: 0,
            watchlist,
            ..AnalysisConfig::default()
        };
        Orchestrator::new(
            resolver,
            cache,
            Arc::new(MemorySignalStore::new()),
            Arc::new(StockNames::new()),
            None,
            Arc::new(PortfolioTracker::new()),
            analysis,
        )
    }

    #[test]
    fn test_universe_priority() {
        let watchlist = vec![StockCode::new_unchecked("005930")];
        let orchestrator = offline_orchestrator(Some(watchlist.clone()));

        // 요청 목록이 최우선
        let requested = vec![StockCode::new_unchecked("000660")];
        assert_eq!(orchestrator.universe(Some(requested.clone())), requested);

        // 빈 요청 목록은 무시
        assert_eq!(orchestrator.universe(Some(Vec::new())), watchlist);

        // 둘 다 없으면 기본 유니버스
        let orchestrator = offline_orchestrator(None);
        assert_eq!(orchestrator.universe(None).len(), DEFAULT_UNIVERSE.len());
    }

    #[tokio::test]
    async fn test_analyze_replaces_day_and_never_errors() {
        let orchestrator = offline_orchestrator(None);
        let codes = vec![
            StockCode::new_unchecked("005930"),
            StockCode::new_unchecked("000660"),
        ];

        // 네트워크 전체 불능 상태에서도 합성 시리즈로 강등되어 완료
        let first = orchestrator.analyze(Some(codes.clone()), None).await;
        let second = orchestrator.analyze(Some(codes), None).await;

        let date = FiscalCalendar::today_seoul();
        let stored = orchestrator.signals.find_by_date(date).await;
        // 같은 날 재분석은 대체: 저장소에는 마지막 실행 결과만 남음
        assert_eq!(stored.len(), second.len());
        for signal in &stored {
            assert_eq!(signal.provenance, Provenance::Simulated);
        }
        // 두 실행 모두 패닉/에러 없이 완료되었는지만 확인
        let _ = first;
    }

    #[tokio::test]
    async fn test_superstocks_without_registry_returns_empty() {
        let orchestrator = offline_orchestrator(None);
        let evaluations = orchestrator
            .superstocks_search(None, ScreeningCriteria::default())
            .await;
        assert!(evaluations.is_empty());
    }

    #[tokio::test]
    async fn test_sync_portfolio_requires_broker() {
        let orchestrator = offline_orchestrator(None);
        assert!(orchestrator.sync_portfolio().await.is_none());
    }

    #[test]
    fn test_lower_confidence() {
        assert_eq!(
            lower_confidence(Provenance::Real, Provenance::Simulated),
            Provenance::Simulated
        );
        assert_eq!(
            lower_confidence(Provenance::Cached, Provenance::Broker),
            Provenance::Cached
        );
    }
}

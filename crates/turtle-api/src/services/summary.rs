//! 슬랙 알림 메시지 포매터.
//!
//! 통합 분석 결과를 외부 자동화 플랫폼이 그대로 전달할 수 있는
//! 텍스트 메시지로 만듭니다.

use turtle_analytics::Evaluation;
use turtle_core::{Signal, SignalKind};

use crate::services::orchestrator::{
    AnalysisSummary, PortfolioReport, PremiumOpportunity,
};

/// 통합 분석 결과를 슬랙 메시지 텍스트로 만듭니다.
pub fn slack_message(
    summary: &AnalysisSummary,
    qualified: &[Evaluation],
    signals: &[Signal],
    premium: &[PremiumOpportunity],
    portfolio: Option<&PortfolioReport>,
) -> String {
    let mut lines = Vec::new();

    lines.push("📊 *오늘의 주식 분석 리포트*".to_string());
    lines.push(format!(
        "분석 {}종목 | 스크리닝 통과 {} | 매수 시그널 {} | 매도 시그널 {}",
        summary.analyzed_count,
        summary.qualified_count,
        summary.buy_signal_count,
        summary.sell_signal_count
    ));

    if !premium.is_empty() {
        lines.push(String::new());
        lines.push("🌟 *프리미엄 기회* (돌파 + 재무 우량)".to_string());
        for opportunity in premium {
            lines.push(format!(
                "  • {} ({}) {}원 | 점수 {} | PSR {:.2}",
                opportunity.name,
                opportunity.code,
                opportunity.current_price,
                opportunity.score,
                opportunity.psr
            ));
        }
    }

    let buys: Vec<&Signal> = signals.iter().filter(|s| s.kind == SignalKind::Buy20).collect();
    if !buys.is_empty() {
        lines.push(String::new());
        lines.push("🐢 *터틀 매수 시그널* (20일 고점 돌파)".to_string());
        for signal in &buys {
            let quantity = signal
                .action
                .as_ref()
                .map(|a| format!(" | 권장 {}주", a.quantity))
                .unwrap_or_default();
            lines.push(format!(
                "  • {} ({}) {}원 (기준 {}원){}",
                signal.name, signal.code, signal.current_price, signal.breakout_price, quantity
            ));
        }
    }

    let sells: Vec<&Signal> = signals.iter().filter(|s| s.kind == SignalKind::Sell10).collect();
    if !sells.is_empty() {
        lines.push(String::new());
        lines.push("📉 *터틀 매도 시그널* (10일 저점 이탈)".to_string());
        for signal in &sells {
            lines.push(format!(
                "  • {} ({}) {}원 (기준 {}원)",
                signal.name, signal.code, signal.current_price, signal.breakout_price
            ));
        }
    }

    if !qualified.is_empty() {
        lines.push(String::new());
        lines.push("💎 *슈퍼스톡스 통과 종목*".to_string());
        for evaluation in qualified.iter().take(10) {
            lines.push(format!(
                "  • {} ({}) | 매출성장 {:.1}% | 순익성장 {:.1}% | PSR {:.2} | {}점",
                evaluation.name,
                evaluation.code,
                evaluation.revenue_growth_3y,
                evaluation.net_income_growth_3y,
                evaluation.psr,
                evaluation.score
            ));
        }
    }

    if let Some(portfolio) = portfolio {
        lines.push(String::new());
        lines.push(format!(
            "💼 *보유 포지션* {}종목 | 총 리스크 {}원",
            portfolio.risk_summary.position_count, portfolio.risk_summary.total_risk_amount
        ));
        for alert in &portfolio.sell_alerts {
            lines.push(format!(
                "  ⚠️ [{:?}] {} ({}) {}",
                alert.check.urgency, alert.name, alert.code, alert.check.reason
            ));
        }
    }

    if premium.is_empty() && buys.is_empty() && sells.is_empty() && qualified.is_empty() {
        lines.push(String::new());
        lines.push("오늘은 조건을 충족한 종목이 없습니다.".to_string());
    }

    lines.join("\n")
}

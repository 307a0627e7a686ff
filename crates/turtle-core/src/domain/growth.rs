//! 연평균 성장률(CAGR) 계산.

/// 3개년 이력에서 연평균 성장률(%)을 계산합니다.
///
/// `history`는 과거→최신 순서입니다. n개 값은 n-1개 구간이므로
/// CAGR = ((최신/최초)^(1/(n-1)) - 1) × 100, 소수 2자리 반올림.
/// 최초 값이 0 이하이거나 값이 2개 미만이면 0을 반환합니다.
pub fn growth_rate(history: &[f64]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let start = history[0];
    let end = history[history.len() - 1];
    if start <= 0.0 {
        return 0.0;
    }

    let periods = (history.len() - 1) as f64;
    let rate = ((end / start).powf(1.0 / periods) - 1.0) * 100.0;
    round2(rate)
}

/// 소수 2자리 반올림.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//! The fixed whitelist of numeric utilities registered on the sandbox
//! engine: rolling statistics and a handful of common indicators (SMA, EMA,
//! RSI, Bollinger, ATR, VWAP). Each function is a bounded Rust routine over
//! plain `f64` arrays so a script can compute indicators without looping
//! unboundedly over raw memory itself.
//!
//! Rolling-window shape (seed with a plain average, then roll the sum or
//! EMA forward) operates on bare `Vec<f64>` column arrays since the sandbox
//! only ever hands the script plain numeric columns, never `Bar` structs.

/// Simple moving average of `values` over `period`. Returns `0.0` for
/// indices before the window fills (scripts treat `0.0` as "not yet
/// available"; there is no `Option` type exposed to rhai scripts).
pub fn sma(values: &[f64], period: i64) -> Vec<f64> {
    let period = period.max(1) as usize;
    let mut out = vec![0.0; values.len()];
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Exponential moving average, seeded with the simple average of the first
/// `period` values.
pub fn ema(values: &[f64], period: i64) -> Vec<f64> {
    let period = period.max(1) as usize;
    let mut out = vec![0.0; values.len()];
    if values.len() < period {
        return out;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    let mut prev = seed;
    for i in period..values.len() {
        let value = values[i] * k + prev * (1.0 - k);
        out[i] = value;
        prev = value;
    }
    out
}

/// Wilder's relative strength index over `period`.
pub fn rsi(closes: &[f64], period: i64) -> Vec<f64> {
    let period = period.max(1) as usize;
    let mut out = vec![0.0; closes.len()];
    if closes.len() <= period {
        return out;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;
    out[period] = rsi_from_averages(avg_gain, avg_loss);

    for i in (period + 1)..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta >= 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = rsi_from_averages(avg_gain, avg_loss);
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Bollinger Bands: `(lower, middle, upper)` parallel arrays, `middle` the
/// simple moving average and `lower`/`upper` offset by `mult` standard
/// deviations of the same window.
pub fn bollinger_bands(values: &[f64], period: i64, mult: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let period = period.max(1) as usize;
    let middle = sma(values, period as i64);
    let mut lower = vec![0.0; values.len()];
    let mut upper = vec![0.0; values.len()];

    for i in 0..values.len() {
        if i + 1 < period {
            continue;
        }
        let window = &values[i + 1 - period..=i];
        let mean = middle[i];
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let sd = variance.sqrt();
        lower[i] = mean - mult * sd;
        upper[i] = mean + mult * sd;
    }
    (lower, middle, upper)
}

/// Average True Range over `period`, from parallel high/low/close arrays.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: i64) -> Vec<f64> {
    let period = period.max(1) as usize;
    let n = closes.len();
    let mut tr = vec![0.0; n];
    if n > 0 {
        tr[0] = highs[0] - lows[0];
    }
    for i in 1..n {
        let h = highs[i];
        let l = lows[i];
        let prev_close = closes[i - 1];
        tr[i] = (h - l).max((h - prev_close).abs()).max((l - prev_close).abs());
    }
    sma(&tr, period as i64)
}

/// Volume-weighted average price, cumulative from the start of the window
/// (the conventional intraday VWAP definition, applied here over whatever
/// window the script passes in).
pub fn vwap(highs: &[f64], lows: &[f64], closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![0.0; n];
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    for i in 0..n {
        let typical = (highs[i] + lows[i] + closes[i]) / 3.0;
        cum_pv += typical * volumes[i];
        cum_vol += volumes[i];
        out[i] = if cum_vol > 0.0 { cum_pv / cum_vol } else { 0.0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_matches_hand_computed_average() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = sma(&values, 3);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 2.0).abs() < 1e-9);
        assert!((out[4] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_is_100_when_no_losses() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = rsi(&closes, 3);
        assert!((out[5] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn bollinger_bands_bracket_the_middle() {
        let values = [10.0, 10.0, 10.0, 20.0, 10.0];
        let (lower, middle, upper) = bollinger_bands(&values, 3, 2.0);
        let i = 3;
        assert!(lower[i] < middle[i]);
        assert!(upper[i] > middle[i]);
    }

    #[test]
    fn vwap_is_bounded_by_price_range() {
        let highs = [11.0, 12.0];
        let lows = [9.0, 10.0];
        let closes = [10.0, 11.0];
        let volumes = [100.0, 200.0];
        let out = vwap(&highs, &lows, &closes, &volumes);
        assert!(out[1] >= 9.0 && out[1] <= 12.0);
    }
}

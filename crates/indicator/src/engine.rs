use crate::rolling::{
    Cells, diff, ewm, finite, rolling_max, rolling_mean, rolling_min, rolling_std, rolling_sum,
    shift, zip_with,
};
use stocker_core::indicator::error::IndicatorError;
use stocker_core::indicator::kind::derived;
use stocker_core::market::frame::{SeriesFrame, columns};
use tracing::debug;

/// 分母恰好为零时的替代值
pub const EPSILON: f64 = 1e-8;

/// 计算指标所必需的输入列
pub const REQUIRED_COLUMNS: [&str; 4] = [columns::CLOSE, columns::HIGH, columns::LOW, columns::VOLUME];

const SMA_SHORT: usize = 20;
const SMA_LONG: usize = 50;
const EMA_FAST: usize = 12;
const EMA_SLOW: usize = 26;
const SIGNAL_SPAN: usize = 9;
const RSI_WINDOW: usize = 14;
const BB_WINDOW: usize = 20;
const BB_WIDTH: f64 = 2.0;
const STOCH_WINDOW: usize = 14;
const STOCH_SMOOTH: usize = 3;
const ATR_WINDOW: usize = 14;
const CCI_WINDOW: usize = 20;
const CCI_CONSTANT: f64 = 0.015;
const MFI_WINDOW: usize = 14;

/// # Summary
/// 由原始 OHLCV 序列计算全部技术指标。
///
/// # Logic
/// 1. 空表原样返回，不做列检查。
/// 2. 校验 Close、High、Low、Volume 四列存在，缺失时返回 `MissingColumns`。
/// 3. 依次追加 SMA、EMA、RSI、布林带、MACD、OBV、随机指标、ATR、CCI、MFI、威廉指标。
///
/// # Arguments
/// * `frame`: 原始序列表，至少包含必需列。
///
/// # Returns
/// 行数与日期顺序均不变的新表；窗口预热期内的派生值为缺失。
pub fn enrich(frame: &SeriesFrame) -> Result<SeriesFrame, IndicatorError> {
    if frame.is_empty() {
        return Ok(frame.clone());
    }

    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !frame.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(IndicatorError::MissingColumns(missing));
    }

    let input = |name: &str| {
        frame
            .column(name)
            .map(<[Option<f64>]>::to_vec)
            .ok_or_else(|| IndicatorError::MissingColumns(vec![name.to_string()]))
    };
    let close = input(columns::CLOSE)?;
    let high = input(columns::HIGH)?;
    let low = input(columns::LOW)?;
    let volume = input(columns::VOLUME)?;

    let mut out = frame.clone();

    // 移动平均
    let sma_20 = rolling_mean(&close, SMA_SHORT);
    out.set_column(derived::SMA_20, sma_20.clone())?;
    out.set_column(derived::SMA_50, rolling_mean(&close, SMA_LONG))?;

    let ema_12 = ewm(&close, EMA_FAST);
    let ema_26 = ewm(&close, EMA_SLOW);
    out.set_column(derived::EMA_12, ema_12.clone())?;
    out.set_column(derived::EMA_26, ema_26.clone())?;

    out.set_column(derived::RSI, rsi(&close))?;

    // 布林带
    let stddev_20 = rolling_std(&close, BB_WINDOW);
    out.set_column(derived::STDDEV_20, stddev_20.clone())?;
    out.set_column(
        derived::UPPER_BB,
        zip_with(&sma_20, &stddev_20, |m, s| m + s * BB_WIDTH),
    )?;
    out.set_column(
        derived::LOWER_BB,
        zip_with(&sma_20, &stddev_20, |m, s| m - s * BB_WIDTH),
    )?;

    let macd = zip_with(&ema_12, &ema_26, |fast, slow| fast - slow);
    out.set_column(derived::MACD, macd.clone())?;
    out.set_column(derived::SIGNAL_LINE, ewm(&macd, SIGNAL_SPAN))?;

    out.set_column(derived::OBV, on_balance_volume(&close, &volume))?;

    // 随机指标与威廉指标共用 14 日高低点
    let low_14 = rolling_min(&low, STOCH_WINDOW);
    let high_14 = rolling_max(&high, STOCH_WINDOW);
    let range_14 = zip_with(&high_14, &low_14, |h, l| h - l + EPSILON);
    let percent_k: Cells = zip_with(&close, &low_14, |c, l| c - l)
        .iter()
        .zip(&range_14)
        .map(|(num, den)| Some(100.0 * ((*num)? / (*den)?)))
        .collect();
    out.set_column(derived::PERCENT_K, percent_k.clone())?;
    out.set_column(derived::PERCENT_D, rolling_mean(&percent_k, STOCH_SMOOTH))?;

    let tr = true_range(&high, &low, &close);
    out.set_column(derived::TR, tr.clone())?;
    out.set_column(derived::ATR, rolling_mean(&tr, ATR_WINDOW))?;

    let typical = typical_price(&high, &low, &close);
    out.set_column(derived::CCI, cci(&typical))?;
    out.set_column(derived::MFI, mfi(&typical, &volume))?;

    let williams: Cells = zip_with(&high_14, &close, |h, c| h - c)
        .iter()
        .zip(&range_14)
        .map(|(num, den)| Some(-100.0 * ((*num)? / (*den)?)))
        .collect();
    out.set_column(derived::WILLIAMS_R, williams)?;

    debug!(rows = out.len(), "Indicators computed");
    Ok(out)
}

/// 分母恰好为零（或缺失）时替换为 EPSILON，其余情况原样返回
fn guarded(denominator: Option<f64>) -> f64 {
    match denominator {
        Some(d) if d != 0.0 => d,
        _ => EPSILON,
    }
}

/// 由相对强弱比得到 0-100 区间的振荡值
fn oscillator(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let ratio = numerator? / guarded(denominator);
    Some(100.0 - 100.0 / (1.0 + ratio))
}

/// # Summary
/// 14 日相对强弱指数。
///
/// # Logic
/// 1. 首行差分视为 0，因此涨跌序列没有缺失。
/// 2. 涨幅、跌幅分别取 14 日简单平均。
/// 3. 平均跌幅恰为 0 时以 EPSILON 代替。
fn rsi(close: &[Option<f64>]) -> Cells {
    let delta = diff(close);
    let gain: Cells = delta.iter().map(|d| Some(d.filter(|x| *x > 0.0).unwrap_or(0.0))).collect();
    let loss: Cells = delta.iter().map(|d| Some(d.filter(|x| *x < 0.0).map_or(0.0, |x| -x))).collect();
    let avg_gain = rolling_mean(&gain, RSI_WINDOW);
    let avg_loss = rolling_mean(&loss, RSI_WINDOW);
    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| oscillator(*g, *l))
        .collect()
}

/// 能量潮：按收盘涨跌方向累加成交量，首行贡献为 0
fn on_balance_volume(close: &[Option<f64>], volume: &[Option<f64>]) -> Cells {
    let mut total = 0.0;
    diff(close)
        .iter()
        .zip(volume)
        .map(|(d, v)| {
            let direction = match d {
                Some(x) if *x > 0.0 => 1.0,
                Some(x) if *x < 0.0 => -1.0,
                _ => 0.0,
            };
            total += v.map_or(0.0, |v| direction * v);
            Some(total)
        })
        .collect()
}

/// # Summary
/// 真实波幅：当日振幅、最高价与昨收差、最低价与昨收差三者取最大。
///
/// # Logic
/// 首行没有昨收，结果为缺失。
fn true_range(high: &[Option<f64>], low: &[Option<f64>], close: &[Option<f64>]) -> Cells {
    let prev_close = shift(close);
    high.iter()
        .zip(low)
        .zip(&prev_close)
        .map(|((h, l), pc)| {
            let (h, l, pc) = ((*h)?, (*l)?, (*pc)?);
            Some((h - l).max((h - pc).abs()).max((l - pc).abs()))
        })
        .collect()
}

fn typical_price(high: &[Option<f64>], low: &[Option<f64>], close: &[Option<f64>]) -> Cells {
    let hl = zip_with(high, low, |h, l| h + l);
    zip_with(&hl, close, |hl, c| (hl + c) / 3.0)
}

/// 顺势指标；标准差为 0 时结果无定义，记为缺失
fn cci(typical: &[Option<f64>]) -> Cells {
    let mean = rolling_mean(typical, CCI_WINDOW);
    let std = rolling_std(typical, CCI_WINDOW);
    let deviation = zip_with(typical, &mean, |tp, m| tp - m);
    finite(zip_with(&deviation, &std, |dev, s| dev / (CCI_CONSTANT * s)))
}

/// # Summary
/// 资金流量指数。
///
/// # Logic
/// 1. 原始资金流 = 典型价 * 成交量。
/// 2. 高于前一日资金流记为正向流，低于则记为负向流，其余为 0（首行为 0）。
/// 3. 14 日正向流之和除以负向流之和，后者恰为 0 时以 EPSILON 代替。
fn mfi(typical: &[Option<f64>], volume: &[Option<f64>]) -> Cells {
    let raw_flow = zip_with(typical, volume, |tp, v| tp * v);
    let prev_flow = shift(&raw_flow);
    let directional = |keep: fn(f64, f64) -> bool| -> Cells {
        raw_flow
            .iter()
            .zip(&prev_flow)
            .map(|(cur, prev)| match (cur, prev) {
                (Some(c), Some(p)) if keep(*c, *p) => Some(*c),
                _ => Some(0.0),
            })
            .collect()
    };
    let positive = rolling_sum(&directional(|c, p| c > p), MFI_WINDOW);
    let negative = rolling_sum(&directional(|c, p| c < p), MFI_WINDOW);
    positive
        .iter()
        .zip(&negative)
        .map(|(p, n)| oscillator(*p, *n))
        .collect()
}

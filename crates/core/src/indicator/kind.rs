use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 派生指标列名，与持久化载荷及归档表字段一一对应
pub mod derived {
    pub const SMA_20: &str = "SMA_20";
    pub const SMA_50: &str = "SMA_50";
    pub const EMA_12: &str = "EMA_12";
    pub const EMA_26: &str = "EMA_26";
    pub const RSI: &str = "RSI";
    pub const STDDEV_20: &str = "stddev_20";
    pub const UPPER_BB: &str = "Upper_BB";
    pub const LOWER_BB: &str = "Lower_BB";
    pub const MACD: &str = "MACD";
    pub const SIGNAL_LINE: &str = "Signal_Line";
    pub const OBV: &str = "OBV";
    pub const PERCENT_K: &str = "%K";
    pub const PERCENT_D: &str = "%D";
    pub const TR: &str = "TR";
    pub const ATR: &str = "ATR";
    pub const CCI: &str = "CCI";
    pub const MFI: &str = "MFI";
    pub const WILLIAMS_R: &str = "Williams_%R";

    /// 指标引擎写入的全部派生列，按写入顺序排列
    pub const ALL: [&str; 18] = [
        SMA_20, SMA_50, EMA_12, EMA_26, RSI, STDDEV_20, UPPER_BB, LOWER_BB, MACD, SIGNAL_LINE,
        OBV, PERCENT_K, PERCENT_D, TR, ATR, CCI, MFI, WILLIAMS_R,
    ];
}

/// # Summary
/// 图表层可选择展示的指标。
///
/// # Invariants
/// - 每个选项映射到一组固定的派生列，如布林带对应上下轨两列。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma20,
    Sma50,
    Ema12,
    Ema26,
    Rsi,
    BollingerBands,
    Macd,
    Obv,
    StochasticOscillator,
    Atr,
    Cci,
    Mfi,
    WilliamsR,
}

impl IndicatorKind {
    /// 全部可选指标
    pub const ALL: [IndicatorKind; 13] = [
        IndicatorKind::Sma20,
        IndicatorKind::Sma50,
        IndicatorKind::Ema12,
        IndicatorKind::Ema26,
        IndicatorKind::Rsi,
        IndicatorKind::BollingerBands,
        IndicatorKind::Macd,
        IndicatorKind::Obv,
        IndicatorKind::StochasticOscillator,
        IndicatorKind::Atr,
        IndicatorKind::Cci,
        IndicatorKind::Mfi,
        IndicatorKind::WilliamsR,
    ];

    /// 默认勾选的指标
    pub const DEFAULT_SELECTION: [IndicatorKind; 2] = [IndicatorKind::Sma20, IndicatorKind::Sma50];

    /// # Summary
    /// 返回该指标在序列表中对应的列名。
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Sma20 => &[derived::SMA_20],
            IndicatorKind::Sma50 => &[derived::SMA_50],
            IndicatorKind::Ema12 => &[derived::EMA_12],
            IndicatorKind::Ema26 => &[derived::EMA_26],
            IndicatorKind::Rsi => &[derived::RSI],
            IndicatorKind::BollingerBands => &[derived::UPPER_BB, derived::LOWER_BB],
            IndicatorKind::Macd => &[derived::MACD, derived::SIGNAL_LINE],
            IndicatorKind::Obv => &[derived::OBV],
            IndicatorKind::StochasticOscillator => &[derived::PERCENT_K, derived::PERCENT_D],
            IndicatorKind::Atr => &[derived::ATR],
            IndicatorKind::Cci => &[derived::CCI],
            IndicatorKind::Mfi => &[derived::MFI],
            IndicatorKind::WilliamsR => &[derived::WILLIAMS_R],
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma_20" | "sma20" => Ok(IndicatorKind::Sma20),
            "sma_50" | "sma50" => Ok(IndicatorKind::Sma50),
            "ema_12" | "ema12" => Ok(IndicatorKind::Ema12),
            "ema_26" | "ema26" => Ok(IndicatorKind::Ema26),
            "rsi" => Ok(IndicatorKind::Rsi),
            "bollinger_bands" | "bollinger" | "bb" => Ok(IndicatorKind::BollingerBands),
            "macd" => Ok(IndicatorKind::Macd),
            "obv" => Ok(IndicatorKind::Obv),
            "stochastic_oscillator" | "stochastic" => Ok(IndicatorKind::StochasticOscillator),
            "atr" => Ok(IndicatorKind::Atr),
            "cci" => Ok(IndicatorKind::Cci),
            "mfi" => Ok(IndicatorKind::Mfi),
            "williams_%r" | "williams_r" | "williams" => Ok(IndicatorKind::WilliamsR),
            _ => Err(format!("Unknown indicator: {}", s)),
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndicatorKind::Sma20 => "SMA_20",
            IndicatorKind::Sma50 => "SMA_50",
            IndicatorKind::Ema12 => "EMA_12",
            IndicatorKind::Ema26 => "EMA_26",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::BollingerBands => "Bollinger_Bands",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Obv => "OBV",
            IndicatorKind::StochasticOscillator => "Stochastic_Oscillator",
            IndicatorKind::Atr => "ATR",
            IndicatorKind::Cci => "CCI",
            IndicatorKind::Mfi => "MFI",
            IndicatorKind::WilliamsR => "Williams_%R",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_through_from_str() {
        for kind in IndicatorKind::ALL {
            assert_eq!(kind.to_string().parse::<IndicatorKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("Bollinger".parse(), Ok(IndicatorKind::BollingerBands));
        assert_eq!(" stochastic ".parse(), Ok(IndicatorKind::StochasticOscillator));
        assert!("vwap".parse::<IndicatorKind>().is_err());
    }

    #[test]
    fn test_every_selectable_column_is_derived() {
        for kind in IndicatorKind::ALL {
            for column in kind.columns() {
                assert!(derived::ALL.contains(column), "{} not derived", column);
            }
        }
    }
}

pub mod time;

/// # Summary
/// 规范化单个证券代码。
///
/// # Logic
/// 1. 去除首尾空白。
/// 2. 统一转换为大写。
///
/// # Arguments
/// * `raw`: 用户输入的原始代码。
///
/// # Returns
/// 规范化后的代码，空输入返回 None。
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim();
    if ticker.is_empty() {
        None
    } else {
        Some(ticker.to_uppercase())
    }
}

/// # Summary
/// 解析逗号分隔的证券代码列表。
///
/// # Logic
/// 1. 按逗号切分输入。
/// 2. 对每一段执行 `normalize_ticker`，丢弃空段。
/// 3. 保留输入顺序及重复项，去重由上游决定。
///
/// # Arguments
/// * `input`: 例如 `"aapl, msft"`。
///
/// # Returns
/// 规范化后的代码列表。
pub fn parse_tickers(input: &str) -> Vec<String> {
    input.split(',').filter_map(normalize_ticker).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tickers_normalizes_input() {
        assert_eq!(parse_tickers(" aapl, msft ,,brk.b"), vec!["AAPL", "MSFT", "BRK.B"]);
    }

    #[test]
    fn test_parse_tickers_keeps_duplicates() {
        assert_eq!(parse_tickers("AAPL,aapl"), vec!["AAPL", "AAPL"]);
    }

    #[test]
    fn test_parse_tickers_blank_input() {
        assert!(parse_tickers("  ").is_empty());
        assert_eq!(normalize_ticker(" \t"), None);
    }
}

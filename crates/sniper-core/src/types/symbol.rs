//! 거래쌍 심볼 헬퍼.

/// 흔히 쓰이는 호가 자산. 긴 접미사가 먼저 매칭되도록 정렬되어 있습니다.
const KNOWN_QUOTES: [&str; 8] = ["FDUSD", "USDT", "USDC", "BUSD", "TRY", "BTC", "ETH", "BNB"];

/// 거래소 심볼을 정규화합니다 ("alt/usdt" → "ALTUSDT").
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().replace(['/', '-', '_'], "").to_uppercase()
}

/// 심볼에서 기준 자산과 호가 자산을 추정합니다.
///
/// 상장 메타데이터를 받지 못했을 때의 대체 경로입니다.
/// 알려진 호가 자산으로 끝나지 않으면 `None`을 반환합니다.
pub fn split_symbol(symbol: &str) -> Option<(String, String)> {
    KNOWN_QUOTES.iter().find_map(|quote| {
        symbol
            .strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base.to_string(), quote.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" alt/usdt "), "ALTUSDT");
        assert_eq!(normalize_symbol("ALTUSDT"), "ALTUSDT");
    }

    #[test]
    fn test_split_symbol() {
        assert_eq!(
            split_symbol("ALTUSDT"),
            Some(("ALT".to_string(), "USDT".to_string()))
        );
        assert_eq!(
            split_symbol("WIFFDUSD"),
            Some(("WIF".to_string(), "FDUSD".to_string()))
        );
        assert_eq!(split_symbol("USDT"), None);
        assert_eq!(split_symbol("ABCXYZ"), None);
    }
}

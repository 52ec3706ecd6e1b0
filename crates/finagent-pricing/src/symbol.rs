use finagent_models::{Market, SymbolConfig};

/// Classifies listings by exchange suffix (`INFY.NS` is domestic, `NVDA` is not).
#[derive(Debug, Clone)]
pub struct MarketClassifier {
    domestic_suffixes: Vec<String>,
    default_suffix: String,
}

impl MarketClassifier {
    pub fn new(domestic_suffixes: Vec<String>, default_suffix: impl Into<String>) -> Self {
        Self {
            domestic_suffixes,
            default_suffix: default_suffix.into(),
        }
    }

    pub fn from_config(config: &SymbolConfig) -> Self {
        Self::new(config.domestic_suffixes.clone(), config.default_suffix.clone())
    }

    pub fn has_domestic_suffix(&self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        self.domestic_suffixes.iter().any(|s| symbol.ends_with(s.as_str()))
    }

    /// An absent hint, or one without a domestic suffix, is foreign.
    pub fn classify(&self, market_hint: Option<&str>) -> Market {
        match market_hint {
            Some(hint) if self.has_domestic_suffix(hint) => Market::Domestic,
            _ => Market::Foreign,
        }
    }

    /// Append the default domestic suffix to a bare ticker.
    pub fn normalize_symbol(&self, symbol: &str) -> String {
        let symbol = symbol.trim();
        if self.has_domestic_suffix(symbol) {
            symbol.to_string()
        } else {
            format!("{symbol}{}", self.default_suffix)
        }
    }
}

impl Default for MarketClassifier {
    fn default() -> Self {
        Self::from_config(&SymbolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_suffix() {
        let classifier = MarketClassifier::default();
        assert_eq!(classifier.classify(Some("INFY.NS")), Market::Domestic);
        assert_eq!(classifier.classify(Some("TCS.BO")), Market::Domestic);
        assert_eq!(classifier.classify(Some("NVDA")), Market::Foreign);
        assert_eq!(classifier.classify(None), Market::Foreign);
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        let classifier = MarketClassifier::default();
        assert_eq!(classifier.classify(Some("infy.ns")), Market::Foreign);
    }

    #[test]
    fn normalize_appends_default_suffix() {
        let classifier = MarketClassifier::default();
        assert_eq!(classifier.normalize_symbol("INFY"), "INFY.NS");
        assert_eq!(classifier.normalize_symbol(" TCS.BO "), "TCS.BO");
        assert_eq!(classifier.normalize_symbol("RELIANCE.NS"), "RELIANCE.NS");
    }

    #[test]
    fn custom_suffixes() {
        let classifier = MarketClassifier::new(vec![".L".to_string()], ".L");
        assert_eq!(classifier.classify(Some("VOD.L")), Market::Domestic);
        assert_eq!(classifier.classify(Some("INFY.NS")), Market::Foreign);
        assert_eq!(classifier.normalize_symbol("BP"), "BP.L");
    }
}

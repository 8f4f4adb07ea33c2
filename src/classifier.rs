//! Intent Classifier
//!
//! Turns raw user text into an `(intent, entities)` pair:
//! - Intent: first entry of the keyword table whose keywords hit a token
//! - Entities: pattern matches on the raw, unnormalized text
//!
//! Classification and extraction are independent; an `unknown` intent still
//! carries whatever entities were found.

use crate::models::{Entities, Intent, IntentAnalysisResult, ANALYSIS_TYPE, STOCK_CODE};
use crate::tokenizer::{SuffixTokenizer, Tokenizer};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Ordered keyword table. First match wins, so order is part of the contract.
pub const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::MarketAnalysis,
        &["분석", "시세", "주가", "차트", "전망", "analysis", "analyze", "chart", "price", "outlook"],
    ),
    (
        Intent::StrategyCreation,
        &["전략", "만들", "생성", "개발", "strategy", "create", "build"],
    ),
    (Intent::Backtest, &["백테스트", "과거", "검증", "backtest"]),
    (
        Intent::StrategyExecution,
        &["실행", "매매", "주문", "시작", "적용", "execute", "order", "trade"],
    ),
];

const FUNDAMENTAL_MARKERS: &[&str] = &["기본적", "재무", "펀더멘털", "fundamental"];
const TECHNICAL_MARKERS: &[&str] = &["기술적", "technical"];

lazy_static! {
    /// First six consecutive decimal digits (any script); a longer run
    /// contributes its leading six
    static ref STOCK_CODE_RE: Regex = Regex::new(r"(\d{6})")
        .expect("stock code pattern is valid");
}

/// Intent/entity extractor with a pluggable tokenizer
pub struct IntentAnalyzer {
    tokenizer: Box<dyn Tokenizer>,
}

impl IntentAnalyzer {
    pub fn new() -> Self {
        Self::with_tokenizer(Box::new(SuffixTokenizer::new()))
    }

    pub fn with_tokenizer(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Analyze a user query. Never fails.
    pub fn analyze(&self, text: &str) -> IntentAnalysisResult {
        let normalized = normalize(text);
        let tokens = self.tokenizer.tokenize(&normalized);
        let intent = classify_intent(&tokens);
        let entities = extract_entities(text);

        debug!(
            intent = %intent,
            token_count = tokens.len(),
            entity_count = entities.len(),
            "Query analyzed"
        );

        IntentAnalysisResult {
            intent,
            entities,
            confidence: (intent != Intent::Unknown).then_some(1.0),
        }
    }
}

impl Default for IntentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop everything except Hangul syllables, ASCII letters/digits and whitespace
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| ('가'..='힣').contains(c) || c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect()
}

/// First intent in table order whose keyword set intersects the tokens
pub fn classify_intent(tokens: &[String]) -> Intent {
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| tokens.iter().any(|t| keywords.contains(&t.as_str())))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Unknown)
}

/// Pattern-based entity extraction; absent matches are simply omitted
pub fn extract_entities(text: &str) -> Entities {
    let mut entities = Entities::new();

    if let Some(code) = STOCK_CODE_RE.captures(text).and_then(|c| c.get(1)) {
        entities.insert(STOCK_CODE.to_string(), code.as_str().to_string());
    }

    let lowered = text.to_lowercase();
    let mentions = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));
    if mentions(FUNDAMENTAL_MARKERS) {
        entities.insert(ANALYSIS_TYPE.to_string(), "fundamental".to_string());
    } else if mentions(TECHNICAL_MARKERS) {
        entities.insert(ANALYSIS_TYPE.to_string(), "technical".to_string());
    }

    entities
}

//! Tokenizer strategies for the intent classifier
//!
//! A tokenizer turns normalized text into base-form tokens. Only content
//! words matter for classification, so numbers and bare particles are dropped.

use lazy_static::lazy_static;
use std::collections::BTreeSet;

/// Text → sequence of base-form tokens
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Korean particles and predicate endings, stripped from the end of a word.
const ENDINGS: &[&str] = &[
    // Requests / polite predicate endings
    "해주세요", "해줄래", "해줘요", "해주라", "해봐요", "해줘", "해봐",
    "어주세요", "아주세요", "어줘", "아줘", "어봐", "아봐",
    "하세요", "합니다", "했어요", "했다", "하자", "하고", "하는", "하기", "하다",
    "해서", "해요", "해", "할", "한",
    "었다", "았다", "어요", "아요", "어서", "아서", "는다", "다",
    // Particles
    "에서", "으로", "에게", "까지", "부터", "처럼", "보다", "이랑",
    "은", "는", "이", "가", "을", "를", "의", "에", "로", "와", "과", "도", "만", "랑", "요",
];

lazy_static! {
    /// Longest ending first so "해주세요" wins over "요"
    static ref ENDINGS_BY_LENGTH: Vec<&'static str> = {
        let mut endings = ENDINGS.to_vec();
        endings.sort_by_key(|e| std::cmp::Reverse(e.chars().count()));
        endings
    };
}

/// Whitespace tokenizer that reduces Korean words to their stem by stripping
/// one trailing particle or predicate ending.
///
/// Words are first cut where the script changes (digits, Latin, Hangul), so
/// unspaced input such as `005930분석해줘` or `RSI전략` still yields content
/// words.
///
/// The surface form is kept next to the stem: without a dictionary a noun
/// that happens to end in a particle syllable (주가, 과거) cannot be told
/// apart from stem + particle.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuffixTokenizer;

impl SuffixTokenizer {
    pub fn new() -> Self {
        Self
    }

    fn stem(word: &str) -> Option<&str> {
        ENDINGS_BY_LENGTH.iter().find_map(|ending| {
            word.strip_suffix(ending)
                .filter(|stem| !stem.is_empty() && is_hangul_word(stem))
        })
    }
}

impl Tokenizer for SuffixTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut seen = BTreeSet::new();

        let mut push = |token: &str| {
            if seen.insert(token.to_string()) {
                tokens.push(token.to_string());
            }
        };

        for raw in text.split_whitespace() {
            let lowered = raw.to_lowercase();
            for word in script_runs(&lowered) {
                if word.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }

                if is_hangul_word(word) {
                    let stem = Self::stem(word);
                    // a lone particle is not a content word
                    if stem.is_none() && ENDINGS.contains(&word) {
                        continue;
                    }
                    push(word);
                    if let Some(stem) = stem {
                        push(stem);
                    }
                } else {
                    push(word);
                }
            }
        }

        tokens
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Digit,
    Latin,
    Hangul,
    Other,
}

fn script_of(c: char) -> Script {
    if c.is_ascii_digit() {
        Script::Digit
    } else if c.is_ascii_alphabetic() {
        Script::Latin
    } else if ('가'..='힣').contains(&c) {
        Script::Hangul
    } else {
        Script::Other
    }
}

/// Maximal substrings of a single script
fn script_runs(word: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<Script> = None;

    for (i, c) in word.char_indices() {
        let script = script_of(c);
        if current.is_some_and(|s| s != script) {
            runs.push(&word[start..i]);
            start = i;
        }
        current = Some(script);
    }
    if start < word.len() {
        runs.push(&word[start..]);
    }
    runs
}

fn is_hangul_word(word: &str) -> bool {
    word.chars().all(|c| ('가'..='힣').contains(&c))
}

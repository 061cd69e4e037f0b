//! Word tokenization shared by the lexicon model and sample alignment

use std::sync::OnceLock;

use regex::Regex;

/// A token with character (not byte) offsets into the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

impl Token {
    pub fn is_word(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_alphanumeric)
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Words, possessive clitics ("'s"), then single punctuation marks
    PATTERN.get_or_init(|| Regex::new(r"\w+|'\w+|[^\w\s]").expect("valid token pattern"))
}

/// Split text into word, clitic and punctuation tokens
pub fn tokenize(text: &str) -> Vec<Token> {
    token_pattern()
        .find_iter(text)
        .map(|m| {
            let start_char = text[..m.start()].chars().count();
            Token {
                text: m.as_str().to_string(),
                start_char,
                end_char: start_char + m.as_str().chars().count(),
            }
        })
        .collect()
}

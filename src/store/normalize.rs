// Name normalization shared by indexing and search
use regex::Regex;
use std::sync::OnceLock;

fn punctuation() -> &'static Regex {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"))
}

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Canonical lookup key for a name: lower-cased, punctuation removed,
/// whitespace runs collapsed to one space and trimmed
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = punctuation().replace_all(&lowered, "");
    whitespace().replace_all(stripped.trim(), " ").into_owned()
}

/// Kept sorted for `binary_search`.
const STOP_WORDS: &[&str] = &[
    "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on", "or",
    "that", "the", "this", "to", "with", "your",
];

const MIN_TOKEN_CHARS: usize = 2;

/// Lowercases, splits on anything that is not alphanumeric, and drops short tokens and stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|raw| raw.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .filter(|token| STOP_WORDS.binary_search(&token.as_str()).is_err())
        .collect()
}

//! Pure sentence/word splitting rules behind the interactive WRITE
//! protocol.
//!
//! A sentence is a run of characters ending at `.`, `!` or `?`
//! inclusive, or a trailing run with no terminator. Splitting is
//! right-inclusive: the delimiter stays with the sentence it closes.

pub fn is_delim(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Splits `text` into sentences. A trailing run with no delimiter
/// becomes one final, incomplete sentence. Leading whitespace at the
/// start of each sentence (the separator left behind by the previous
/// delimiter) is dropped, so sentences rejoin cleanly with a single
/// space when the full file is rewritten.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.is_empty() && c.is_whitespace() {
            continue;
        }
        current.push(c);
        if is_delim(c) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

/// Splits a sentence into whitespace-delimited words.
pub fn split_words(sentence: &str) -> Vec<String> {
    sentence.split_whitespace().map(str::to_string).collect()
}

/// The inclusive range of sentence indices valid for a WRITE: an empty
/// file only accepts index 0; a non-empty file ending in a delimiter
/// accepts `0..=n`; otherwise `0..=n-1`.
pub fn valid_range(text: &str) -> std::ops::RangeInclusive<usize> {
    if text.is_empty() {
        return 0..=0;
    }
    let sentences = split_sentences(text);
    let n = sentences.len();
    if text.ends_with(is_delim) {
        0..=n
    } else {
        0..=n.saturating_sub(1)
    }
}

/// Inserts `content` at word index `wi` (`0 <= wi <= word_count`) of
/// `sentence`, reassembling with single spaces.
pub fn insert_word(sentence: &str, wi: usize, content: &str) -> Option<String> {
    let words = split_words(sentence);
    if wi > words.len() {
        return None;
    }
    let mut out = Vec::with_capacity(words.len() + 1);
    out.extend_from_slice(&words[..wi]);
    out.push(content.to_string());
    out.extend_from_slice(&words[wi..]);
    Some(out.join(" "))
}

/// Joins sentences back into a whole file body with a single space
/// between each.
pub fn join_sentences(sentences: &[String]) -> String {
    sentences.join(" ")
}

/// A sentence that would serialize as the empty string is persisted as
/// `.` instead, keeping the sentence array well-formed.
pub fn non_empty_or_dot(sentence: &str) -> String {
    if sentence.is_empty() {
        ".".to_string()
    } else {
        sentence.to_string()
    }
}

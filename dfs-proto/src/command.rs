//! Small helpers for dealing with `CMD:` payloads, shared by the name
//! server's router and the client's REPL.

/// Splits `"VERB rest of the line"` into `(VERB, rest)`. `rest` is empty
/// when there's no argument at all. Leading/trailing whitespace around
/// `rest` is trimmed.
pub fn split_verb(line: &str) -> (&str, &str) {
    match line.trim_start().split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line.trim(), ""),
    }
}

/// Splits the first whitespace-delimited token off `rest`, returning
/// `(token, remainder)`. Used to peel off a filename before the rest of a
/// command's arguments (e.g. `WRITE <file> <n>`).
pub fn split_first_token(rest: &str) -> (&str, &str) {
    match rest.trim_start().split_once(char::is_whitespace) {
        Some((tok, remainder)) => (tok, remainder.trim()),
        None => (rest.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_verb_and_rest() {
        assert_eq!(split_verb("READ hello.txt"), ("READ", "hello.txt"));
        assert_eq!(split_verb("LIST"), ("LIST", ""));
        assert_eq!(split_verb("  VIEW  -al  "), ("VIEW", "-al"));
    }

    #[test]
    fn splits_first_token() {
        assert_eq!(split_first_token("story.txt 1"), ("story.txt", "1"));
        assert_eq!(split_first_token("story.txt"), ("story.txt", ""));
    }
}

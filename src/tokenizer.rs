use unicode_segmentation::UnicodeSegmentation;

/// English clitics split off the word they are attached to, Penn Treebank style.
const CLITICS: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

/// Splits text on Unicode word boundaries (UAX #29). Words and punctuation marks
/// become separate tokens, whitespace is dropped. Case is left untouched.
///
/// UAX #29 keeps `don't` in one piece; the clitic is then split off so that
/// `don't` yields `do` and `n't`, and `what's` yields `what` and `'s`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for segment in text.split_word_bounds() {
        if segment.trim().is_empty() {
            continue;
        }
        match clitic_start(segment) {
            Some(at) => {
                tokens.push(segment[..at].to_string());
                tokens.push(segment[at..].to_string());
            }
            None => tokens.push(segment.to_string()),
        }
    }
    tokens
}

/// Byte offset where a trailing clitic starts, if the word has a non-empty stem.
/// Both the ASCII apostrophe and U+2019 are recognised.
fn clitic_start(word: &str) -> Option<usize> {
    for clitic in CLITICS {
        for apostrophe in ["'", "\u{2019}"] {
            let suffix = clitic.replace('\'', apostrophe);
            if word.len() <= suffix.len() {
                continue;
            }
            let at = word.len() - suffix.len();
            if word.is_char_boundary(at) && word[at..].eq_ignore_ascii_case(&suffix) {
                return Some(at);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn splits_punctuation_from_words() {
        assert_eq!(
            tokenize("hello, how are you?"),
            vec!["hello", ",", "how", "are", "you", "?"]
        );
    }

    #[test]
    fn keeps_numbers_together() {
        assert_eq!(tokenize("3.5 left"), vec!["3.5", "left"]);
    }

    #[test]
    fn splits_clitics_off_contractions() {
        assert_eq!(tokenize("I don't know"), vec!["I", "do", "n't", "know"]);
        assert_eq!(tokenize("what's up"), vec!["what", "'s", "up"]);
        assert_eq!(tokenize("you're we've"), vec!["you", "'re", "we", "'ve"]);
        assert_eq!(tokenize("I'll I'd I'm"), vec!["I", "'ll", "I", "'d", "I", "'m"]);
        assert_eq!(tokenize("CAN'T"), vec!["CA", "N'T"]);
        assert_eq!(tokenize("isn\u{2019}t"), vec!["is", "n\u{2019}t"]);
    }

    #[test]
    fn leaves_other_apostrophes_alone() {
        assert_eq!(tokenize("o'clock rock'n'roll"), vec!["o'clock", "rock'n'roll"]);
    }

    #[test]
    fn handles_non_latin_scripts() {
        assert_eq!(tokenize("привет мир"), vec!["привет", "мир"]);
    }

    #[test]
    fn whitespace_only_input_has_no_tokens() {
        assert!(tokenize("  \t\n").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn repeated_punctuation_is_split() {
        assert_eq!(tokenize("??"), vec!["?", "?"]);
    }
}

//! Cleanup of raw model output.
//! Removes an echoed copy of the source text and boilerplate `label:`
//! prefixes, then normalizes whitespace. Rules are applied until none of
//! them changes the text, so the result is a fixed point.

use std::sync::OnceLock;

use regex::Regex;

fn label_pattern() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    // Statically valid pattern.
    LABEL.get_or_init(|| Regex::new(r"^[A-Za-z_]+: ?").unwrap())
}

fn whitespace_pattern() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Collapse whitespace runs to one space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    whitespace_pattern().replace_all(text, " ").trim().to_string()
}

/// Strip `original` from the start of `text` when it is echoed in front of
/// a translation. The echo must end on a word boundary so "Hidden" is not
/// cut by "Hi". Output that is only the source (numbers, names) is kept.
fn strip_echo<'a>(text: &'a str, original: &str) -> Option<&'a str> {
    if original.is_empty() {
        return None;
    }
    let rest = text.strip_prefix(original)?;
    if rest.trim().is_empty() {
        return None;
    }
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(rest),
    }
}

/// Strip one leading `label:` such as `Translation:` or `hin_Deva:`.
fn strip_label(text: &str) -> Option<&str> {
    label_pattern().find(text).map(|m| &text[m.end()..])
}

/// Clean a raw translation of `original`. Pure and idempotent.
pub fn sanitize(raw_output: &str, original_input: &str) -> String {
    let original = normalize_whitespace(original_input);
    let mut current = normalize_whitespace(raw_output);

    loop {
        let stripped = strip_echo(&current, &original).or_else(|| strip_label(&current));
        match stripped {
            Some(rest) => {
                let next = normalize_whitespace(rest);
                if next.len() >= current.len() {
                    break;
                }
                current = next;
            }
            None => break,
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_in_empty_out() {
        assert_eq!(sanitize("", "anything"), "");
        assert_eq!(sanitize("   \n\t ", "anything"), "");
    }

    #[test]
    fn strips_echoed_source() {
        assert_eq!(sanitize("Hello world Hola mundo", "Hello world"), "Hola mundo");
    }

    #[test]
    fn echo_match_ignores_whitespace_layout() {
        assert_eq!(sanitize("Hello\n  world   Hola", "Hello world"), "Hola");
    }

    #[test]
    fn echo_must_end_on_word_boundary() {
        assert_eq!(sanitize("Hidden", "Hi"), "Hidden");
    }

    #[test]
    fn strips_label_prefix() {
        assert_eq!(sanitize("Translation: Hola", "Hi"), "Hola");
        assert_eq!(sanitize("hin_Deva:नमस्ते", "Hello"), "नमस्ते");
    }

    #[test]
    fn strips_echo_followed_by_label() {
        assert_eq!(sanitize("Hi Translation: Hola", "Hi"), "Hola");
    }

    #[test]
    fn leaves_clean_text_alone() {
        assert_eq!(sanitize("Hola mundo", "Hello world"), "Hola mundo");
    }

    #[test]
    fn colon_after_spaces_is_not_a_label() {
        assert_eq!(sanitize("Nota importante: hola", "x"), "Nota importante: hola");
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(sanitize("  Hola \t\n  mundo  ", "Hi"), "Hola mundo");
    }

    #[test]
    fn idempotent_on_tricky_inputs() {
        let cases = [
            ("Translation: Label: foo", "x"),
            ("Hello Hello world", "Hello"),
            ("Hi Hi: there", "Hi"),
            ("a: b: c: d", "a"),
            ("   ", ""),
            ("Bonjour monde. Bonjour", "Bonjour monde."),
            ("Translation:", "Hi"),
        ];
        for (raw, original) in cases {
            let once = sanitize(raw, original);
            assert_eq!(sanitize(&once, original), once, "raw={raw:?}");
        }
    }

    #[test]
    fn untranslated_output_is_kept() {
        assert_eq!(sanitize("2024", "2024"), "2024");
        assert_eq!(sanitize("OpenAI ", " OpenAI"), "OpenAI");
        assert_eq!(sanitize("Hello Hello", "Hello"), "Hello");
        assert_eq!(sanitize(&sanitize("2024", "2024"), "2024"), "2024");
    }
}

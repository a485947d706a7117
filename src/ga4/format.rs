//! Label formatting applied to event categories, actions and labels.

use crate::ga4::constants::REDACTED_EMAIL;

const SMALL_WORDS: [&str; 22] = [
    "a", "an", "and", "as", "at", "but", "by", "en", "for", "if", "in", "nor", "of", "on", "or",
    "per", "the", "to", "v", "v.", "vs", "vs.",
];
const VIA: &str = "via";

/// Formats `input` for display, title-casing it and redacting values that look like an email
/// address. `None` is treated as the empty string.
pub fn format(input: Option<&str>, title_case: bool, redact_email: bool) -> String {
    let mut value = input.unwrap_or_default().to_string();

    if title_case {
        value = to_title_case(&value);
    }

    if redact_email {
        value = redact(value);
    }

    value
}

/// [`format`] with title casing and email redaction enabled.
pub fn format_label(input: &str) -> String {
    format(Some(input), true, true)
}

fn redact(value: String) -> String {
    if might_be_email(&value) {
        log::warn!("This arg looks like an email address, redacting.");
        return REDACTED_EMAIL.to_string();
    }
    value
}

// Full RFC 822 validation is pointless here; anything with an `@` is treated as personal data.
fn might_be_email(value: &str) -> bool {
    value.contains('@')
}

fn to_title_case(input: &str) -> String {
    let title: Vec<char> = input.trim().chars().collect();
    let mut output = String::with_capacity(title.len());
    let mut index = 0;

    while index < title.len() {
        if !is_word_start(title[index]) {
            output.push(title[index]);
            index += 1;
            continue;
        }

        let start = index;
        while index < title.len() && !title[index].is_whitespace() && title[index] != '-' {
            index += 1;
        }
        let word: String = title[start..index].iter().collect();
        output.push_str(&format_word(&word, start, index, &title));
    }

    output
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || ('\u{00C0}'..='\u{00FF}').contains(&c)
}

fn format_word(word: &str, start: usize, end: usize, title: &[char]) -> String {
    let char_at = |position: Option<usize>| position.and_then(|p| title.get(p)).copied();
    let before = char_at(start.checked_sub(1));
    let two_before = char_at(start.checked_sub(2));
    let after = char_at(Some(end));

    let interior = start > 0 && end != title.len();
    let not_after_colon = two_before != Some(':');
    let not_split_compound = after != Some('-') || before == Some('-');
    let separated = matches!(before, Some(c) if c.is_whitespace() || c == '-');

    if interior && is_small_word(word) && not_after_colon && not_split_compound && separated {
        return word.to_lowercase();
    }

    if is_preformatted(word) {
        return word.to_string();
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_small_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    lower == VIA || SMALL_WORDS.contains(&lower.as_str())
}

// Embedded capitals (acronyms, camelCase) or a dot followed by more text (versions, domains).
fn is_preformatted(word: &str) -> bool {
    let tail: Vec<char> = word.chars().skip(1).collect();
    tail.iter().any(char::is_ascii_uppercase)
        || tail.windows(2).any(|pair| pair[0] == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_each_word() {
        assert_eq!(format_label("action value"), "Action Value");
        assert_eq!(format_label("category value"), "Category Value");
    }

    #[test]
    fn lowercases_interior_small_words() {
        assert_eq!(format_label("the lord of the rings"), "The Lord of the Rings");
        assert_eq!(format_label("salt AND pepper"), "Salt and Pepper");
    }

    #[test]
    fn keeps_first_and_last_small_words_capitalized() {
        assert_eq!(format_label("a tale to"), "A Tale To");
    }

    #[test]
    fn capitalizes_small_word_after_colon() {
        assert_eq!(format_label("star wars: a new hope"), "Star Wars: A New Hope");
    }

    #[test]
    fn hyphenated_compounds() {
        assert_eq!(format_label("step-by-step guide"), "Step-by-Step Guide");
        assert_eq!(format_label("first-contentful-paint"), "First-Contentful-Paint");
    }

    #[test]
    fn preformatted_words_are_untouched() {
        assert_eq!(format_label("iPhone release"), "iPhone Release");
        assert_eq!(format_label("version v1.2 notes"), "Version v1.2 Notes");
        assert_eq!(format_label("visit example.com"), "Visit example.com");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(format_label("  padded label "), "Padded Label");
    }

    #[test]
    fn redacts_email_addresses() {
        assert_eq!(format_label("contact john@example.com"), REDACTED_EMAIL);
        assert_eq!(format(Some("me@x"), false, true), REDACTED_EMAIL);
    }

    #[test]
    fn redaction_can_be_disabled() {
        assert_eq!(format(Some("me@x"), false, false), "me@x");
        assert_eq!(format(Some("me@x"), true, false), "Me@x");
    }

    #[test]
    fn missing_input_is_empty() {
        assert_eq!(format(None, true, true), "");
        assert_eq!(format(Some("plain words"), false, true), "plain words");
    }

    #[test]
    fn latin1_words_are_capitalized() {
        assert_eq!(format_label("école"), "École");
    }
}

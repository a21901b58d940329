//! Telegram MarkdownV2 escaping.

/// Characters MarkdownV2 reserves outside of entities.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape text for a MarkdownV2 message body.
///
/// One pass over the input; a backslash is escaped like any other reserved
/// character, and because emitted escapes are never revisited each original
/// backslash ends up escaped exactly once.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\\' || RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Undo [`escape_markdown_v2`] and drop `*` emphasis markers, for the
/// plain-text retry when Telegram rejects the markup.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '*' => {}
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVERY_RESERVED: &str = r"_*[]()~`>#+-=|{}.!\";

    #[test]
    fn every_reserved_character_is_escaped() {
        let escaped = escape_markdown_v2(EVERY_RESERVED);
        let mut chars = escaped.chars();
        while let Some(ch) = chars.next() {
            assert_eq!(ch, '\\', "expected escape before every character");
            assert!(chars.next().is_some());
        }
    }

    #[test]
    fn escaping_round_trips() {
        let input = format!("Dr. Müller ({EVERY_RESERVED}) says hi\\there");
        let escaped = escape_markdown_v2(&input);

        // Removing each `\X` pair reconstructs the original exactly.
        let mut restored = String::new();
        let mut chars = escaped.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                restored.push(chars.next().expect("dangling escape"));
            } else {
                restored.push(ch);
            }
        }
        assert_eq!(restored, input);
    }

    #[test]
    fn backslash_is_escaped_exactly_once() {
        assert_eq!(escape_markdown_v2(r"a\b"), r"a\\b");
        // An input that already looks escaped is still treated as literal
        // text: both characters get their own escape.
        assert_eq!(escape_markdown_v2(r"\."), r"\\\.");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(escape_markdown_v2("Anna Schmidt"), "Anna Schmidt");
    }

    #[test]
    fn strip_markup_removes_escapes_and_emphasis() {
        assert_eq!(strip_markup(r"*Name:* Anna\."), "Name: Anna.");
        assert_eq!(strip_markup(&escape_markdown_v2("a.b!c")), "a.b!c");
    }
}

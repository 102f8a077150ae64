//! Substitute text used when a stage answers but its payload is unusable.

pub const SUMMARY: &str = "Brak podsumowania profilu.";
pub const HOOK: &str = "Nie udało się wygenerować hooka. Spróbuj ponownie.";
pub const CONTENT: &str = "Nie udało się wygenerować treści. Spróbuj ponownie.";
pub const SUBJECT: &str = "Temat wiadomości niedostępny";
pub const MISSING: &str = "Brak danych";

/// Sentences grouped into one paragraph when the text has no breaks at all.
const SENTENCES_PER_PARAGRAPH: usize = 3;

/// Local replacement for the cleanup stage: normalises whitespace and
/// paragraph breaks.
///
/// Existing blank-line breaks are kept (runs of blank lines collapse to one).
/// A single unbroken block is split every few sentences.
#[must_use]
pub fn split_paragraphs(text: &str) -> String {
    let normalised = text.replace("\r\n", "\n");
    let paragraphs: Vec<String> = normalised
        .split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.len() > 1 {
        return paragraphs.join("\n\n");
    }
    let Some(single) = paragraphs.into_iter().next() else {
        return String::new();
    };

    sentences(&single)
        .chunks(SENTENCES_PER_PARAGRAPH)
        .map(|chunk| chunk.join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|(_, next)| *next == ' ') {
            let end = i + c.len_utf8();
            out.push(text[start..end].trim());
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

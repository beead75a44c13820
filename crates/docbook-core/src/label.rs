/// Schemes that mark a reference target as a URI outside the document.
const EXTERNAL_SCHEMES: [&str; 5] = ["http:", "https:", "mailto:", "ftp:", "file:"];

/// Loose form of an anchor id used as a last-resort match: leading `#`
/// dropped, lower-cased, whitespace runs collapsed to a single `-`.
pub(crate) fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('#');
    let mut out = String::with_capacity(trimmed.len());
    let mut last_dash = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !last_dash {
                out.push('-');
                last_dash = true;
            }
            continue;
        }
        last_dash = false;
        out.extend(ch.to_lowercase());
    }
    if out.ends_with('-') {
        out.pop();
    }
    out
}

pub(crate) fn is_external_target(target: &str) -> bool {
    let lowered = target.trim_start().to_ascii_lowercase();
    EXTERNAL_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
}

/// Removes characters XML 1.0 cannot carry (C0 controls other than tab, LF,
/// CR, plus U+FFFE/U+FFFF). Returns `None` when the text is already clean.
pub(crate) fn strip_invalid_xml_chars(text: &str) -> Option<String> {
    if !text.chars().any(is_invalid_xml_char) {
        return None;
    }
    Some(text.chars().filter(|ch| !is_invalid_xml_char(*ch)).collect())
}

fn is_invalid_xml_char(ch: char) -> bool {
    matches!(ch, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_id("  Getting   Started "), "getting-started");
        assert_eq!(normalize_id("#Intro"), "intro");
        assert_eq!(normalize_id("already-normal"), "already-normal");
    }

    #[test]
    fn external_targets_need_a_known_scheme() {
        assert!(is_external_target("https://example.com/a"));
        assert!(is_external_target("MAILTO:someone@example.com"));
        assert!(!is_external_target("intro"));
        assert!(!is_external_target("other.xml#intro"));
    }

    #[test]
    fn strips_control_characters_only() {
        assert_eq!(strip_invalid_xml_chars("plain\ttext\n"), None);
        assert_eq!(
            strip_invalid_xml_chars("bell\u{7}and\u{0}nul").as_deref(),
            Some("bellandnul")
        );
    }
}

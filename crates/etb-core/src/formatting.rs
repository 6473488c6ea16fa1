/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render an amount: whole numbers without decimals, others with two.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

/// Cut HTML `text` to at most `max_len` bytes, marking the cut.
///
/// The cut lands on a char boundary and never inside an entity (`&amp;`) or a tag.
pub fn truncate_message(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    const MARK: &str = "\n…";
    let mut end = max_len.saturating_sub(MARK.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let head = &text[..end];
    if let Some(amp) = head.rfind('&') {
        if !head[amp..].contains(';') {
            end = amp;
        }
    }
    let head = &text[..end];
    if let Some(lt) = head.rfind('<') {
        if !head[lt..].contains('>') {
            end = lt;
        }
    }
    format!("{}{MARK}", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn formats_whole_and_fractional_amounts() {
        assert_eq!(format_amount(350.0), "350");
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(45.5), "45.50");
        assert_eq!(format_amount(45.678), "45.68");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let s = "ééééé";
        let out = truncate_message(s, 7);
        assert!(out.len() <= 7);
        assert!(out.ends_with('…'));
        assert_eq!(truncate_message("short", 100), "short");
    }

    #[test]
    fn truncation_never_splits_entities_or_tags() {
        assert_eq!(truncate_message("ab &amp;cd", 8), "ab \n…");
        assert_eq!(truncate_message("ab <b>x</b>", 8), "ab \n…");
        assert_eq!(truncate_message("ab &lt; cdefgh", 11), "ab &lt;\n…");
    }
}

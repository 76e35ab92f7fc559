//! Deterministic SSML rendering.
//!
//! Every [`crate::types::ChatResponse`] carries both plain text and its SSML
//! rendering. The renderer is a pure function of the text so the pair stays
//! synchronized: rendering the same text twice yields the same markup.

/// Escape characters with special meaning in SSML/XML.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render plain text to well-formed SSML for the synthesizer.
pub fn render_ssml(text: &str) -> String {
    format!("<speak>{}</speak>", escape_xml(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_wraps_in_speak() {
        assert_eq!(render_ssml("Hello"), "<speak>Hello</speak>");
    }

    #[test]
    fn test_render_escapes_xml() {
        assert_eq!(
            render_ssml(r#"a < b & "c""#),
            "<speak>a &lt; b &amp; &quot;c&quot;</speak>"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let text = "The answer is 42 > 41";
        assert_eq!(render_ssml(text), render_ssml(text));
    }

    #[test]
    fn test_render_empty_text() {
        assert_eq!(render_ssml(""), "<speak></speak>");
    }
}

// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans raw review / sentence text before tokenisation.
//
// IMDb reviews are scraped HTML fragments and carry:
//   - `<br />` line breaks, often doubled
//   - HTML entities for quotes and ampersands
//   - stray tabs and control characters
// XNLI sentences are mostly clean but go through the same
// steps so both datasets reach the tokenizer in one shape.
//
// Cleaning steps (applied in order):
//   1. Replace `<br />` variants with newlines
//   2. Decode the few HTML entities that occur in the data
//   3. Map Unicode whitespace / control characters to spaces
//   4. Collapse runs of spaces and trim every line
//   5. Drop blank lines

const LINE_BREAKS: [&str; 4] = ["<br />", "<br/>", "<br>", "<BR>"];

const ENTITIES: [(&str, &str); 5] = [
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
];

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw text string for downstream tokenisation.
    pub fn clean(&self, text: &str) -> String {
        // ── Step 1 + 2: markup ────────────────────────────────────────────────
        let mut text = text.to_string();
        for br in LINE_BREAKS {
            text = text.replace(br, "\n");
        }
        // `&amp;` is last in ENTITIES so "&amp;quot;" decodes only once
        for (entity, plain) in ENTITIES {
            text = text.replace(entity, plain);
        }

        // ── Step 3: normalise individual characters ───────────────────────────
        let text: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                '\r' => '\n',
                c if c.is_control() && c != '\n' => ' ',
                c => c,
            })
            .collect();

        // ── Step 4 + 5: per-line whitespace ───────────────────────────────────
        text.lines()
            .map(|line| line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello   world"), "hello world");
    }

    #[test]
    fn test_html_breaks_become_lines() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Great film.<br /><br />Loved it"), "Great film.\nLoved it");
    }

    #[test]
    fn test_decodes_entities() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("&quot;Wow&quot; &amp; more"), "\"Wow\" & more");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\x01world"), "hello world");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
    }
}

/// Drop control and format characters, keeping line breaks and tabs.
/// Layout is otherwise untouched.
pub fn strip_invisible(raw: &str) -> String {
    raw.chars()
        .filter(|c| match c {
            '\n' | '\t' => true,
            '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' => false,
            c => !c.is_control(),
        })
        .collect()
}

/// Clean recognized text before it goes downstream.
/// Strips invisible characters, trims each line and removes blank lines.
/// Script punctuation such as the Ethiopic word separator is left alone.
pub fn sanitize_extracted_text(raw: &str) -> String {
    strip_invisible(raw)
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

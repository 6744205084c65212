//! Inline style declarations.

/// Parse a `style` attribute into ordered `(property, value)` pairs.
///
/// Property names are lower-cased; declarations without a colon are skipped.
/// A later declaration of the same property replaces the earlier one in place.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for decl in style.split(';') {
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        match out.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => out.push((name, value)),
        }
    }
    out
}

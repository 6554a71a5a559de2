/// Turn free text into a lowercase, dash-separated ASCII slug.
///
/// Returns an empty string if the text has no alphanumeric characters.
pub fn slugify(raw: &str) -> String {
    let mut out = String::new();
    let mut prev_dash = false;
    for ch in raw.trim().chars() {
        let lc = ch.to_ascii_lowercase();
        if lc.is_ascii_alphanumeric() || lc == '_' {
            out.push(lc);
            prev_dash = false;
        } else if !out.is_empty() && !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// Use the given slug if present and non-blank, else derive one from `source`.
pub fn slug_or_derive(slug: Option<String>, source: &str) -> String {
    match slug {
        Some(slug) if !slug.trim().is_empty() => slugify(&slug),
        _ => slugify(source),
    }
}

use std::collections::HashSet;

use ammonia::Builder;
use regex::Regex;

/// Strips markup from chat text and returns plain text. Tag contents are
/// kept, except for `script` and `style` blocks which are dropped whole.
pub fn sanitize_message(input: &str) -> String {
    let mut builder = Builder::default();
    builder.tags(HashSet::new());

    let cleaned = builder.clean(input).to_string();
    decode_text_entities(&cleaned).trim().to_string()
}

// ammonia serialises text nodes as HTML; these are the only escapes it
// emits outside attributes. `&amp;` goes last so "&amp;lt;" stays "&lt;".
fn decode_text_entities(html: &str) -> String {
    html.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Reduces an uploaded file name to something safe to use as the last
/// segment of a storage key.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let re = Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex");
    let cleaned = re.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.chars().take(128).collect()
    }
}

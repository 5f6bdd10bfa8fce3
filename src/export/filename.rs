use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Name used when the source document has none
pub const FALLBACK_EDITED_NAME: &str = "edited-document.pdf";

static INVALID_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).ok());

static PDF_SUFFIX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\.pdf$").ok());

/// Sanitize a filename for cross-platform compatibility
/// Removes/replaces characters that are invalid on Windows, macOS, or Linux
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = match INVALID_CHARS.as_ref() {
        Some(re) => re.replace_all(name, "_").into_owned(),
        None => name.to_string(),
    };

    // Leading/trailing spaces and dots are problematic on Windows
    let sanitized = sanitized.trim_matches(|c| c == ' ' || c == '.');

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Download name for an edited copy: `report.pdf` becomes `report-edited.pdf`
pub fn edited_file_name(source: Option<&Path>) -> String {
    let Some(name) = source
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
    else {
        return FALLBACK_EDITED_NAME.to_string();
    };

    let stem = match PDF_SUFFIX.as_ref() {
        Some(re) => re.replace(name, "").into_owned(),
        None => name.to_string(),
    };
    if stem.trim_matches(|c| c == ' ' || c == '.').is_empty() {
        return FALLBACK_EDITED_NAME.to_string();
    }
    format!("{}-edited.pdf", sanitize_filename(&stem))
}

use imaging::SUPPORTED_FORMATS;

/// Reduce a client-supplied upload name to a bare, printable filename.
///
/// Directory components (either separator) are dropped and ASCII control
/// characters removed, so the result is safe to echo in responses and logs.
pub fn display_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    base.chars()
        .filter(|c| !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lowercase extension of `filename`, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Subtype of a MIME type, lowercased and stripped of parameters.
///
/// `"image/PNG; charset=binary"` becomes `"png"`. Returns an empty string
/// when there is no `/`.
pub fn content_subtype(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .and_then(|essence| essence.split_once('/'))
        .map(|(_, sub)| sub.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Extension under which an upload is stored: the filename's own extension
/// when it is a supported image format, otherwise the declared subtype.
pub fn storage_extension(filename: &str, subtype: &str) -> String {
    extension_of(filename)
        .filter(|ext| SUPPORTED_FORMATS.contains(&ext.as_str()))
        .unwrap_or_else(|| subtype.to_string())
}

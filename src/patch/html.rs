//! Script tag injection into emitted pages.

/// Byte pattern for </body> - matched case-insensitively
const BODY_CLOSE: &[u8] = b"</body>";

/// Whether `path` names an HTML page.
pub fn is_html(path: &str) -> bool {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm")
}

/// Insert `tag` right before the last `</body>`, or append it if there is
/// none. Returns `None` when the page already contains `tag`.
pub fn inject_script(content: &[u8], tag: &str) -> Option<Vec<u8>> {
    let tag = tag.as_bytes();
    if content.windows(tag.len()).any(|w| w == tag) {
        return None;
    }

    let mut result = Vec::with_capacity(content.len() + tag.len());

    // Reverse search for </body> using byte windows
    if let Some(pos) = content
        .windows(BODY_CLOSE.len())
        .rposition(|w| w.eq_ignore_ascii_case(BODY_CLOSE))
    {
        result.extend_from_slice(&content[..pos]);
        result.extend_from_slice(tag);
        result.extend_from_slice(&content[pos..]);
        return Some(result);
    }

    // No </body> found, append to end (browsers handle this gracefully)
    result.extend_from_slice(content);
    result.extend_from_slice(tag);
    Some(result)
}

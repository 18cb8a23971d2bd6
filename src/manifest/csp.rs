//! Content-Security-Policy editing.
//!
//! Only `connect-src` is touched. Policies are split on `;`, trimmed, and
//! empty segments dropped before re-joining with `"; "`, so an edit never
//! produces doubled delimiters even when the input already had some.

/// What [`allow_connect`] did to a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CspEdit {
    /// Origin appended to an existing `connect-src`.
    Extended,
    /// A new `connect-src 'self' <origin>` directive was added.
    Added,
    /// The origin was already allowed.
    Unchanged,
}

const CONNECT_SRC: &str = "connect-src";

/// Allow `origin` in the policy's `connect-src` directive.
pub fn allow_connect(policy: &str, origin: &str) -> (String, CspEdit) {
    let mut directives: Vec<String> = policy
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();

    let connect = directives
        .iter_mut()
        .find(|d| directive_name(d).eq_ignore_ascii_case(CONNECT_SRC));

    let edit = match connect {
        Some(directive) if directive.split_ascii_whitespace().skip(1).any(|s| s == origin) => {
            CspEdit::Unchanged
        }
        Some(directive) => {
            directive.push(' ');
            directive.push_str(origin);
            CspEdit::Extended
        }
        None => {
            directives.push(format!("{CONNECT_SRC} 'self' {origin}"));
            CspEdit::Added
        }
    };

    (directives.join("; "), edit)
}

fn directive_name(directive: &str) -> &str {
    directive.split_ascii_whitespace().next().unwrap_or("")
}

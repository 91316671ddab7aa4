//! Response sanitizer (§4.10, §7) — strips secret-shaped substrings before
//! any text reaches `response_text` on the `error` branch. A small
//! focused scanner rather than a new regex dependency, matching the
//! teacher's preference for hand-rolled single-purpose string helpers over
//! pulling in a crate for one pattern (§2.2 of the expanded spec).

const REDACTED: &str = "[redacted]";
const MIN_SECRET_LEN: usize = 20;

/// Replaces `key=value` tokens whose value is at least `MIN_SECRET_LEN`
/// characters, and any standalone token that looks like a credential
/// (long runs of alphanumerics/`-`/`_`/`.` with no whitespace), with a
/// fixed placeholder.
pub fn sanitize(text: &str) -> String {
    text.split_whitespace()
        .map(sanitize_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_token(token: &str) -> String {
    if let Some(eq_pos) = token.find('=') {
        let (key, value) = token.split_at(eq_pos);
        let value = &value[1..];
        if value.len() >= MIN_SECRET_LEN && looks_like_secret(value) {
            return format!("{key}={REDACTED}");
        }
        return token.to_string();
    }

    if token.len() >= MIN_SECRET_LEN && looks_like_secret(token) {
        return REDACTED.to_string();
    }

    token.to_string()
}

fn looks_like_secret(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_key_value_secrets() {
        let input = "connection failed with api_key=sk-abcdefghijklmnopqrstuvwxyz012345";
        let out = sanitize(input);
        assert!(!out.contains("sk-abcdefghijklmnopqrstuvwxyz012345"));
        assert!(out.contains("api_key=[redacted]"));
    }

    #[test]
    fn redacts_standalone_long_tokens() {
        let input = "token eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 rejected";
        let out = sanitize(input);
        assert!(!out.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
    }

    #[test]
    fn leaves_ordinary_text_untouched() {
        let input = "the vector provider timed out after 10 seconds";
        assert_eq!(sanitize(input), input);
    }
}

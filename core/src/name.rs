/// Longest metric name the Librato API accepts.
pub const MAX_NAME_LEN: usize = 255;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')
}

/// Make `name` acceptable to the metrics API.
///
/// The first contiguous run of characters outside `[A-Za-z0-9_.:-]` collapses
/// into a single `_`. Later runs are left as they are. The result is then cut
/// to at most [`MAX_NAME_LEN`] characters.
pub fn sanitize(name: &str) -> String {
    let mut sanitized = match name.find(|c: char| !is_allowed(c)) {
        Some(start) => {
            let end = name[start..].find(is_allowed).map_or(name.len(), |offset| start + offset);
            let mut out = String::with_capacity(name.len());
            out.push_str(&name[..start]);
            out.push('_');
            out.push_str(&name[end..]);
            out
        }
        None => name.to_owned(),
    };

    if let Some((cut, _)) = sanitized.char_indices().nth(MAX_NAME_LEN) {
        sanitized.truncate(cut);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass_through() {
        assert_eq!(sanitize("api.requests:total-2_x"), "api.requests:total-2_x");
    }

    #[test]
    fn first_invalid_run_becomes_one_underscore() {
        assert_eq!(sanitize("my.metric!name"), "my.metric_name");
        assert_eq!(sanitize("a!@#b"), "a_b");
        assert_eq!(sanitize("trailing  "), "trailing_");
        assert_eq!(sanitize("/leading"), "_leading");
    }

    #[test]
    fn only_the_first_run_is_replaced() {
        assert_eq!(sanitize("a b c"), "a_b c");
        assert_eq!(sanitize("x!!y??z"), "x_y??z");
    }

    #[test]
    fn long_names_are_truncated() {
        let name = "m".repeat(300);
        let sanitized = sanitize(&name);
        assert_eq!(sanitized.len(), MAX_NAME_LEN);

        let name = format!("é{}", "m".repeat(300));
        let sanitized = sanitize(&name);
        assert_eq!(sanitized.chars().count(), MAX_NAME_LEN);
        assert!(sanitized.starts_with("_m"));
    }
}

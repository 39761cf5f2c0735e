use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

pub static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

/// `"Rose Gold Ring (18K)"` -> `"rose-gold-ring-18k"`
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= 160 && SLUG_PATTERN.is_match(slug)
}

/// Uses the explicit slug when given, otherwise derives one from `name`.
/// Explicit slugs are normalized the same way.
pub fn resolve_slug(explicit: Option<&str>, name: &str) -> Option<String> {
    let slug = match explicit {
        Some(raw) if !raw.trim().is_empty() => slugify(raw),
        _ => slugify(name),
    };
    is_valid_slug(&slug).then_some(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Rose Gold Ring (18K)"), "rose-gold-ring-18k");
        assert_eq!(slugify("  --Solitaire--  "), "solitaire");
        assert_eq!(slugify("Été"), "t");
    }

    #[test]
    fn resolve_prefers_explicit_slug() {
        assert_eq!(
            resolve_slug(Some("Summer Sale"), "ignored").as_deref(),
            Some("summer-sale")
        );
        assert_eq!(resolve_slug(None, "Temple Jewellery").as_deref(), Some("temple-jewellery"));
        assert_eq!(resolve_slug(Some("   "), "Band").as_deref(), Some("band"));
        assert!(resolve_slug(None, "!!!").is_none());
    }

    #[test]
    fn validates_slug_shape() {
        assert!(is_valid_slug("gold-rings"));
        assert!(!is_valid_slug("Gold-Rings"));
        assert!(!is_valid_slug("gold--rings"));
        assert!(!is_valid_slug(""));
    }
}

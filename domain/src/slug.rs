//! Slug generation from event names.

/// Map a display name to its URL key.
///
/// The name is lowercased, spaces become hyphens and the Icelandic letters
/// á é ð ó í ý ö æ are folded to ASCII. Every other character passes through
/// unchanged, so two different names can map to the same slug.
pub fn create_slug(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            'á' => slug.push('a'),
            'é' => slug.push('e'),
            'ð' => slug.push('d'),
            'ó' => slug.push('o'),
            'í' => slug.push('i'),
            'ý' => slug.push('y'),
            'ö' => slug.push('o'),
            'æ' => slug.push_str("ae"),
            ' ' => slug.push('-'),
            other => slug.push(other),
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name() {
        assert_eq!(create_slug("Test event"), "test-event");
    }

    #[test]
    fn folds_icelandic_letters() {
        assert_eq!(create_slug("Árshátíð Ægis"), "arshatid-aegis");
        assert_eq!(create_slug("Bóndadagur í Ölfusi"), "bondadagur-i-olfusi");
        assert_eq!(create_slug("Rýmingarsala"), "rymingarsala");
    }

    #[test]
    fn unmapped_characters_pass_through() {
        assert_eq!(create_slug("Þorrablót!"), "þorrablot!");
        assert_eq!(create_slug("a_b.c"), "a_b.c");
        assert_eq!(create_slug("tab\there"), "tab\there");
    }

    #[test]
    fn idempotent_over_mapped_characters() {
        for name in ["Test event", "ÁÉÐÓÍÝÖÆ", "  æ ð ", "árshátíð"] {
            let once = create_slug(name);
            assert_eq!(create_slug(&once), once);
        }
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(create_slug(""), "");
    }
}

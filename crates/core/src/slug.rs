//! URL slugs for categories and products.

/// Turn a display name into a lowercase, hyphen-separated slug.
///
/// Accented Latin letters are folded to ASCII; any other non-alphanumeric
/// run becomes a single hyphen.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(ch);
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }

    slug
}

const fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        assert_eq!(slugify("Robe Lamba"), "robe-lamba");
    }

    #[test]
    fn test_collapses_separators_and_trims() {
        assert_eq!(slugify("  Sac -- en   raphia! "), "sac-en-raphia");
    }

    #[test]
    fn test_folds_accents() {
        assert_eq!(slugify("Épices & Thé Vanillé"), "epices-the-vanille");
    }

    #[test]
    fn test_nothing_usable() {
        assert_eq!(slugify("!!!"), "");
    }
}

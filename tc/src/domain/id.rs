//! Id generation for tasks and sub-tasks
//!
//! Ids use the format: `{8-char-hex}-{kind}-{slug}`
//! Example: `9f3a51c2-st-outline-the-main-sections`

/// Generate an id from a kind tag and a title
pub fn generate_id(kind: &str, title: &str) -> String {
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    // v7 leads with the timestamp; the tail is random
    let suffix = &uuid[uuid.len() - 8..];
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}-{}", suffix, kind)
    } else {
        format!("{}-{}-{}", suffix, kind, slug)
    }
}

/// Slugify a title for use in ids
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .take(6)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Prepare quarterly report"), "prepare-quarterly-report");
        assert_eq!(slugify("Don't   panic!"), "dont-panic");
        assert_eq!(slugify("a b c d e f g h"), "a-b-c-d-e-f");
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("st", "Outline the sections");
        assert!(id.ends_with("-st-outline-the-sections"));
        assert_eq!(id.split('-').next().unwrap().len(), 8);
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id("st", "Same title");
        let b = generate_id("st", "Same title");
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_id_empty_title() {
        let id = generate_id("st", "!!!");
        assert!(id.ends_with("-st"));
    }
}

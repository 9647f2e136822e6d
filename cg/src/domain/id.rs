//! Domain ID generation
//!
//! All IDs use the format: `{6-char-hex}-{kind}-{slug}`
//! Example: `3f9c2a-task-cafe-launch`

/// Generate a domain ID from kind and title
pub fn generate_id(kind: &str, title: &str) -> String {
    // The head of a v7 UUID is a millisecond timestamp; only the tail is
    // random, so the prefix comes from there
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    let hex_prefix = &uuid[uuid.len() - 6..];
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}-{}", hex_prefix, kind)
    } else {
        format!("{}-{}-{}", hex_prefix, kind, slug)
    }
}

/// Slugify a title for use in IDs
///
/// Persian business names survive as-is (alphanumeric per Unicode);
/// everything else collapses to single hyphens.
fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .take(5)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("task", "Cafe Launch Campaign");
        assert!(id.contains("-task-"));
        assert!(id.ends_with("cafe-launch-campaign"));
        assert_eq!(id.split('-').next().map(str::len), Some(6));
    }

    #[test]
    fn test_generate_id_empty_title() {
        let id = generate_id("plan", "");
        assert!(id.ends_with("-plan"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Multiple   Spaces!"), "multiple-spaces");
        assert_eq!(slugify("کافه تهران"), "کافه-تهران");
    }

    #[test]
    fn test_slugify_caps_word_count() {
        assert_eq!(slugify("one two three four five six seven"), "one-two-three-four-five");
    }

    #[test]
    fn test_ids_are_unique() {
        // A batch minted within the same millisecond must not collide
        let ids: std::collections::HashSet<_> = (0..64).map(|_| generate_id("task", "same")).collect();
        assert_eq!(ids.len(), 64);
    }
}

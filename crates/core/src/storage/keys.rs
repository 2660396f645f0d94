//! Object key layout.
//!
//! Originals and derived variants live in separate namespaces so a derived
//! write can never land on an original:
//!
//! ```text
//! originals/{user_id}/{image_id}/{sanitized_filename}
//! transformed/{image_id}/{timestamp_millis}-{nonce}.{ext}
//! ```

use chrono::Utc;
use uuid::Uuid;

use prism_shared::types::{ImageId, UserId};

/// Prefix for uploaded originals.
pub const ORIGINALS_PREFIX: &str = "originals";

/// Prefix for transformation outputs.
pub const TRANSFORMED_PREFIX: &str = "transformed";

/// Key for an uploaded original.
#[must_use]
pub fn original_key(user_id: UserId, image_id: ImageId, filename: &str) -> String {
    let sanitized = sanitize_filename(filename);
    let name = if sanitized.trim_matches(['.', '_']).is_empty() {
        "image".to_string()
    } else {
        sanitized
    };
    format!("{ORIGINALS_PREFIX}/{user_id}/{image_id}/{name}")
}

/// Fresh key for a transformation output of `image_id`.
///
/// Every call returns a different key, even within the same millisecond.
#[must_use]
pub fn derived_key(image_id: ImageId, extension: &str) -> String {
    format!(
        "{TRANSFORMED_PREFIX}/{image_id}/{}-{}.{extension}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("cat.png"), "cat.png");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("日本語.png"), "___.png");
    }

    #[test]
    fn test_original_key_layout() {
        let user_id = UserId::new();
        let image_id = ImageId::new();
        let key = original_key(user_id, image_id, "holiday.jpg");

        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], ORIGINALS_PREFIX);
        assert_eq!(parts[1], user_id.to_string());
        assert_eq!(parts[2], image_id.to_string());
        assert_eq!(parts[3], "holiday.jpg");
    }

    #[test]
    fn test_original_key_empty_filename() {
        let key = original_key(UserId::new(), ImageId::new(), "");
        assert!(key.ends_with("/image"));

        let key = original_key(UserId::new(), ImageId::new(), "..");
        assert!(key.ends_with("/image"));
    }

    #[test]
    fn test_derived_keys_are_unique() {
        let image_id = ImageId::new();
        let first = derived_key(image_id, "png");
        let second = derived_key(image_id, "png");

        assert_ne!(first, second);
        assert!(first.starts_with(&format!("{TRANSFORMED_PREFIX}/{image_id}/")));
        assert!(first.ends_with(".png"));
    }

    proptest! {
        // Derived keys never collide with the originals namespace.
        #[test]
        fn prop_namespaces_disjoint(filename in ".{0,40}", ext in "[a-z]{3,4}") {
            let image_id = ImageId::new();
            let original = original_key(UserId::new(), image_id, &filename);
            let derived = derived_key(image_id, &ext);

            prop_assert!(original.starts_with("originals/"));
            prop_assert!(derived.starts_with("transformed/"));
            prop_assert_ne!(original, derived);
        }

        #[test]
        fn prop_sanitized_filename_safe_chars(filename in ".*") {
            let sanitized = sanitize_filename(&filename);

            for c in sanitized.chars() {
                let is_safe = c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';
                prop_assert!(is_safe, "Unexpected character in sanitized filename: {}", c);
            }
        }
    }
}

//! Shared key generation for thumbnail artifacts.
//!
//! Thumbnail key format: `{thumb_dir}/{owner_id}_{file_name}{suffix}`.
//! Avatar key format: `{dir}/avatar_{owner_id}_{index}.png`.

/// Deterministic thumbnail key for one (owner, file name) pair.
///
/// Owner ids are numeric, so the first `_` always separates the owner from the
/// file name and two different pairs can never produce the same key.
pub fn thumb_key(thumb_dir: &str, owner_id: u64, file_name: &str, suffix: &str) -> String {
    join(thumb_dir, &format!("{}_{}{}", owner_id, file_name, suffix))
}

/// Key of one avatar size; `index` is 0 (small), 1 (medium) or 2 (large).
pub fn avatar_key(dir: &str, owner_id: u64, index: usize) -> String {
    join(dir, &format!("avatar_{}_{}.png", owner_id, index))
}

fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumb_key() {
        assert_eq!(
            thumb_key("thumbs/", 12, "photo.png", "._thumb"),
            "thumbs/12_photo.png._thumb"
        );
        assert_eq!(thumb_key("", 1, "a.jpg", ".t"), "1_a.jpg.t");
    }

    #[test]
    fn test_thumb_key_does_not_collide_across_owners() {
        let a = thumb_key("t", 1, "2_a.png", "._thumb");
        let b = thumb_key("t", 12, "_a.png", "._thumb");
        let c = thumb_key("t", 12, "a.png", "._thumb");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_avatar_key() {
        assert_eq!(avatar_key("avatars", 5, 2), "avatars/avatar_5_2.png");
    }
}

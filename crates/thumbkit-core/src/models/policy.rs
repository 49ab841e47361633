use serde::{Deserialize, Serialize};

/// The part of a user's storage policy that thumbnail generation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePolicy {
    pub id: u64,
    /// Directory holding this policy's thumbnails. `{uid}` expands to the owner id.
    pub thumb_dir: String,
}

impl StoragePolicy {
    /// Thumbnail directory for one owner, without a trailing slash
    pub fn thumb_dir_for(&self, owner_id: u64) -> String {
        self.thumb_dir
            .replace("{uid}", &owner_id.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumb_dir_for_owner() {
        let policy = StoragePolicy {
            id: 1,
            thumb_dir: "thumbs/{uid}/".to_string(),
        };
        assert_eq!(policy.thumb_dir_for(42), "thumbs/42");

        let flat = StoragePolicy {
            id: 2,
            thumb_dir: "thumbs".to_string(),
        };
        assert_eq!(flat.thumb_dir_for(42), "thumbs");
    }
}

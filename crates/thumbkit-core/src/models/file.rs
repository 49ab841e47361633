use serde::{Deserialize, Serialize};

use super::picture::PictureInfo;

/// A stored object as seen by thumbnail generation.
///
/// Records are loaded by the metadata store; generation reads them and may
/// write back `picture_info`. An `id` of `0` marks a record that has not been
/// persisted yet, in which case picture-info is only kept in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: u64,
    pub owner_id: u64,
    /// Display name, used for strategy dispatch and the thumbnail path
    pub name: String,
    pub size: u64,
    /// Storage key of the original bytes
    pub source_name: String,
    /// `"width,height"` of the original raster, when known
    pub picture_info: Option<String>,
}

impl SourceFile {
    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// Parsed picture-info; `None` when absent or malformed.
    pub fn picture(&self) -> Option<PictureInfo> {
        self.picture_info
            .as_deref()
            .and_then(|raw| raw.parse::<PictureInfo>().ok())
    }

    pub fn has_picture_info(&self) -> bool {
        self.picture().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(picture_info: Option<&str>) -> SourceFile {
        SourceFile {
            id: 7,
            owner_id: 1,
            name: "photo.png".to_string(),
            size: 1024,
            source_name: "uploads/1/photo.png".to_string(),
            picture_info: picture_info.map(String::from),
        }
    }

    #[test]
    fn test_picture_parsed() {
        let f = file(Some("800,600"));
        assert!(f.has_picture_info());
        assert_eq!(f.picture(), Some(PictureInfo::new(800, 600)));
    }

    #[test]
    fn test_empty_or_garbage_picture_info() {
        assert!(!file(None).has_picture_info());
        assert!(!file(Some("")).has_picture_info());
        assert!(!file(Some("wide,tall")).has_picture_info());
    }

    #[test]
    fn test_unpersisted_record() {
        let mut f = file(None);
        f.id = 0;
        assert!(!f.is_persisted());
    }
}

//! Filesystem snapshot store backed by a capability directory.
//!
//! Each story owns two entries: `<story-id>.img` with the raw image bytes
//! and `<story-id>.json` with the metadata and a SHA-256 digest of the
//! bytes. The metadata file is written last, through a temporary name, so a
//! snapshot only becomes visible once both halves are on disk.

use crate::generation::domain::ImageData;
use crate::reference::{
    domain::{MasterReferenceInfo, VisualElementNames},
    ports::{ReferenceSnapshotStore, SnapshotStoreError, SnapshotStoreResult},
};
use crate::story::domain::StoryId;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;

const SNAPSHOT_FORMAT_VERSION: u32 = 1;
const IMAGE_SUFFIX: &str = ".img";
const METADATA_SUFFIX: &str = ".json";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMetadata {
    version: u32,
    story_id: StoryId,
    visual_element_names: Vec<String>,
    descriptive_mapping: Vec<String>,
    generated_at: DateTime<Utc>,
    image_sha256: String,
    image_len: usize,
}

/// Snapshot store writing into a single directory.
#[derive(Debug)]
pub struct FileSystemSnapshotStore {
    dir: Dir,
}

impl FileSystemSnapshotStore {
    /// Opens the directory at `path`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Io`] when the directory cannot be
    /// created or opened.
    pub fn open(path: &Utf8Path) -> SnapshotStoreResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self { dir })
    }

    /// Wraps an already opened capability directory.
    #[must_use]
    pub const fn from_dir(dir: Dir) -> Self {
        Self { dir }
    }

    fn image_name(story_id: StoryId) -> String {
        format!("{story_id}{IMAGE_SUFFIX}")
    }

    fn metadata_name(story_id: StoryId) -> String {
        format!("{story_id}{METADATA_SUFFIX}")
    }

    fn remove_if_present(&self, name: &str) -> SnapshotStoreResult<()> {
        match self.dir.remove_file(name) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn read_if_present(&self, name: &str) -> SnapshotStoreResult<Option<Vec<u8>>> {
        match self.dir.read(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl ReferenceSnapshotStore for FileSystemSnapshotStore {
    fn save(&self, info: &MasterReferenceInfo) -> SnapshotStoreResult<()> {
        let story_id = info.story_id();
        let image = info.image_data();
        let metadata = SnapshotMetadata {
            version: SNAPSHOT_FORMAT_VERSION,
            story_id,
            visual_element_names: info.visual_element_names().as_slice().to_vec(),
            descriptive_mapping: info.descriptive_mapping().to_vec(),
            generated_at: info.generated_at(),
            image_sha256: image.digest_hex(),
            image_len: image.len(),
        };
        let encoded = serde_json::to_vec_pretty(&metadata)?;

        self.dir.write(Self::image_name(story_id), image.as_bytes())?;
        let metadata_name = Self::metadata_name(story_id);
        let staging_name = format!("{metadata_name}.tmp");
        self.dir.write(&staging_name, encoded)?;
        self.dir.rename(&staging_name, &self.dir, &metadata_name)?;
        Ok(())
    }

    fn load(&self, story_id: StoryId) -> SnapshotStoreResult<Option<MasterReferenceInfo>> {
        let Some(raw_metadata) = self.read_if_present(&Self::metadata_name(story_id))? else {
            return Ok(None);
        };
        let metadata: SnapshotMetadata = serde_json::from_slice(&raw_metadata)?;
        let corrupt = |reason: String| SnapshotStoreError::Corrupt { story_id, reason };

        if metadata.version != SNAPSHOT_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported snapshot version {}",
                metadata.version
            )));
        }
        if metadata.story_id != story_id {
            return Err(corrupt(format!(
                "metadata belongs to story {}",
                metadata.story_id
            )));
        }

        let bytes = self
            .read_if_present(&Self::image_name(story_id))?
            .ok_or_else(|| corrupt("image file missing".to_owned()))?;
        let image = ImageData::new(bytes);
        if image.len() != metadata.image_len || image.digest_hex() != metadata.image_sha256 {
            return Err(corrupt("image digest mismatch".to_owned()));
        }

        let names = VisualElementNames::new(&metadata.visual_element_names)
            .map_err(|err| corrupt(err.to_string()))?;
        Ok(Some(MasterReferenceInfo::restore(
            story_id,
            image,
            names,
            metadata.descriptive_mapping,
            metadata.generated_at,
        )))
    }

    fn remove(&self, story_id: StoryId) -> SnapshotStoreResult<()> {
        self.remove_if_present(&Self::metadata_name(story_id))?;
        self.remove_if_present(&Self::image_name(story_id))
    }

    fn clear(&self) -> SnapshotStoreResult<()> {
        for entry in self.dir.entries()? {
            let name = entry?.file_name()?;
            let is_snapshot_file = [IMAGE_SUFFIX, METADATA_SUFFIX, ".json.tmp"]
                .iter()
                .any(|suffix| name.ends_with(suffix));
            if is_snapshot_file {
                self.remove_if_present(&name)?;
            }
        }
        Ok(())
    }
}

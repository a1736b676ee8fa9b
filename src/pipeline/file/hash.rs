//! Identity stage: streamed content hash plus a fresh opaque id.
//!
//! The hash is stable across renames and is the dedup key; the id is stable
//! across reprocessing of the same library entry.

use anyhow::Context;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::data::media::MediaRecord;
use crate::pipeline::{FileStage, StageError};

const HASH_CHUNK_SIZE: usize = 65536;

pub struct HashStage {
    media_dir: PathBuf,
}

impl HashStage {
    pub fn new(media_dir: &Path) -> Self {
        Self {
            media_dir: media_dir.to_path_buf(),
        }
    }
}

impl FileStage for HashStage {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn process(&self, record: &mut MediaRecord) -> Result<(), StageError> {
        // the driver seeds the hash it already computed for change
        // detection; only hash here when no one did
        if record.hash.is_empty() {
            let path = self.media_dir.join(&record.relative_path);
            record.hash = hash_file(&path).map_err(StageError::Other)?;
        }
        record.id = uuid::Uuid::new_v4().simple().to_string();
        Ok(())
    }
}

/// SHA-256 of the file contents, streamed in fixed-size chunks so large
/// video files never get buffered whole.
pub fn hash_file(path: &Path) -> anyhow::Result<String> {
    let mut file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

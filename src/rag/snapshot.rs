//! On-disk form of the vector store: one pretty-printed JSON array of
//! entries. Writes go to a sibling `.tmp` file which is synced and then
//! renamed over the target, so readers only ever see a whole snapshot.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::store::StoreError;
use super::types::VectorEntry;

/// Reads the snapshot at `path`. A missing file is an empty store; the
/// parent directory is created so the first save succeeds.
pub fn load(path: &Path) -> Result<Vec<VectorEntry>, StoreError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    serde_json::from_slice(&raw).map_err(|err| {
        tracing::error!("Vector snapshot {} is unreadable: {}", path.display(), err);
        StoreError::CorruptSnapshot(err.to_string())
    })
}

pub fn save(path: &Path, entries: &[VectorEntry]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_vec_pretty(entries)
        .map_err(|err| StoreError::Persistence(std::io::Error::new(ErrorKind::InvalidData, err)))?;

    let tmp_path = temp_path(path);
    let written = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(err) = written {
        let _ = fs::remove_file(&tmp_path);
        tracing::error!("Failed to write vector snapshot {}: {}", path.display(), err);
        return Err(StoreError::Persistence(err));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "vectors.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

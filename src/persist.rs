//! Disk I/O helpers: read the backing file, write it back in place or via
//! temp-file + rename.
//!
//! The in-place write truncates first, so a crash mid-write can leave a
//! partial file. The rename-over approach is close to atomic on most
//! platforms; on FAT32 or network shares there are no hard guarantees.

use crate::error::{Error, Result};
use crate::serializer::Serializer;
use crate::Document;
use std::io::Write;
use std::path::Path;

/// Reads and decodes the file at `path`. A missing file is an error here;
/// callers that want create-on-missing check [`Path::exists`] first.
pub fn read_document<S: Serializer>(path: &Path, serializer: &S) -> Result<Document> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Io(format!("reading {}: {e}", path.display())))?;
    serializer.deserialize(&bytes)
}

/// Create or truncate `path` and write `bytes` to it.
pub fn write_truncate(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| Error::Io(format!("creating {}: {e}", path.display())))?;
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|e| Error::Io(format!("writing {}: {e}", path.display())))
}

/// Write `bytes` to `<path>.tmp` and then rename over `path`. This avoids
/// leaving a half-written file if the process crashes mid-write.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let tmp = path.with_extension(format!("{ext}.tmp"));
    if let Err(e) = std::fs::write(&tmp, bytes) {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::Io(format!("writing {}: {e}", tmp.display())));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        Error::Io(format!("renaming {} over {}: {e}", tmp.display(), path.display()))
    })
}

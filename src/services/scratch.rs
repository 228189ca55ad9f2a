// Scratch Artifact Service
// Temporary image files used to hand capture data to the external OCR
// process. Every request gets its own uniquely named file, and deletion is
// guaranteed on every exit path via Drop, so concurrent requests never
// collide on a shared fixed filename.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

pub struct ScratchImage {
    file: NamedTempFile,
}

impl ScratchImage {
    /// Write the image bytes to a fresh uniquely named temp file.
    pub fn create(bytes: &[u8]) -> Result<Self, String> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("screenguard_{}_", Uuid::new_v4()))
            .suffix(".png")
            .tempfile()
            .map_err(|e| format!("Failed to create scratch file: {}", e))?;

        file.write_all(bytes)
            .map_err(|e| format!("Failed to write scratch file: {}", e))?;
        file.flush()
            .map_err(|e| format!("Failed to flush scratch file: {}", e))?;

        debug!(path = %file.path().display(), "scratch image created");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

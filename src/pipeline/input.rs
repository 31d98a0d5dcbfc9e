//! Input resolution: validate user-supplied paths before pdfium sees them.
//!
//! ## Why check magic bytes?
//!
//! Upload folders collect JPEG photos of forms, Word exports and partially
//! synced files next to the PDFs. pdfium reports all of them as a generic
//! format error; reading the first four bytes (`%PDF`) up front lets the
//! batch log an accurate reason per file.
//!
//! In-memory uploads are written to a `TempDir` because pdfium opens by
//! path. The directory is removed when [`ResolvedInput`] is dropped.

use crate::error::IntakeError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A validated PDF path, possibly backed by a temporary copy.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input arrived as bytes and was spilled to a temp directory.
    /// The `TempDir` is kept alive until processing completes.
    Spilled { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Spilled { path, .. } => path,
        }
    }
}

/// Validate a local file: exists, readable, starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<ResolvedInput, IntakeError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(IntakeError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(IntakeError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(IntakeError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(IntakeError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Write an uploaded PDF to a temp file named `file_name`.
pub async fn spill_bytes(bytes: &[u8], file_name: &str) -> Result<ResolvedInput, IntakeError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(IntakeError::NotAPdf {
            path: PathBuf::from(file_name),
            magic,
        });
    }

    let temp_dir = TempDir::new().map_err(|e| IntakeError::Internal(e.to_string()))?;
    // Keep only the final component; upload names are not trusted as paths.
    let safe_name = Path::new(file_name)
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "upload.pdf".into());
    let path = temp_dir.path().join(safe_name);

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| IntakeError::OutputWriteFailed {
            path: path.clone(),
            source,
        })?;

    debug!("Spilled {} bytes to {}", bytes.len(), path.display());
    Ok(ResolvedInput::Spilled {
        path,
        _temp_dir: temp_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file() {
        let err = resolve_local(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, IntakeError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_non_pdf_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"\xFF\xD8\xFF\xE0 jpeg").unwrap();
        let err = resolve_local(f.path()).unwrap_err();
        match err {
            IntakeError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\xFF\xD8\xFF\xE0"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn accepts_pdf_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        let resolved = resolve_local(f.path()).unwrap();
        assert_eq!(resolved.path(), f.path());
    }

    #[tokio::test]
    async fn spilled_file_is_removed_on_drop() {
        let resolved = spill_bytes(b"%PDF-1.4 body", "../../form.pdf").await.unwrap();
        let path = resolved.path().to_path_buf();
        assert_eq!(path.file_name().unwrap(), "form.pdf");
        assert!(path.exists());
        drop(resolved);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn spill_rejects_non_pdf() {
        let err = spill_bytes(b"PK\x03\x04zip", "x.pdf").await.unwrap_err();
        assert!(matches!(err, IntakeError::NotAPdf { .. }));
    }
}

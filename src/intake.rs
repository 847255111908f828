use crate::error::MapError;
use std::path::{Path, PathBuf};

/// Reduce a client-supplied filename to a safe basename: drop any directory
/// components, then keep only ASCII alphanumerics, dots, dashes and
/// underscores. Names that sanitize to nothing (or to dots alone) are
/// rejected rather than guessed at.
pub fn sanitize_filename(raw: &str) -> Result<String, MapError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(MapError::BadUploadName(raw.to_string()));
    }
    Ok(cleaned)
}

/// Write the upload into the working directory, returning its path.
pub async fn store_upload(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, MapError> {
    let safe = sanitize_filename(filename)?;
    let path = dir.join(safe);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Best-effort removal of a consumed upload.
pub async fn discard_upload(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::warn!("failed to remove upload {:?}: {}", path, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(sanitize_filename("data.csv").unwrap(), "data.csv");
        assert_eq!(sanitize_filename("my-points_2.csv").unwrap(), "my-points_2.csv");
    }

    #[test]
    fn directory_components_are_dropped() {
        assert_eq!(sanitize_filename("/etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini").unwrap(), "boot.ini");
        assert_eq!(sanitize_filename("a/b/../c.csv").unwrap(), "c.csv");
    }

    #[test]
    fn hostile_or_empty_names_are_rejected() {
        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("../..").is_err());
        assert!(sanitize_filename("???").is_err());
    }

    #[tokio::test]
    async fn store_and_discard_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_upload(dir.path(), "points.csv", b"a,b\n1,2\n")
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), "points.csv");
        discard_upload(&path).await;
        assert!(!path.exists());
    }
}

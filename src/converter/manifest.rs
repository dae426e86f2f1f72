//! JSON manifest of every emitted file.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{ConvertError, ConvertResult};

/// One written file and the snapshot it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Output path relative to the output root, `/`-separated
    pub path: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub status: u16,
    pub captured_at: DateTime<Utc>,
    /// `content` or `redirect`
    pub kind: String,
    pub links_rewritten: usize,
}

/// Write the manifest atomically, entries sorted by output path ignoring
/// case (the order of the path index).
///
/// # Errors
///
/// Fails if the file cannot be serialized, written or renamed into place.
pub async fn save(path: &Path, entries: &mut [ManifestEntry]) -> ConvertResult<()> {
    entries.sort_by_cached_key(|entry| (entry.path.to_lowercase(), entry.path.clone()));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ConvertError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(&entries).map_err(|source| ConvertError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;

    // Temp file + rename
    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| ConvertError::io(&temp_path, e))?;
    file.write_all(json.as_bytes())
        .await
        .map_err(|e| ConvertError::io(&temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| ConvertError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| ConvertError::io(path, e))?;

    log::debug!("Wrote manifest with {} entries to {}", entries.len(), path.display());
    Ok(())
}

/// Read a manifest written by [`save`].
///
/// # Errors
///
/// Fails if the file is missing or is not a manifest.
pub async fn load(path: &Path) -> ConvertResult<Vec<ManifestEntry>> {
    let json = fs::read_to_string(path)
        .await
        .map_err(|e| ConvertError::io(path, e))?;
    serde_json::from_str(&json).map_err(|source| ConvertError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    fn entry(path: &str) -> ManifestEntry {
        ManifestEntry {
            path: path.to_string(),
            url: format!("http://{path}"),
            content_type: "text/html".to_string(),
            status: 200,
            captured_at: Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap(),
            kind: "content".to_string(),
            links_rewritten: 0,
        }
    }

    #[tokio::test]
    async fn test_save_sorts_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("manifest.json");
        let mut entries = vec![entry("ex.org/b.html"), entry("ex.org/a.html")];

        save(&path, &mut entries).await.unwrap();
        let loaded = load(&path).await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].path, "ex.org/a.html");
        assert!(!path.with_extension("json.tmp").exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"type\": \"text/html\""));
        assert!(raw.contains("\"captured_at\": \"2020-01-02T03:04:05Z\""));
    }

    #[tokio::test]
    async fn test_sort_ignores_case() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        let mut entries = vec![entry("ex.org/b.html"), entry("ex.org/Zeta.html"), entry("ex.org/A.html")];

        save(&path, &mut entries).await.unwrap();
        let paths: Vec<String> = load(&path).await.unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, ["ex.org/A.html", "ex.org/b.html", "ex.org/Zeta.html"]);
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(load(&path).await, Err(ConvertError::Manifest { .. })));
    }
}

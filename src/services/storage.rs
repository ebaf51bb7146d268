use chrono::Utc;
use std::path::PathBuf;

use crate::models::job::JobType;

/// Local image store laid out as `{date}/{job_type}/stationNN_HHMMSS.{ext}`.
#[derive(Clone)]
pub struct ImageStore {
    base_dir: PathBuf,
}

impl ImageStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Persist image bytes and return the path relative to the store root,
    /// which is what gets recorded on the result row.
    pub async fn save(
        &self,
        image: &[u8],
        job_type: JobType,
        station_id: i64,
    ) -> Result<String, StorageError> {
        let now = Utc::now();
        let date = now.format("%Y-%m-%d").to_string();

        let dir = self.base_dir.join(&date).join(job_type.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let extension = image::guess_format(image)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("jpg");
        let filename = format!(
            "station{:02}_{}.{}",
            station_id,
            now.format("%H%M%S"),
            extension
        );

        tokio::fs::write(dir.join(&filename), image).await?;

        Ok(format!("{date}/{job_type}/{filename}"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("image write failed: {0}")]
    Io(#[from] std::io::Error),
}

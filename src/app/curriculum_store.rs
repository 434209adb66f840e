use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::app::model::StoredCurriculum;

#[async_trait]
pub trait CurriculumStore: Send + Sync {
    async fn put(&self, record: &StoredCurriculum) -> anyhow::Result<()>;
    async fn get(&self, curriculum_id: Uuid) -> anyhow::Result<Option<StoredCurriculum>>;
}

#[derive(Debug, Clone)]
pub struct LocalFsCurriculumStore {
    base_dir: PathBuf,
}

impl LocalFsCurriculumStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn curricula_dir(&self) -> PathBuf {
        self.base_dir.join("curricula")
    }

    fn record_path(&self, curriculum_id: Uuid) -> PathBuf {
        self.curricula_dir()
            .join(format!("{}.json", curriculum_id.hyphenated()))
    }
}

#[async_trait]
impl CurriculumStore for LocalFsCurriculumStore {
    async fn put(&self, record: &StoredCurriculum) -> anyhow::Result<()> {
        let path = self.record_path(record.curriculum_id);
        write_json_atomic(&path, record)
            .await
            .with_context(|| format!("write curriculum: {}", path.display()))
    }

    async fn get(&self, curriculum_id: Uuid) -> anyhow::Result<Option<StoredCurriculum>> {
        let path = self.record_path(curriculum_id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

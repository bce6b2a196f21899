//! Artifact name resolution and reuse detection.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mysql_dump::{Environment, DUMP_EXTENSION};
use std::path::{Path, PathBuf};

use crate::ArtifactLayout;

/// One dump artifact and where it lives on each host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifact {
    /// File name, e.g. `shop-20240101120000.sql.bz2`
    pub name: String,
    /// Environment that dumps it.
    pub producer: Environment,
    pub local_path: PathBuf,
    pub remote_path: PathBuf,
}

/// `<database>-<YYYYMMDDHHmmss>.sql.bz2` for the given UTC instant.
pub fn artifact_name(database: &str, now: DateTime<Utc>) -> String {
    format!(
        "{database}-{}.{DUMP_EXTENSION}",
        now.format("%Y%m%d%H%M%S")
    )
}

/// Find a dump artifact already present in `dir`.
///
/// When several match, the greatest file name wins; for names produced by
/// [`artifact_name`] that is the most recent dump. A missing directory
/// yields `None`.
pub async fn find_existing(dir: &Path) -> Result<Option<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read directory: {}", dir.display()))
        }
    };

    let suffix = format!(".{DUMP_EXTENSION}");
    let mut latest: Option<String> = None;
    let mut matches = 0;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry
            .metadata()
            .await
            .with_context(|| format!("Failed to get metadata for: {}", entry.path().display()))?;
        if !metadata.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(&suffix) {
            continue;
        }
        matches += 1;
        if latest.as_ref().map_or(true, |current| name > *current) {
            latest = Some(name);
        }
    }

    if matches > 1 {
        tracing::warn!(
            "Found {} dump artifacts in {}, using {:?}",
            matches,
            dir.display(),
            latest
        );
    }

    Ok(latest)
}

/// Resolves artifact names and paths against an [`ArtifactLayout`].
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    layout: ArtifactLayout,
}

impl ArtifactResolver {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Name for the next dump of `database`.
    ///
    /// A dump left in the local workspace's `local` subdirectory (for
    /// instance by an interrupted push) is picked up again by name;
    /// otherwise a fresh timestamped name is generated.
    pub async fn dump_file(&self, database: &str) -> Result<String> {
        self.dump_file_at(database, Utc::now()).await
    }

    pub async fn dump_file_at(&self, database: &str, now: DateTime<Utc>) -> Result<String> {
        let dir = self.layout.local_producer_dir(Environment::Local);
        match find_existing(&dir).await? {
            Some(name) => {
                tracing::info!("Reusing existing dump name {}", name);
                Ok(name)
            }
            None => Ok(artifact_name(database, now)),
        }
    }

    /// Resolve the artifact `producer` will dump from `database`.
    pub async fn resolve(&self, producer: Environment, database: &str) -> Result<DumpArtifact> {
        let name = self.dump_file(database).await?;
        Ok(self.artifact(producer, name))
    }

    /// Place a known artifact name in the layout.
    pub fn artifact(&self, producer: Environment, name: String) -> DumpArtifact {
        DumpArtifact {
            local_path: self.layout.local_dump_file(producer, &name),
            remote_path: self.layout.remote_dump_file(producer, &name),
            producer,
            name,
        }
    }

    /// Whether `artifact` is already present in the local workspace.
    pub async fn exists_locally(&self, artifact: &DumpArtifact) -> Result<bool> {
        tokio::fs::try_exists(&artifact.local_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to check for existing dump: {}",
                    artifact.local_path.display()
                )
            })
    }
}

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use grimoire_common::Blob;
use tracing::warn;

use crate::error::Result;
use crate::scribe::{BlobStore, BlobWriteResponse};

/// Blob store rooted at a local directory: `<root>/<container>/<name>`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob's path, refusing names that would escape the container.
    fn resolve(&self, blob: &Blob) -> Option<PathBuf> {
        let name = Path::new(&blob.name);
        let safe = !blob.name.is_empty()
            && name
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(blob.container.as_str()).join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write_blob(&self, blob: &Blob) -> Result<BlobWriteResponse> {
        let Some(path) = self.resolve(blob) else {
            warn!(container = %blob.container, name = %blob.name, "Refusing unsafe blob name");
            return Ok(BlobWriteResponse::refused());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never observe a half-written file.
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, &blob.bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(BlobWriteResponse::stored(path.display().to_string()))
    }
}

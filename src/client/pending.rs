use super::ClientError;
use super::multipart::MultipartOrchestrator;
use crate::models::{MediaKind, MultipartSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;
use uuid::Uuid;

/// A local preview reference held while a file is staged.
///
/// Previews are counted in the owning collection's ledger and released when
/// the handle drops, so every removal path releases exactly once.
#[derive(Debug)]
pub struct PreviewHandle {
    live: Arc<AtomicUsize>,
}

impl PreviewHandle {
    fn acquire(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self { live: live.clone() }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct PendingUpload {
    pub id: String,
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: String,
    pub kind: MediaKind,
    pub size: u64,
    _preview: PreviewHandle,
}

/// Files staged for upload, in selection order.
#[derive(Debug, Default)]
pub struct PendingUploads {
    items: Vec<PendingUpload>,
    live_previews: Arc<AtomicUsize>,
}

impl PendingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a file. Files whose declared type is not `image/*` or `video/*`
    /// are refused and nothing is staged for them.
    pub async fn stage(
        &mut self,
        path: impl AsRef<Path>,
        content_type: &str,
    ) -> Result<&PendingUpload, ClientError> {
        let path = path.as_ref();
        let kind = MediaKind::from_content_type(content_type).ok_or_else(|| {
            ClientError::Rejected {
                path: path.display().to_string(),
                content_type: content_type.to_string(),
            }
        })?;

        let metadata = tokio::fs::metadata(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        self.items.push(PendingUpload {
            id: Uuid::new_v4().to_string(),
            path: path.to_path_buf(),
            file_name,
            content_type: content_type.to_string(),
            kind,
            size: metadata.len(),
            _preview: PreviewHandle::acquire(&self.live_previews),
        });

        Ok(&self.items[self.items.len() - 1])
    }

    /// Drop one staged file. Returns whether it was staged.
    pub fn discard(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingUpload> {
        self.items.iter()
    }

    /// Previews not yet released.
    pub fn live_previews(&self) -> usize {
        self.live_previews.load(Ordering::SeqCst)
    }

    /// Upload every staged file, one at a time.
    ///
    /// Each file leaves the collection as soon as its upload completes. The
    /// first failure stops the loop; files already uploaded stay uploaded and
    /// the failed file and the rest remain staged.
    pub async fn submit(
        &mut self,
        orchestrator: &MultipartOrchestrator<'_>,
    ) -> Result<Vec<MultipartSession>, ClientError> {
        let mut sessions = Vec::with_capacity(self.items.len());

        while let Some(item) = self.items.first() {
            let file = tokio::fs::File::open(&item.path).await?;
            let session = orchestrator
                .upload(&item.file_name, &item.content_type, file)
                .await?;

            let done = self.items.remove(0);
            info!(key = %session.key, file = %done.file_name, size = done.size, "Uploaded staged file");
            sessions.push(session);
        }

        Ok(sessions)
    }
}

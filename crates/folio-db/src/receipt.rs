//! # Receipt Sinks
//!
//! Where a rendered receipt ends up. The coordinator calls the sink only
//! after a sale has committed; a sink failure never undoes the sale.
//!
//! ```text
//! SaleCoordinator ──Receipt──► dyn ReceiptSink
//!                                 ├── FileReceiptSink    receipts/receipt_12_20261016_140311.txt
//!                                 └── MemoryReceiptSink  Vec<String> (tests, previews)
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use folio_core::Receipt;

/// Where a rendered receipt was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptHandle {
    /// Written to this file.
    File(PathBuf),
    /// Kept in memory at this index.
    Memory(usize),
}

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Receipt I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Receipt rejected: {0}")]
    Rejected(String),
}

/// Destination for rendered receipts.
#[async_trait]
pub trait ReceiptSink: Send + Sync {
    async fn render(&self, receipt: &Receipt) -> Result<ReceiptHandle, ReceiptError>;
}

// =============================================================================
// File Sink
// =============================================================================

/// Writes one text file per receipt into a directory.
#[derive(Debug, Clone)]
pub struct FileReceiptSink {
    dir: PathBuf,
}

impl FileReceiptSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileReceiptSink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `receipt_<sale id>_<yyyymmdd_hhmmss>.txt`
    pub fn file_name(receipt: &Receipt) -> String {
        format!(
            "receipt_{}_{}.txt",
            receipt.sale_id,
            receipt.timestamp.format("%Y%m%d_%H%M%S")
        )
    }
}

#[async_trait]
impl ReceiptSink for FileReceiptSink {
    async fn render(&self, receipt: &Receipt) -> Result<ReceiptHandle, ReceiptError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(Self::file_name(receipt));
        tokio::fs::write(&path, receipt.render_text()).await?;

        debug!(sale_id = receipt.sale_id, path = %path.display(), "Receipt written");
        Ok(ReceiptHandle::File(path))
    }
}

// =============================================================================
// Memory Sink
// =============================================================================

/// Keeps rendered receipts in memory.
#[derive(Debug, Default)]
pub struct MemoryReceiptSink {
    rendered: Mutex<Vec<String>>,
}

impl MemoryReceiptSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every receipt rendered so far, oldest first.
    pub async fn rendered(&self) -> Vec<String> {
        self.rendered.lock().await.clone()
    }

    pub async fn last(&self) -> Option<String> {
        self.rendered.lock().await.last().cloned()
    }
}

#[async_trait]
impl ReceiptSink for MemoryReceiptSink {
    async fn render(&self, receipt: &Receipt) -> Result<ReceiptHandle, ReceiptError> {
        let mut rendered = self.rendered.lock().await;
        rendered.push(receipt.render_text());
        Ok(ReceiptHandle::Memory(rendered.len() - 1))
    }
}

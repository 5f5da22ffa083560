use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatalogStore, Rescore};
use crate::error::{AppError, Result};
use crate::models::Tool;

/// Process-local catalog kept in insertion order
///
/// Used by tests and local runs. `save_all` applies every update under one
/// write lock, so a batch commit is all-or-nothing.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    tools: RwLock<Vec<Tool>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(tools: Vec<Tool>) -> Self {
        Self {
            tools: RwLock::new(tools),
            ..Self::default()
        }
    }

    /// Make every subsequent read fail with `StoreUnavailable`
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with `Persistence`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(
                "in-memory catalog read disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(
                "in-memory catalog write disabled".to_string(),
            ));
        }
        Ok(())
    }
}

fn apply_score(row: &mut Tool, update: &Tool) {
    row.trending_score = update.trending_score;
    row.last_updated = update.last_updated;
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_all(&self) -> Result<Vec<Tool>> {
        self.check_read()?;
        Ok(self.tools.read().await.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Tool>> {
        self.check_read()?;
        Ok(self.tools.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn save_all(&self, tools: &[Tool]) -> Result<()> {
        self.check_write()?;
        let mut rows = self.tools.write().await;

        // Tools deleted since the cycle read the catalog are skipped
        for update in tools {
            if let Some(row) = rows.iter_mut().find(|t| t.id == update.id) {
                apply_score(row, update);
            }
        }

        Ok(())
    }

    async fn save(&self, tool: &Tool) -> Result<()> {
        self.check_write()?;
        let mut rows = self.tools.write().await;

        match rows.iter_mut().find(|t| t.id == tool.id) {
            Some(row) => {
                apply_score(row, tool);
                Ok(())
            }
            None => Err(AppError::NotFound(tool.id.to_string())),
        }
    }

    async fn record_view(&self, id: Uuid, rescore: Rescore) -> Result<Option<Tool>> {
        self.check_write()?;
        let mut rows = self.tools.write().await;

        let Some(row) = rows.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        let mut updated = row.clone();
        updated.views += 1;
        rescore(&mut updated);

        row.views = updated.views;
        apply_score(row, &updated);
        Ok(Some(row.clone()))
    }
}

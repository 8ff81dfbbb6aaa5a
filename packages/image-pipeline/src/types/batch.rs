//! Per-URL progress through a multi-URL extraction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUrlState {
    pub url: String,
    pub status: BatchStatus,
    pub image_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchUrlState {
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: BatchStatus::Pending,
            image_count: 0,
            error: None,
        }
    }

    pub fn mark_processing(&mut self) {
        self.status = BatchStatus::Processing;
    }

    pub fn mark_completed(&mut self, image_count: usize) {
        self.status = BatchStatus::Completed;
        self.image_count = image_count;
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = BatchStatus::Failed;
        self.image_count = 0;
        self.error = Some(error.into());
    }

    /// Completed or failed.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, BatchStatus::Completed | BatchStatus::Failed)
    }
}

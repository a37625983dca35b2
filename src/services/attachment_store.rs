//! Attachment lookup keyed by step record.
//!
//! The tracker never stores binary content. It only asks the attachment store for
//! the descriptors it holds for a record; limits on attachment count or size are
//! the store's business.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::AttachmentDescriptor;
use crate::state_machine::errors::PersistenceResult;

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Descriptors for one step record, oldest upload first
    async fn attachments_for(
        &self,
        step_record_uuid: Uuid,
    ) -> PersistenceResult<Vec<AttachmentDescriptor>>;
}

/// In-process descriptor index
#[derive(Debug, Default)]
pub struct InMemoryAttachmentStore {
    by_record: DashMap<Uuid, Vec<AttachmentDescriptor>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a descriptor for an uploaded file
    pub fn attach(
        &self,
        step_record_uuid: Uuid,
        name: impl Into<String>,
        size_bytes: u64,
        content_type: impl Into<String>,
    ) -> AttachmentDescriptor {
        let descriptor = AttachmentDescriptor {
            attachment_uuid: Uuid::new_v4(),
            step_record_uuid,
            name: name.into(),
            size_bytes,
            content_type: content_type.into(),
            uploaded_at: Utc::now(),
        };
        self.by_record
            .entry(step_record_uuid)
            .or_default()
            .push(descriptor.clone());
        descriptor
    }

    pub fn detach(&self, step_record_uuid: Uuid, attachment_uuid: Uuid) -> bool {
        self.by_record
            .get_mut(&step_record_uuid)
            .map(|mut descriptors| {
                let before = descriptors.len();
                descriptors.retain(|d| d.attachment_uuid != attachment_uuid);
                descriptors.len() != before
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn attachments_for(
        &self,
        step_record_uuid: Uuid,
    ) -> PersistenceResult<Vec<AttachmentDescriptor>> {
        let mut descriptors = self
            .by_record
            .get(&step_record_uuid)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        descriptors.sort_by_key(|d| d.uploaded_at);
        Ok(descriptors)
    }
}

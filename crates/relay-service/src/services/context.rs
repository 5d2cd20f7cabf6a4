//! Service context - dependency container for services
//!
//! Holds the staging store, the archive and the membership resolver, plus the
//! timing settings that govern when a staged message becomes archivable.

use std::sync::Arc;
use std::time::Duration;

use relay_common::MessagingConfig;
use relay_core::{MembershipResolver, MessageArchive, StagingStore};

use super::error::ServiceError;

/// Default age after which a staged message is eligible for archival
pub const DEFAULT_ARCHIVE_AFTER: Duration = Duration::from_secs(180);

/// Service context containing all dependencies
///
/// Cheap to clone; every store sits behind an `Arc`.
#[derive(Clone)]
pub struct ServiceContext {
    staging: Arc<dyn StagingStore>,
    archive: Arc<dyn MessageArchive>,
    membership: Arc<dyn MembershipResolver>,
    archive_after: Duration,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        staging: Arc<dyn StagingStore>,
        archive: Arc<dyn MessageArchive>,
        membership: Arc<dyn MembershipResolver>,
        archive_after: Duration,
    ) -> Self {
        Self {
            staging,
            archive,
            membership,
            archive_after,
        }
    }

    /// Start building a context
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    /// Get the staging store
    pub fn staging(&self) -> &dyn StagingStore {
        self.staging.as_ref()
    }

    /// Get the archival store
    pub fn archive(&self) -> &dyn MessageArchive {
        self.archive.as_ref()
    }

    /// Get the membership resolver
    pub fn membership(&self) -> &dyn MembershipResolver {
        self.membership.as_ref()
    }

    /// Shared handle to the membership resolver, for components that outlive a borrow
    pub fn membership_handle(&self) -> Arc<dyn MembershipResolver> {
        Arc::clone(&self.membership)
    }

    /// Minimum age before a staged message is moved to the archive
    pub fn archive_after(&self) -> Duration {
        self.archive_after
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("archive_after", &self.archive_after)
            .finish_non_exhaustive()
    }
}

/// Builder for `ServiceContext`
#[derive(Default)]
pub struct ServiceContextBuilder {
    staging: Option<Arc<dyn StagingStore>>,
    archive: Option<Arc<dyn MessageArchive>>,
    membership: Option<Arc<dyn MembershipResolver>>,
    archive_after: Option<Duration>,
}

impl ServiceContextBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staging store
    #[must_use]
    pub fn staging(mut self, store: Arc<dyn StagingStore>) -> Self {
        self.staging = Some(store);
        self
    }

    /// Set the archival store
    #[must_use]
    pub fn archive(mut self, archive: Arc<dyn MessageArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Set the membership resolver
    #[must_use]
    pub fn membership(mut self, resolver: Arc<dyn MembershipResolver>) -> Self {
        self.membership = Some(resolver);
        self
    }

    /// Set the archival threshold
    #[must_use]
    pub fn archive_after(mut self, threshold: Duration) -> Self {
        self.archive_after = Some(threshold);
        self
    }

    /// Take the archival threshold from messaging config
    #[must_use]
    pub fn messaging_config(self, config: &MessagingConfig) -> Self {
        self.archive_after(config.archive_after())
    }

    /// Build the service context
    ///
    /// # Errors
    /// Returns an error if a store is missing
    pub fn build(self) -> Result<ServiceContext, ServiceError> {
        Ok(ServiceContext {
            staging: self
                .staging
                .ok_or_else(|| ServiceError::validation("staging store is required"))?,
            archive: self
                .archive
                .ok_or_else(|| ServiceError::validation("archive is required"))?,
            membership: self
                .membership
                .ok_or_else(|| ServiceError::validation("membership resolver is required"))?,
            archive_after: self.archive_after.unwrap_or(DEFAULT_ARCHIVE_AFTER),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryArchive, MemoryStagingStore, StaticMembership};

    #[test]
    fn test_builder_requires_stores() {
        let err = ServiceContext::builder()
            .staging(Arc::new(MemoryStagingStore::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("archive is required"));
    }

    #[test]
    fn test_builder_defaults_threshold() {
        let ctx = ServiceContext::builder()
            .staging(Arc::new(MemoryStagingStore::new()))
            .archive(Arc::new(MemoryArchive::new()))
            .membership(Arc::new(StaticMembership::new()))
            .build()
            .unwrap();
        assert_eq!(ctx.archive_after(), DEFAULT_ARCHIVE_AFTER);
    }

    #[test]
    fn test_builder_reads_messaging_config() {
        let config = MessagingConfig {
            archive_after_secs: 30,
            ..MessagingConfig::default()
        };
        let ctx = ServiceContext::builder()
            .staging(Arc::new(MemoryStagingStore::new()))
            .archive(Arc::new(MemoryArchive::new()))
            .membership(Arc::new(StaticMembership::new()))
            .messaging_config(&config)
            .build()
            .unwrap();
        assert_eq!(ctx.archive_after(), Duration::from_secs(30));
    }
}

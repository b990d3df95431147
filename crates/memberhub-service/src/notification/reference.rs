//! Resolution of notification references into client links.
//!
//! The resolver holds one [`ReferenceFetcher`] per [`ReferenceKind`].
//! Kinds without a registered fetcher resolve to `None`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use memberhub_core::result::AppResult;
use memberhub_entity::notification::{NotificationReference, ReferenceKind};

/// A reference with the link the client should open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReference {
    /// Referenced record kind.
    pub kind: ReferenceKind,
    /// Referenced record id.
    pub id: Uuid,
    /// Portal-relative URL.
    pub url: String,
}

/// Resolves references of one kind.
#[async_trait]
pub trait ReferenceFetcher: Send + Sync + 'static {
    /// Resolve `reference`, or `None` if the target no longer exists.
    async fn fetch(&self, reference: &NotificationReference) -> AppResult<Option<ResolvedReference>>;
}

/// Builds a link by substituting `{id}` in a path template.
#[derive(Debug, Clone)]
pub struct PathTemplateFetcher {
    template: String,
}

impl PathTemplateFetcher {
    /// Create a fetcher for `template`, e.g. `"/forum/threads/{id}"`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait]
impl ReferenceFetcher for PathTemplateFetcher {
    async fn fetch(&self, reference: &NotificationReference) -> AppResult<Option<ResolvedReference>> {
        Ok(Some(ResolvedReference {
            kind: reference.kind(),
            id: reference.id(),
            url: self.template.replace("{id}", &reference.id().to_string()),
        }))
    }
}

/// Lookup table from reference kind to fetcher.
#[derive(Clone, Default)]
pub struct ReferenceResolver {
    fetchers: HashMap<ReferenceKind, Arc<dyn ReferenceFetcher>>,
}

impl std::fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("kinds", &self.fetchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ReferenceResolver {
    /// A resolver with no fetchers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A resolver mapping every kind to its portal path.
    pub fn with_defaults() -> Self {
        let mut resolver = Self::empty();
        for kind in ReferenceKind::ALL {
            let template = match kind {
                ReferenceKind::Message => "/messages/by-id/{id}",
                ReferenceKind::Conversation => "/messages/{id}",
                ReferenceKind::Brag => "/brags/{id}",
                ReferenceKind::ForumThread => "/forum/threads/{id}",
                ReferenceKind::ForumReply => "/forum/replies/{id}",
                ReferenceKind::Equipment => "/equipment/{id}",
                ReferenceKind::LibraryItem => "/library/{id}",
            };
            resolver.register(kind, Arc::new(PathTemplateFetcher::new(template)));
        }
        resolver
    }

    /// Register or replace the fetcher for `kind`.
    pub fn register(&mut self, kind: ReferenceKind, fetcher: Arc<dyn ReferenceFetcher>) {
        self.fetchers.insert(kind, fetcher);
    }

    /// Resolve `reference`. Lookup failures are logged and yield `None`.
    pub async fn resolve(&self, reference: &NotificationReference) -> Option<ResolvedReference> {
        let fetcher = self.fetchers.get(&reference.kind())?;
        match fetcher.fetch(reference).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(kind = %reference.kind(), id = %reference.id(), error = %e, "Reference lookup failed");
                None
            }
        }
    }
}

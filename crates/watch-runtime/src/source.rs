//! Change feed sources.
//!
//! [`EventSource`] is the seam between the reconciliation loops and the
//! cluster. [`KubeEventSource`] is the production implementation on top of
//! `kube::Api::watch`; tests use [`crate::ScriptedSource`].

use crate::error::WatchError;
use crate::event::{Selectors, WatchEvent};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use kube::api::{Api, WatchParams};
use kube::core::WatchEvent as KubeWatchEvent;
use kube::Resource;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Ordered feed of decoded events for one resource collection.
pub type EventStream<K> = BoxStream<'static, Result<WatchEvent<K>, WatchError>>;

/// A watchable resource collection.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Kind yielded by the feed
    type Resource: Send + 'static;

    /// Resource kind, for logs and metric labels
    fn kind(&self) -> &str;

    /// Opens a change feed starting after `from_version` ("0" replays from
    /// the beginning of what the server retains).
    async fn watch(
        &self,
        selectors: &Selectors,
        from_version: &str,
    ) -> Result<EventStream<Self::Resource>, WatchError>;
}

#[async_trait]
impl<S> EventSource for Arc<S>
where
    S: EventSource + ?Sized,
{
    type Resource = S::Resource;

    fn kind(&self) -> &str {
        (**self).kind()
    }

    async fn watch(
        &self,
        selectors: &Selectors,
        from_version: &str,
    ) -> Result<EventStream<Self::Resource>, WatchError> {
        (**self).watch(selectors, from_version).await
    }
}

/// Watches a Kubernetes collection through the API server.
pub struct KubeEventSource<K> {
    api: Api<K>,
    kind: String,
}

impl<K> KubeEventSource<K>
where
    K: Resource<DynamicType = ()>,
{
    /// Creates a source for the collection behind `api`.
    pub fn new(api: Api<K>) -> Self {
        Self {
            api,
            kind: K::kind(&()).into_owned(),
        }
    }
}

impl<K> Debug for KubeEventSource<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventSource").field("kind", &self.kind).finish()
    }
}

#[async_trait]
impl<K> EventSource for KubeEventSource<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    type Resource = K;

    fn kind(&self) -> &str {
        &self.kind
    }

    async fn watch(
        &self,
        selectors: &Selectors,
        from_version: &str,
    ) -> Result<EventStream<K>, WatchError> {
        let mut params = WatchParams::default();
        if let Some(labels) = &selectors.labels {
            params = params.labels(labels);
        }
        if let Some(fields) = &selectors.fields {
            params = params.fields(fields);
        }

        debug!("Opening {} watch from version {}", self.kind, from_version);
        let stream = self.api.watch(&params, from_version).await?;

        Ok(stream
            .filter_map(|item| async move {
                match item {
                    Ok(KubeWatchEvent::Added(obj)) => Some(Ok(WatchEvent::Added(obj))),
                    Ok(KubeWatchEvent::Modified(obj)) => Some(Ok(WatchEvent::Modified(obj))),
                    Ok(KubeWatchEvent::Deleted(obj)) => Some(Ok(WatchEvent::Deleted(obj))),
                    Ok(KubeWatchEvent::Bookmark(_)) => None,
                    Ok(KubeWatchEvent::Error(status)) => Some(Ok(WatchEvent::Error {
                        code: status.code,
                        message: status.message.clone(),
                    })),
                    Err(kube::Error::SerdeError(e)) => Some(Err(WatchError::Decode(e.to_string()))),
                    Err(e) => Some(Err(WatchError::Stream(e.to_string()))),
                }
            })
            .boxed())
    }
}

//! Scripted change feeds for unit tests.

use crate::error::WatchError;
use crate::event::{Selectors, WatchEvent};
use crate::source::{EventSource, EventStream};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

type ScriptedFeed<K> = Result<Vec<Result<WatchEvent<K>, WatchError>>, WatchError>;

/// An [`EventSource`] that replays pre-recorded feeds, one per `watch` call.
///
/// Once the script is exhausted every further open fails.
#[derive(Debug)]
pub struct ScriptedSource<K> {
    kind: String,
    feeds: Mutex<VecDeque<ScriptedFeed<K>>>,
    opened_from: Mutex<Vec<String>>,
}

impl<K> ScriptedSource<K> {
    /// Creates an empty script for `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            feeds: Mutex::new(VecDeque::new()),
            opened_from: Mutex::new(Vec::new()),
        }
    }

    /// Queues a feed that opens and yields `items`, then closes.
    pub fn push_feed(&self, items: Vec<Result<WatchEvent<K>, WatchError>>) -> &Self {
        self.feeds.lock().unwrap().push_back(Ok(items));
        self
    }

    /// Queues a failed open.
    pub fn push_open_failure(&self, message: &str) -> &Self {
        self.feeds
            .lock()
            .unwrap()
            .push_back(Err(WatchError::Open(message.to_string())));
        self
    }

    /// Versions passed to each `watch` call, in order.
    pub fn opened_from(&self) -> Vec<String> {
        self.opened_from.lock().unwrap().clone()
    }
}

#[async_trait]
impl<K> EventSource for ScriptedSource<K>
where
    K: Send + 'static,
{
    type Resource = K;

    fn kind(&self) -> &str {
        &self.kind
    }

    async fn watch(
        &self,
        _selectors: &Selectors,
        from_version: &str,
    ) -> Result<EventStream<K>, WatchError> {
        self.opened_from.lock().unwrap().push(from_version.to_string());
        let next = self.feeds.lock().unwrap().pop_front();
        match next {
            Some(Ok(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(Err(e)) => Err(e),
            None => Err(WatchError::Open("script exhausted".to_string())),
        }
    }
}

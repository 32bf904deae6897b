use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify::Classifier;
use crate::errors::BoxError;
use crate::sweep::errors::SweepError;
use crate::sweep::task::SweepTask;

pub type ListFn =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<Vec<SweepTask>, BoxError>> + Send + Sync>;

pub type SkipPredicate = Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

/// One resource type's registration.
#[derive(Clone)]
pub struct SweeperNode {
    name: String,
    dependencies: BTreeSet<String>,
    list: ListFn,
}

impl SweeperNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sweepers that must finish before this one starts.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub async fn list(&self, cancel: CancellationToken) -> Result<Vec<SweepTask>, BoxError> {
        (self.list)(cancel).await
    }
}

impl fmt::Debug for SweeperNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweeperNode")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// All sweepers known to a process, keyed by name.
///
/// Populated once at startup and passed to [`crate::sweep::run`]; a run only
/// reads it.
#[derive(Clone, Default)]
pub struct SweeperRegistry {
    sweepers: BTreeMap<String, SweeperNode>,
    skip: Option<SkipPredicate>,
    classifier: Classifier,
}

impl SweeperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sweeper.
    ///
    /// `dependencies` name sweepers that must complete before this one runs,
    /// e.g. a policy sweeper depends on the policy-attachment sweeper. They
    /// may be registered later; unknown names are reported when a run is planned.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::DuplicateSweeper`] if `name` is already registered.
    pub fn register<I, S, F, Fut, E>(
        &mut self,
        name: impl Into<String>,
        dependencies: I,
        list: F,
    ) -> Result<(), SweepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<SweepTask>, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let name = name.into();
        if self.sweepers.contains_key(&name) {
            return Err(SweepError::DuplicateSweeper { name });
        }

        let dependencies: BTreeSet<String> = dependencies.into_iter().map(Into::into).collect();
        debug!(
            event = "core.sweep.sweeper_registered",
            sweeper = name,
            dependencies = ?dependencies
        );

        let list: ListFn = Arc::new(move |cancel| {
            let fut = list(cancel);
            async move { fut.await.map_err(Into::<BoxError>::into) }.boxed()
        });

        self.sweepers.insert(
            name.clone(),
            SweeperNode {
                name,
                dependencies,
                list,
            },
        );
        Ok(())
    }

    /// Listing errors matching `predicate` mark the sweeper as skipped
    /// instead of failed, e.g. a resource type the account or region does
    /// not support.
    pub fn skip_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(predicate));
        self
    }

    /// Classifier used to recognize "already deleted" errors from delete calls.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn should_skip(&self, err: &(dyn Error + 'static)) -> bool {
        self.skip.as_ref().is_some_and(|predicate| predicate(err))
    }

    pub fn get(&self, name: &str) -> Option<&SweeperNode> {
        self.sweepers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sweepers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sweepers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sweepers.is_empty()
    }

    /// Name to declared dependencies, for planning.
    pub fn dependency_graph(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.sweepers
            .iter()
            .map(|(name, node)| (name.clone(), node.dependencies.clone()))
            .collect()
    }
}

impl fmt::Debug for SweeperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweeperRegistry")
            .field("sweepers", &self.sweepers.values().collect::<Vec<_>>())
            .field("skip", &self.skip.is_some())
            .finish()
    }
}

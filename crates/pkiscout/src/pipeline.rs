//! Scan pipeline: one walker feeding a bounded pool of reader tasks that
//! share a single output channel.
//!
//! ```text
//! walker (blocking thread) ──paths──▶ driver ──spawn──▶ reader task ─┐
//!                                       │                reader task ─┼─▶ resources
//!                                   semaphore            reader task ─┘
//! ```
//!
//! The driver owns the original sender. It joins every reader task before
//! dropping it, so the resource stream closes once, after all producers are
//! done.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use pkiscout_core::{Resource, Result, ScanError, ScanOutcome};

use crate::cancel::Cancellation;
use crate::format::FormatRegistry;
use crate::reader::ResourceReader;
use crate::walker::{PathWalker, WalkOptions};

/// Default number of concurrent reader tasks
pub const DEFAULT_WORKERS: usize = 16;

/// Paths buffered between the walker and the driver
const PATH_QUEUE: usize = 64;

/// Resources buffered between the readers and the consumer
const RESOURCE_BUFFER: usize = 64;

/// Scan configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// How to walk the roots
    pub walk: WalkOptions,
    /// Encoding-type tags to keep (all when `None`)
    pub type_filter: Option<BTreeSet<String>>,
    /// Maximum concurrent reader tasks
    pub worker_count: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            walk: WalkOptions::default(),
            type_filter: None,
            worker_count: DEFAULT_WORKERS,
        }
    }
}

impl ScanConfig {
    /// Set the walk options
    #[must_use]
    pub fn walk(mut self, walk: WalkOptions) -> Self {
        self.walk = walk;
        self
    }

    /// Keep only blocks with these encoding-type tags
    #[must_use]
    pub fn type_filter<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        self.type_filter = (!tags.is_empty()).then_some(tags);
        self
    }

    /// Set the worker count (at least one)
    #[must_use]
    pub fn workers(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }
}

/// Concurrent resource scanner.
#[derive(Debug, Clone, Default)]
pub struct ScanPipeline {
    config: ScanConfig,
    registry: Arc<FormatRegistry>,
}

impl ScanPipeline {
    /// Pipeline with the standard format registry.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            registry: Arc::new(FormatRegistry::standard()),
        }
    }

    /// Use a custom format registry.
    #[must_use]
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry.shared();
        self
    }

    /// The configuration in use
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start scanning `roots`. Must be called inside a Tokio runtime.
    ///
    /// Resources arrive in no particular order through the returned
    /// [`ResourceScan`]. Unreadable and undecodable files are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// `ScanError::NoRoots` if none of `roots` exists.
    pub fn scan(&self, cancel: &Cancellation, roots: &[PathBuf]) -> Result<ResourceScan> {
        if !roots.iter().any(|root| exists(root)) {
            return Err(ScanError::NoRoots);
        }

        let cancel = cancel.child();
        let (path_tx, path_rx) = mpsc::channel(PATH_QUEUE);
        let (tx, rx) = mpsc::channel(RESOURCE_BUFFER);

        let walker = PathWalker::new(self.config.walk.clone());
        let walk_roots = roots.to_vec();
        let walk_cancel = cancel.clone();
        let walk_task = tokio::task::spawn_blocking(move || {
            for path in walker.walk(&walk_roots, &walk_cancel) {
                if path_tx.blocking_send(path).is_err() {
                    break;
                }
            }
        });

        let reader = ResourceReader::new(Arc::clone(&self.registry))
            .with_type_filter(self.config.type_filter.clone());
        let driver = Driver {
            reader,
            tx,
            cancel: cancel.clone(),
            workers: self.config.worker_count.max(1),
            verbose: self.config.walk.verbose,
        };
        let driver = tokio::spawn(driver.run(path_rx, walk_task));

        Ok(ResourceScan {
            resources: ReceiverStream::new(rx),
            driver,
            cancel,
        })
    }
}

fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

struct Driver {
    reader: ResourceReader,
    tx: mpsc::Sender<Resource>,
    cancel: Cancellation,
    workers: usize,
    verbose: bool,
}

impl Driver {
    async fn run(
        self,
        mut paths: mpsc::Receiver<PathBuf>,
        walk_task: JoinHandle<()>,
    ) -> ScanOutcome {
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        loop {
            let path = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = self.tx.closed() => break,
                next = paths.recv() => match next {
                    Some(path) => path,
                    None => break,
                },
            };

            let permit = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let reader = self.reader.clone();
            let tx = self.tx.clone();
            let cancel = self.cancel.clone();
            let verbose = self.verbose;
            tasks.spawn(async move {
                let _permit = permit;
                read_and_emit(&reader, &path, &tx, &cancel, verbose).await;
            });

            while let Some(joined) = tasks.try_join_next() {
                report_join(joined);
            }
        }

        // Unblocks the walker if it is parked on a full queue.
        drop(paths);

        while let Some(joined) = tasks.join_next().await {
            report_join(joined);
        }
        if let Err(e) = walk_task.await {
            warn!(error = %e, "path walker failed");
        }

        let outcome = if self.cancel.is_cancelled() || self.tx.is_closed() {
            ScanOutcome::Cancelled
        } else {
            ScanOutcome::Complete
        };
        debug!(?outcome, "scan finished");
        outcome
    }
}

fn report_join(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "reader task failed");
    }
}

async fn read_and_emit(
    reader: &ResourceReader,
    path: &Path,
    tx: &mpsc::Sender<Resource>,
    cancel: &Cancellation,
    verbose: bool,
) {
    if cancel.is_cancelled() {
        return;
    }

    let resources = match reader.read(path).await {
        Ok(resources) => resources,
        Err(e) => {
            if verbose {
                warn!(path = %path.display(), error = %e, "skipping file");
            } else {
                debug!(path = %path.display(), error = %e, "skipping file");
            }
            return;
        }
    };

    for resource in resources {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            sent = tx.send(resource) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

/// A running scan: a stream of resources plus the task that produces them.
#[derive(Debug)]
pub struct ResourceScan {
    resources: ReceiverStream<Resource>,
    driver: JoinHandle<ScanOutcome>,
    cancel: Cancellation,
}

impl ResourceScan {
    /// Stop this scan. The caller's cancellation handle is not raised.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle cancelled when this scan (or its parent) is cancelled
    #[must_use]
    pub const fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Wait for every producer and report how the scan ended.
    ///
    /// Call once the stream is exhausted. Finishing earlier abandons the
    /// remaining resources and reports `Cancelled`, even when every producer
    /// had already finished. A raised cancellation also reports `Cancelled`.
    ///
    /// # Errors
    ///
    /// `ScanError::Task` if the driver task panicked.
    pub async fn finish(self) -> Result<ScanOutcome> {
        let mut resources = self.resources.into_inner();
        let abandoned = resources.try_recv().is_ok();
        drop(resources);

        let outcome = self
            .driver
            .await
            .map_err(|e| ScanError::Task(e.to_string()))?;
        if abandoned || self.cancel.is_cancelled() {
            debug!(abandoned, "scan finished early");
            return Ok(ScanOutcome::Cancelled);
        }
        Ok(outcome)
    }

    /// Drain the stream and finish.
    ///
    /// # Errors
    ///
    /// `ScanError::Task` if the driver task panicked.
    pub async fn collect_all(mut self) -> Result<(Vec<Resource>, ScanOutcome)> {
        use futures_util::StreamExt;

        let mut resources = Vec::new();
        while let Some(resource) = self.next().await {
            resources.push(resource);
        }
        let outcome = self.finish().await?;
        Ok((resources, outcome))
    }
}

impl Stream for ResourceScan {
    type Item = Resource;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Resource>> {
        Pin::new(&mut self.get_mut().resources).poll_next(cx)
    }
}

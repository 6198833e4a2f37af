//! Per-document sessions.
//!
//! A [`DocumentSession`] owns one document and lazily builds its vector
//! index exactly once. Concurrent callers that arrive while a build is in
//! flight await the same shared build instead of starting their own. A failed
//! build is recorded and retried by the next caller; an index is never
//! observable half-built.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

use crate::analysis::DocumentAnalysis;
use crate::document::{Answer, Document};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::pipeline::QaPipeline;

type SharedBuild = Shared<BoxFuture<'static, Result<Arc<VectorIndex>>>>;

enum IndexState {
    Unbuilt,
    Building(SharedBuild),
    Ready(Arc<VectorIndex>),
    Failed(RagError),
}

/// Observable state of a session's index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexStatus {
    /// No build has been requested yet.
    Unbuilt,
    /// A build is in flight.
    Building,
    /// The index is available.
    Ready {
        /// Number of indexed segments.
        segments: usize,
        /// Embedding dimensionality (0 for an empty index).
        dimensions: usize,
    },
    /// The last build failed; the next request retries.
    Failed(RagError),
}

/// One document plus its memoized index.
pub struct DocumentSession {
    pipeline: Arc<QaPipeline>,
    document: Document,
    state: Mutex<IndexState>,
}

impl DocumentSession {
    pub(crate) fn new(pipeline: Arc<QaPipeline>, document: Document) -> Self {
        Self { pipeline, document, state: Mutex::new(IndexState::Unbuilt) }
    }

    /// The session's document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The pipeline this session runs on.
    pub fn pipeline(&self) -> &Arc<QaPipeline> {
        &self.pipeline
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the index state.
    pub fn index_status(&self) -> IndexStatus {
        match &*self.lock() {
            IndexState::Unbuilt => IndexStatus::Unbuilt,
            IndexState::Building(_) => IndexStatus::Building,
            IndexState::Ready(index) => IndexStatus::Ready {
                segments: index.len(),
                dimensions: index.dimensions(),
            },
            IndexState::Failed(error) => IndexStatus::Failed(error.clone()),
        }
    }

    /// Return the index, building it first if needed.
    ///
    /// At most one build runs at a time per session; every concurrent caller
    /// receives the same `Arc<VectorIndex>` or the same error.
    ///
    /// # Errors
    ///
    /// Returns the build error. The session moves to
    /// [`IndexStatus::Failed`] and the next call starts a fresh build.
    pub async fn build_index(&self) -> Result<Arc<VectorIndex>> {
        let build = {
            let mut state = self.lock();
            match &*state {
                IndexState::Ready(index) => return Ok(Arc::clone(index)),
                IndexState::Building(build) => {
                    debug!("joining in-flight index build");
                    build.clone()
                }
                IndexState::Unbuilt | IndexState::Failed(_) => {
                    if let IndexState::Failed(previous) = &*state {
                        warn!(error = %previous, "retrying failed index build");
                    }
                    let build = Arc::clone(&self.pipeline)
                        .build_shared(self.document.clone())
                        .shared();
                    *state = IndexState::Building(build.clone());
                    build
                }
            }
        };

        let outcome = build.clone().await;

        let mut state = self.lock();
        // Only the build that is still current may settle the state.
        if matches!(&*state, IndexState::Building(current) if current.ptr_eq(&build)) {
            *state = match &outcome {
                Ok(index) => {
                    info!(segments = index.len(), "index ready");
                    IndexState::Ready(Arc::clone(index))
                }
                Err(error) => IndexState::Failed(error.clone()),
            };
        }
        outcome
    }

    /// Answer a question about the document, building the index on first use.
    ///
    /// The question is validated before any index build or service call.
    ///
    /// # Errors
    ///
    /// Returns validation, build, retrieval, or synthesis errors.
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> Result<Answer> {
        self.pipeline.validate_question(question)?;
        let index = self.build_index().await?;
        self.pipeline.ask(&index, question, top_k).await
    }

    /// Summarize the document. Does not touch the index.
    ///
    /// # Errors
    ///
    /// See [`QaPipeline::summarize`].
    pub async fn summarize(&self) -> Result<String> {
        self.pipeline.summarize(&self.document).await
    }

    /// Run the summary and the index build concurrently.
    pub async fn summarize_and_index(&self) -> (Result<String>, Result<Arc<VectorIndex>>) {
        futures::join!(self.summarize(), self.build_index())
    }

    /// Statistics and sentiment for the document.
    pub fn analyze(&self) -> DocumentAnalysis {
        self.pipeline.analyze(&self.document)
    }
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("document", &self.document.name)
            .field("chars", &self.document.char_len())
            .field("index", &self.index_status())
            .finish()
    }
}

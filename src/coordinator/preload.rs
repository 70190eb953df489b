//! Asset preload gate: a batch of images becomes a future that always settles

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::error::FetchError;

/// Fetches one image so that it is ready when its row is revealed
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), FetchError>;
}

/// Downloads images over HTTP. A 2xx response with a readable body counts as loaded.
#[derive(Clone)]
pub struct HttpAssetLoader {
    http: reqwest::Client,
}

impl HttpAssetLoader {
    pub fn new(request_timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| FetchError::Http {
                operation: "asset loader setup",
                source,
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, url: &str) -> Result<(), FetchError> {
        let operation = "asset";
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                operation,
                status: status.as_u16(),
                body: String::new(),
            });
        }

        response
            .bytes()
            .await
            .map(|_| ())
            .map_err(|source| FetchError::Http { operation, source })
    }
}

/// Tally of one settled batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RevealOutcome {
    pub loaded: usize,
    pub failed: usize,
}

impl RevealOutcome {
    pub fn total(&self) -> usize {
        self.loaded + self.failed
    }
}

/// Resolves once every image of a batch has loaded or failed. Never errors.
pub type RevealFuture = Shared<BoxFuture<'static, RevealOutcome>>;

/// A reveal with nothing to wait for
pub fn settled(outcome: RevealOutcome) -> RevealFuture {
    future::ready(outcome).boxed().shared()
}

#[derive(Clone)]
pub struct AssetPreloadGate {
    loader: Arc<dyn AssetLoader>,
}

impl AssetPreloadGate {
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self { loader }
    }

    /// Start loading `image_refs` now and return the batch's reveal future.
    ///
    /// Empty references are treated as already loaded. Loading runs on its own
    /// task, so the batch settles even if nobody polls the returned future.
    pub fn register(&self, batch: &'static str, image_refs: Vec<String>) -> RevealFuture {
        let (empty, urls): (Vec<_>, Vec<_>) = image_refs.into_iter().partition(|u| u.is_empty());
        if urls.is_empty() {
            return settled(RevealOutcome {
                loaded: empty.len(),
                failed: 0,
            });
        }

        let loader = self.loader.clone();
        let already_loaded = empty.len();
        let requested = urls.len();
        let handle = tokio::spawn(async move {
            let results = future::join_all(urls.iter().map(|url| {
                let loader = loader.clone();
                async move {
                    let result = loader.load(url).await;
                    if let Err(e) = &result {
                        tracing::debug!(batch, url = %url, error = %e, "Image failed to load");
                    }
                    result.is_ok()
                }
            }))
            .await;

            let loaded = results.iter().filter(|ok| **ok).count();
            let outcome = RevealOutcome {
                loaded: loaded + already_loaded,
                failed: results.len() - loaded,
            };
            tracing::debug!(batch, loaded = outcome.loaded, failed = outcome.failed, "Image batch settled");
            outcome
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(batch, error = %e, "Image batch task ended abnormally");
                    RevealOutcome {
                        loaded: already_loaded,
                        failed: requested,
                    }
                }
            }
        }
        .boxed()
        .shared()
    }
}

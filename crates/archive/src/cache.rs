//! Durable raw-frame cache.
//!
//! Frames are stored under their cache key in the `originals/` directory
//! and never removed, so later runs that see the same URL reuse the file.
//! Every download waits out the politeness delay first and is not retried.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use suncast_common::error::SuncastResult;

use crate::http::HttpSource;
use crate::locator::FrameReference;

/// Result of resolving a frame against the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Local file holding the frame.
    pub path: PathBuf,

    /// Whether this call had to download it.
    pub downloaded: bool,
}

/// Download-on-miss cache of raw frames.
pub struct FrameCache {
    http: Arc<dyn HttpSource>,
    dir: PathBuf,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl FrameCache {
    /// `politeness` is the pause before each download issued through this
    /// cache, counted from construction for the first one and from the
    /// previous download after that; zero disables throttling.
    pub fn new(http: Arc<dyn HttpSource>, dir: impl Into<PathBuf>, politeness: Duration) -> Self {
        let limiter = Quota::with_period(politeness).map(|quota| {
            let limiter = RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN));
            // start with an empty bucket so the first download waits too
            limiter.check().ok();
            limiter
        });
        Self {
            http,
            dir: dir.into(),
            limiter,
        }
    }

    /// Where a frame lives (or will live) in the cache.
    pub fn path_for(&self, frame: &FrameReference) -> PathBuf {
        self.dir.join(frame.cache_key())
    }

    /// Return the cached file for `frame`, downloading it first if absent.
    ///
    /// An existing file is trusted as-is. A new download is written to a
    /// `.part` sibling and renamed into place once complete, so a failed
    /// transfer never leaves a truncated frame behind.
    pub async fn fetch(&self, frame: &FrameReference) -> SuncastResult<RawFrame> {
        let path = self.path_for(frame);
        if path.is_file() {
            tracing::debug!(url = %frame.url(), path = %path.display(), "Frame already cached");
            return Ok(RawFrame {
                path,
                downloaded: false,
            });
        }

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        tracing::debug!(url = %frame.url(), "Downloading frame");
        let body = self.http.get_bytes(frame.url().as_str()).await?;

        let partial = self.dir.join(format!("{}.part", frame.cache_key()));
        let written = match tokio::fs::write(&partial, &body).await {
            Ok(()) => tokio::fs::rename(&partial, &path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(err.into());
        }

        tracing::debug!(path = %path.display(), bytes = body.len(), "Frame saved");
        Ok(RawFrame {
            path,
            downloaded: true,
        })
    }
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCache")
            .field("dir", &self.dir)
            .field("throttled", &self.limiter.is_some())
            .finish()
    }
}

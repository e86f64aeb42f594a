//! Publishing a finished artifact with bounded retry.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use suncast_common::error::{SuncastError, SuncastResult};
use suncast_common::retry::retry;

/// A status that was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedStatus {
    pub id: String,
}

impl PostedStatus {
    pub fn url(&self) -> String {
        format!("https://twitter.com/i/status/{}", self.id)
    }
}

/// Trait for social-media backends.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Upload media and return its identifier.
    async fn upload_media(&self, media: &[u8]) -> SuncastResult<String>;

    /// Post a status referencing previously uploaded media.
    async fn post_status(&self, status: &str, media_ids: &[String]) -> SuncastResult<PostedStatus>;
}

/// How a publish attempt ended. Neither outcome touches the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Posted { status: PostedStatus, attempts: u32 },
    Abandoned { attempts: u32, last_error: String },
}

/// Upload `artifact` and post it, retrying the upload + post pair up to
/// `attempts` times.
///
/// Failing to read the artifact is an error. Running out of attempts is not:
/// it is logged and reported as [`PublishOutcome::Abandoned`].
pub async fn publish_artifact(
    publisher: &dyn Publisher,
    artifact: &Path,
    status: &str,
    attempts: u32,
) -> SuncastResult<PublishOutcome> {
    let media = tokio::fs::read(artifact).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SuncastError::FileNotFound {
                path: artifact.to_path_buf(),
            }
        } else {
            SuncastError::Io(e)
        }
    })?;
    if media.is_empty() {
        return Err(SuncastError::publish(format!(
            "artifact {} is empty",
            artifact.display()
        )));
    }

    let limit = attempts.max(1);
    let made = AtomicU32::new(0);
    let result = retry("publish artifact", limit, |_| true, |attempt| {
        made.store(attempt, Ordering::Relaxed);
        let media = &media;
        async move {
            tracing::debug!(attempt, limit, "Publishing");
            let posted = match publisher.upload_media(media).await {
                Ok(media_id) => publisher.post_status(status, &[media_id]).await,
                Err(err) => Err(err),
            };
            if let Err(err) = &posted {
                tracing::error!(attempt, error = %err, "Publishing failed");
            }
            posted
        }
    })
    .await;

    let attempts = made.load(Ordering::Relaxed);
    match result {
        Ok(status) => {
            tracing::info!(url = %status.url(), attempts, "Published");
            Ok(PublishOutcome::Posted { status, attempts })
        }
        Err(err) => {
            tracing::error!(attempts, error = %err, "Publishing failed {attempts} times, aborting");
            Ok(PublishOutcome::Abandoned {
                attempts,
                last_error: err.to_string(),
            })
        }
    }
}

//! Build the hourly animation and publish it.

use std::path::PathBuf;
use std::sync::Arc;

use suncast_archive::ReqwestSource;
use suncast_common::clock::TimeWindow;
use suncast_common::config::{AppConfig, WorkDir};
use suncast_pipeline::Pipeline;
use suncast_publisher::{publish_artifact, Credentials, PublishOutcome, TwitterPublisher};
use suncast_render_engine::ExternalTools;

pub async fn run(
    config: AppConfig,
    work_dir: PathBuf,
    keyfile: Option<PathBuf>,
    tweet: bool,
    status: String,
) -> anyhow::Result<()> {
    let work_dir = WorkDir::open(work_dir)?;

    // Load keys before doing any work so a bad keyfile fails fast.
    let credentials = if tweet {
        let keyfile = keyfile
            .ok_or_else(|| anyhow::anyhow!("--keyfile is required unless --no-tweet is given"))?;
        Some(Credentials::from_keyfile(&keyfile)?)
    } else {
        tracing::warn!("Not tweeting the resulting GIF");
        None
    };

    let window = TimeWindow::capture(config.archive.publication_lag_minutes);
    let http = Arc::new(ReqwestSource::new(&config.archive.user_agent)?);
    let tools = Arc::new(ExternalTools::new(config.render.clone()));
    let pipeline = Pipeline::new(&config, http, tools);

    let report = pipeline
        .run(&work_dir, &window)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to generate GIF for {window}: {e}"))?;

    println!("Created {}", report.artifact.display());
    println!(
        "  Frames: {} ({} downloaded, {} cached)",
        report.frames,
        report.downloaded,
        report.frames - report.downloaded
    );
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    let Some(credentials) = credentials else {
        return Ok(());
    };

    let publisher = TwitterPublisher::new(&credentials, &config.publish)?;
    match publish_artifact(&publisher, &report.artifact, &status, config.publish.attempts).await? {
        PublishOutcome::Posted { status, attempts } => {
            println!("Posted {} (attempt {attempts})", status.url());
        }
        PublishOutcome::Abandoned {
            attempts,
            last_error,
        } => {
            println!("Not posted after {attempts} attempts: {last_error}");
            println!("The animation is kept at {}", report.artifact.display());
        }
    }

    Ok(())
}

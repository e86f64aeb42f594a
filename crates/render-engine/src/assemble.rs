//! Animated GIF assembly.
//!
//! Processed frames are written into the run's scratch directory, handed
//! to an encoder to build a preliminary animation, and then squeezed by an
//! optimizer into the durable destination.
//!
//! ```text
//! frames ──► scratch/<cache_key>... ──encode──► scratch/<name>.gif
//!                                                   │
//!                                               optimize
//!                                                   ▼
//!                                  gifs/<name>.gif.part ──rename──► gifs/<name>.gif
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use suncast_common::config::RenderConfig;
use suncast_common::error::{SuncastError, SuncastResult};

use crate::transform::ProcessedFrame;

/// Trait for the tools that turn still frames into an optimized animation.
pub trait AnimationTools: Send + Sync {
    /// Build an animation from `frames`, in order, at `output`.
    fn encode(&self, frames: &[PathBuf], output: &Path) -> SuncastResult<()>;

    /// Shrink the animation at `source` into `dest`.
    fn optimize(&self, source: &Path, dest: &Path) -> SuncastResult<()>;

    /// Check if the tools are installed.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// ImageMagick `convert` for encoding and `gifsicle` for optimizing.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    config: RenderConfig,
}

impl ExternalTools {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Paths are passed through as-is, including ones that are not UTF-8.
    pub fn encoder_args(&self, frames: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-delay".into(),
            self.config.frame_delay_cs.to_string().into(),
        ];
        args.extend(frames.iter().map(|f| f.as_os_str().to_os_string()));
        args.push(output.as_os_str().to_os_string());
        args
    }

    pub fn optimizer_args(&self, source: &Path, dest: &Path) -> Vec<OsString> {
        vec![
            "--colors".into(),
            self.config.colors.to_string().into(),
            format!("--optimize={}", self.config.optimize_level).into(),
            "--output".into(),
            dest.as_os_str().to_os_string(),
            source.as_os_str().to_os_string(),
        ]
    }

    /// Availability of each configured binary, for diagnostics.
    pub fn tool_status(&self) -> Vec<(String, bool)> {
        [&self.config.encoder, &self.config.optimizer]
            .into_iter()
            .map(|tool| (tool.clone(), command_exists(tool)))
            .collect()
    }
}

impl AnimationTools for ExternalTools {
    fn encode(&self, frames: &[PathBuf], output: &Path) -> SuncastResult<()> {
        tracing::info!(frames = frames.len(), "Converting frames to GIF");
        run_tool(&self.config.encoder, &self.encoder_args(frames, output))?;
        require_output(&self.config.encoder, output)?;
        tracing::debug!(path = %output.display(), "Preliminary GIF saved");
        Ok(())
    }

    fn optimize(&self, source: &Path, dest: &Path) -> SuncastResult<()> {
        tracing::debug!(path = %source.display(), "Optimizing GIF size");
        run_tool(&self.config.optimizer, &self.optimizer_args(source, dest))?;
        require_output(&self.config.optimizer, dest)?;
        tracing::debug!(path = %dest.display(), "Optimized GIF saved");
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.tool_status().iter().all(|(_, available)| *available)
    }

    fn name(&self) -> &str {
        "imagemagick+gifsicle"
    }
}

/// Writes frames to scratch and drives [`AnimationTools`] over them.
#[derive(Clone)]
pub struct Assembler {
    tools: Arc<dyn AnimationTools>,
}

impl Assembler {
    pub fn new(tools: Arc<dyn AnimationTools>) -> Self {
        Self { tools }
    }

    /// Serialize `frames` into `scratch` in sequence order, one file per
    /// frame named by its cache key.
    pub fn write_frames(
        &self,
        frames: &[ProcessedFrame],
        scratch: &Path,
    ) -> SuncastResult<Vec<PathBuf>> {
        let mut ordered: Vec<&ProcessedFrame> = frames.iter().collect();
        ordered.sort_by_key(|frame| frame.index);

        let mut paths = Vec::with_capacity(ordered.len());
        for frame in ordered {
            let path = scratch.join(&frame.cache_key);
            if paths.contains(&path) {
                return Err(SuncastError::archive(format!(
                    "two frames share the cache key {}",
                    frame.cache_key
                )));
            }
            frame.image.save(&path).map_err(|e| {
                SuncastError::image(format!("failed to write {}: {e}", path.display()))
            })?;
            paths.push(path);
        }
        tracing::info!(frames = paths.len(), "Frames processed");
        Ok(paths)
    }

    /// Produce the optimized animation at `dest`.
    ///
    /// Only `dest` itself is ever touched outside `scratch`: the optimizer
    /// writes a `.part` sibling that is renamed into place on success and
    /// removed on failure.
    pub fn assemble(
        &self,
        frames: &[ProcessedFrame],
        scratch: &Path,
        dest: &Path,
    ) -> SuncastResult<PathBuf> {
        if frames.is_empty() {
            return Err(SuncastError::archive("no frames to assemble"));
        }

        let frame_paths = self.write_frames(frames, scratch)?;
        let preliminary = self.encode(&frame_paths, scratch, dest)?;
        self.optimize(&preliminary, dest)
    }

    /// Encode already-written frame files into a preliminary animation in
    /// `scratch`, named after `dest`.
    pub fn encode(
        &self,
        frame_paths: &[PathBuf],
        scratch: &Path,
        dest: &Path,
    ) -> SuncastResult<PathBuf> {
        if frame_paths.is_empty() {
            return Err(SuncastError::archive("no frames to assemble"));
        }
        let file_name = dest
            .file_name()
            .ok_or_else(|| SuncastError::config(format!("bad destination {}", dest.display())))?;

        let preliminary = scratch.join(file_name);
        self.tools.encode(frame_paths, &preliminary)?;
        Ok(preliminary)
    }

    /// Optimize `preliminary` into `dest` via a `.part` sibling.
    pub fn optimize(&self, preliminary: &Path, dest: &Path) -> SuncastResult<PathBuf> {
        let file_name = dest
            .file_name()
            .ok_or_else(|| SuncastError::config(format!("bad destination {}", dest.display())))?;
        let mut partial_name = file_name.to_os_string();
        partial_name.push(".part");
        let partial = dest.with_file_name(partial_name);

        let optimized = self
            .tools
            .optimize(preliminary, &partial)
            .and_then(|()| std::fs::rename(&partial, dest).map_err(SuncastError::from));
        if let Err(err) = optimized {
            if partial.exists() {
                std::fs::remove_file(&partial).ok();
            }
            return Err(err);
        }

        tracing::info!(path = %dest.display(), backend = self.tools.name(), "Final GIF saved");
        Ok(dest.to_path_buf())
    }
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("tools", &self.tools.name())
            .finish()
    }
}

/// Run a tool to completion, failing on spawn errors or a non-zero exit.
fn run_tool(tool: &str, args: &[OsString]) -> SuncastResult<()> {
    tracing::debug!(tool, args = ?args, "Running tool");
    let output = Command::new(tool).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SuncastError::tool(tool, "not found in PATH")
        } else {
            SuncastError::tool(tool, format!("failed to start: {e}"))
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SuncastError::tool(
            tool,
            format!("{} ({})", output.status, stderr.trim()),
        ));
    }
    Ok(())
}

/// A tool that exits cleanly but leaves nothing behind still failed.
fn require_output(tool: &str, path: &Path) -> SuncastResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(SuncastError::tool(
            tool,
            format!("produced an empty file at {}", path.display()),
        )),
        Err(_) => Err(SuncastError::tool(
            tool,
            format!("produced no output at {}", path.display()),
        )),
    }
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    /// Records what it was asked to do and writes placeholder files.
    #[derive(Default)]
    struct RecordingTools {
        encoded: Mutex<Vec<PathBuf>>,
        fail_optimize: bool,
    }

    impl AnimationTools for RecordingTools {
        fn encode(&self, frames: &[PathBuf], output: &Path) -> SuncastResult<()> {
            *self.encoded.lock().unwrap() = frames.to_vec();
            std::fs::write(output, b"GIF89a-preliminary")?;
            Ok(())
        }

        fn optimize(&self, source: &Path, dest: &Path) -> SuncastResult<()> {
            std::fs::write(dest, b"GIF89a-partial")?;
            if self.fail_optimize {
                return Err(SuncastError::tool("fake-optimizer", "exit status: 1"));
            }
            std::fs::copy(source, dest)?;
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn frame(index: usize, key: &str) -> ProcessedFrame {
        ProcessedFrame {
            index,
            cache_key: key.to_string(),
            image: RgbImage::from_pixel(8, 4, Rgb([index as u8, 0, 0])),
        }
    }

    #[test]
    fn test_assemble_writes_frames_in_sequence_order() {
        let scratch = tempfile::tempdir().unwrap();
        let gifs = tempfile::tempdir().unwrap();
        let tools = Arc::new(RecordingTools::default());
        let assembler = Assembler::new(tools.clone());

        let frames = vec![frame(1, "b_1024_0193.jpg"), frame(0, "a_1024_0193.jpg")];
        let dest = gifs.path().join("2024_03_15_14.gif");
        let artifact = assembler.assemble(&frames, scratch.path(), &dest).unwrap();

        assert_eq!(artifact, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"GIF89a-preliminary");
        assert_eq!(
            *tools.encoded.lock().unwrap(),
            vec![
                scratch.path().join("a_1024_0193.jpg"),
                scratch.path().join("b_1024_0193.jpg"),
            ]
        );
        assert!(scratch.path().join("2024_03_15_14.gif").exists());
        assert!(!gifs.path().join("2024_03_15_14.gif.part").exists());
        assert_eq!(std::fs::read_dir(gifs.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_optimize_leaves_gifs_untouched() {
        let scratch = tempfile::tempdir().unwrap();
        let gifs = tempfile::tempdir().unwrap();
        let tools = Arc::new(RecordingTools {
            fail_optimize: true,
            ..RecordingTools::default()
        });
        let assembler = Assembler::new(tools);

        let dest = gifs.path().join("2024_03_15_14.gif");
        let err = assembler
            .assemble(&[frame(0, "a_1024_0193.jpg")], scratch.path(), &dest)
            .unwrap_err();

        assert!(matches!(err, SuncastError::Tool { .. }));
        assert_eq!(std::fs::read_dir(gifs.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_assemble_rejects_empty_sequence() {
        let scratch = tempfile::tempdir().unwrap();
        let assembler = Assembler::new(Arc::new(RecordingTools::default()));
        let err = assembler
            .assemble(&[], scratch.path(), &scratch.path().join("out.gif"))
            .unwrap_err();
        assert!(matches!(err, SuncastError::Archive { .. }));
    }

    #[test]
    fn test_duplicate_cache_keys_are_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let assembler = Assembler::new(Arc::new(RecordingTools::default()));
        let frames = vec![frame(0, "same.jpg"), frame(1, "same.jpg")];
        assert!(assembler.write_frames(&frames, scratch.path()).is_err());
    }

    #[test]
    fn test_tool_arguments() {
        let tools = ExternalTools::new(RenderConfig::default());
        let frames = vec![PathBuf::from("/s/a.jpg"), PathBuf::from("/s/b.jpg")];
        assert_eq!(
            tools.encoder_args(&frames, Path::new("/s/out.gif")),
            ["-delay", "15", "/s/a.jpg", "/s/b.jpg", "/s/out.gif"].map(OsString::from)
        );
        assert_eq!(
            tools.optimizer_args(Path::new("/s/out.gif"), Path::new("/g/out.gif")),
            ["--colors", "256", "--optimize=3", "--output", "/g/out.gif", "/s/out.gif"]
                .map(OsString::from)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_reach_the_tools_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let tools = ExternalTools::new(RenderConfig::default());
        let odd = PathBuf::from(std::ffi::OsStr::from_bytes(b"/s/fr\xffame.jpg"));
        let out = PathBuf::from(std::ffi::OsStr::from_bytes(b"/g/\xfe.gif"));

        let encoder = tools.encoder_args(std::slice::from_ref(&odd), &out);
        assert_eq!(encoder[2], odd.as_os_str());
        assert_eq!(encoder[3], out.as_os_str());

        let optimizer = tools.optimizer_args(&odd, &out);
        assert_eq!(optimizer[4], out.as_os_str());
        assert_eq!(optimizer[5], odd.as_os_str());
    }

    #[test]
    fn test_missing_binary_is_a_tool_error() {
        let tools = ExternalTools::new(RenderConfig {
            encoder: "suncast-no-such-encoder".to_string(),
            ..RenderConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let err = tools
            .encode(&[], &dir.path().join("out.gif"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "suncast-no-such-encoder failed: not found in PATH"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_a_tool_error() {
        let tools = ExternalTools::new(RenderConfig {
            encoder: "false".to_string(),
            ..RenderConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let err = tools.encode(&[], &dir.path().join("out.gif")).unwrap_err();
        assert!(matches!(err, SuncastError::Tool { ref tool, .. } if tool == "false"));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_without_output_is_a_tool_error() {
        let tools = ExternalTools::new(RenderConfig {
            encoder: "true".to_string(),
            ..RenderConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let err = tools.encode(&[], &dir.path().join("out.gif")).unwrap_err();
        assert!(err.to_string().contains("produced no output"));
    }
}

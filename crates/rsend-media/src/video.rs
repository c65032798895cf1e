//! FFmpeg-backed video engine.

use std::path::Path;

use async_trait::async_trait;
use rsend_models::SizeSpec;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::engine::{VideoEngine, VideoOps};
use crate::error::MediaResult;

/// `scale` filter for a size. A missing axis follows the aspect ratio and is
/// rounded to an even number, as most encoders require.
pub fn scale_filter(size: SizeSpec) -> String {
    match size {
        SizeSpec::Width(w) => format!("scale={}:-2", w),
        SizeSpec::Height(h) => format!("scale=-2:{}", h),
        SizeSpec::Both(w, h) => format!("scale={}:{}", w, h),
    }
}

/// Build the transcode command for a set of ops.
pub fn transcode_command(input: &Path, ops: &VideoOps, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(input, output);

    if let Some(size) = ops.size {
        cmd = cmd.video_filter(scale_filter(size));
    }
    if let Some(kbps) = ops.bitrate_kbps {
        cmd = cmd.video_bitrate_kbps(kbps);
    }
    if let Some(fps) = ops.fps {
        cmd = cmd.frame_rate(fps);
    }
    if let Some(aspect) = &ops.aspect {
        cmd = cmd.aspect(aspect.clone());
    }

    cmd
}

/// Build the single-frame extraction command.
pub fn screenshot_command(
    input: &Path,
    timestamp: &str,
    size: Option<SizeSpec>,
    output: &Path,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(input, output).seek_to(timestamp);

    if let Some(size) = size {
        cmd = cmd.video_filter(scale_filter(size));
    }

    cmd.single_frame().output_args(["-update", "1"])
}

/// Video engine driving the `ffmpeg` CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegVideoEngine {
    runner: FfmpegRunner,
}

impl FfmpegVideoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill FFmpeg runs that take longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }
}

#[async_trait]
impl VideoEngine for FfmpegVideoEngine {
    async fn transcode(&self, input: &Path, ops: &VideoOps, output: &Path) -> MediaResult<()> {
        info!(
            input = %input.display(),
            output = %output.display(),
            "Transcoding video"
        );

        let cmd = transcode_command(input, ops, output);
        self.runner
            .run_with_progress(&cmd, |progress| {
                debug!(
                    frame = progress.frame,
                    out_time_ms = progress.out_time_ms,
                    speed = progress.speed,
                    "Transcode progress"
                );
            })
            .await
    }

    async fn screenshot(
        &self,
        input: &Path,
        timestamp: &str,
        size: Option<SizeSpec>,
        output: &Path,
    ) -> MediaResult<()> {
        info!(
            input = %input.display(),
            timestamp,
            "Extracting frame"
        );

        let cmd = screenshot_command(input, timestamp, size, output);
        self.runner.run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_scale_filter() {
        assert_eq!(scale_filter(SizeSpec::Width(320)), "scale=320:-2");
        assert_eq!(scale_filter(SizeSpec::Height(240)), "scale=-2:240");
        assert_eq!(scale_filter(SizeSpec::Both(320, 240)), "scale=320:240");
    }

    #[test]
    fn test_transcode_command_only_has_requested_settings() {
        let ops = VideoOps {
            bitrate_kbps: Some(500),
            ..Default::default()
        };
        let args = transcode_command(&PathBuf::from("v.mp4"), &ops, &PathBuf::from("o.mp4"))
            .build_args();

        assert!(args.join(" ").contains("-b:v 500k"));
        assert!(!args.contains(&"-vf".to_string()));
        assert!(!args.contains(&"-r".to_string()));
        assert!(!args.contains(&"-aspect".to_string()));
    }

    #[test]
    fn test_screenshot_command() {
        let args = screenshot_command(
            &PathBuf::from("v.mp4"),
            "00:00:17",
            Some(SizeSpec::Both(320, 240)),
            &PathBuf::from("o.jpg"),
        )
        .build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-ss 00:00:17 -i v.mp4"));
        assert!(joined.contains("-vf scale=320:240"));
        assert!(joined.contains("-vframes 1"));
        assert!(joined.ends_with("o.jpg"));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_screenshot_missing_input_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = FfmpegVideoEngine::new()
            .screenshot(
                &dir.path().join("missing.mp4"),
                "00:00:01",
                None,
                &dir.path().join("out.jpg"),
            )
            .await;
        assert!(result.is_err());
        assert!(!dir.path().join("out.jpg").exists());
    }
}

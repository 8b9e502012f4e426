//! Video encoder that streams raw RGBA frames into a system `ffmpeg`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use flyover_common::{FlyoverError, FlyoverResult};
use flyover_route_model::{RenderConfig, VideoFormat};

use crate::collaborators::{PixelBuffer, VideoEncoder};

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Codec arguments for an output format.
pub fn codec_args(format: VideoFormat) -> &'static [&'static str] {
    match format {
        VideoFormat::Mp4H264 => &[
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-crf",
            "20",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ],
        VideoFormat::Mp4H265 => &[
            "-c:v",
            "libx265",
            "-crf",
            "24",
            "-tag:v",
            "hvc1",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ],
        VideoFormat::Webm => &[
            "-c:v",
            "libvpx-vp9",
            "-crf",
            "32",
            "-b:v",
            "0",
            "-pix_fmt",
            "yuv420p",
        ],
    }
}

/// Full argument list for encoding `width`x`height` RGBA frames at `fps`.
pub fn ffmpeg_args(
    width: u32,
    height: u32,
    fps: u32,
    format: VideoFormat,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{width}x{height}"));
    args.push("-r".to_string());
    args.push(fps.to_string());
    args.extend(["-i", "pipe:0", "-an"].iter().map(|s| s.to_string()));
    args.extend(codec_args(format).iter().map(|s| s.to_string()));
    args.push(output.display().to_string());
    args
}

struct Running {
    child: Child,
    stdin: ChildStdin,
    stderr_drain: JoinHandle<String>,
    width: u32,
    height: u32,
}

/// Streams frames into `ffmpeg` over stdin.
///
/// The process starts on the first appended frame so the stream size can
/// follow the captured resolution (which includes the pixel scale).
pub struct FfmpegEncoder {
    output_path: PathBuf,
    fps: u32,
    format: VideoFormat,
    running: Option<Running>,
    frames_written: u64,
    finished: bool,
}

impl FfmpegEncoder {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            fps: 30,
            format: VideoFormat::default(),
            running: None,
            frames_written: 0,
            finished: false,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn spawn(&mut self, width: u32, height: u32) -> FlyoverResult<Running> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(FlyoverError::encoder(format!(
                "frame size {width}x{height} must be non-zero and even"
            )));
        }

        let args = ffmpeg_args(width, height, self.fps, self.format, &self.output_path);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FlyoverError::encoder(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FlyoverError::encoder("Failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FlyoverError::encoder("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_drain = std::thread::spawn(move || {
            let mut output = String::new();
            match stderr.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            pid = child.id(),
            width,
            height,
            fps = self.fps,
            output = %self.output_path.display(),
            "ffmpeg process started"
        );

        Ok(Running {
            child,
            stdin,
            stderr_drain,
            width,
            height,
        })
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn setup(&mut self, config: &RenderConfig) -> FlyoverResult<PathBuf> {
        if self.running.is_some() {
            return Err(FlyoverError::invalid_state("encoder is already running"));
        }
        if config.fps == 0 {
            return Err(FlyoverError::config("fps must be non-zero"));
        }
        if !ffmpeg_available() {
            return Err(FlyoverError::encoder(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }

        let extension = config.format.extension();
        if self.output_path.extension().and_then(|e| e.to_str()) != Some(extension) {
            self.output_path.set_extension(extension);
        }
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        self.fps = config.fps;
        self.format = config.format;
        self.frames_written = 0;
        self.finished = false;
        Ok(self.output_path.clone())
    }

    fn append(&mut self, frame: &PixelBuffer) -> FlyoverResult<()> {
        if self.finished {
            return Err(FlyoverError::invalid_state("encoder is already finished"));
        }
        if self.running.is_none() {
            self.running = Some(self.spawn(frame.width, frame.height)?);
        }
        let Some(running) = self.running.as_mut() else {
            return Err(FlyoverError::encoder("ffmpeg is not running"));
        };

        if frame.width != running.width || frame.height != running.height {
            return Err(FlyoverError::encoder(format!(
                "frame size changed mid-stream: got {}x{}, expected {}x{}",
                frame.width, frame.height, running.width, running.height
            )));
        }

        running.stdin.write_all(&frame.data).map_err(|e| {
            FlyoverError::encoder(format!("Failed to write frame to ffmpeg: {e}"))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> FlyoverResult<()> {
        let Some(running) = self.running.take() else {
            return Err(FlyoverError::encoder("no frames were appended"));
        };
        let Running {
            mut child,
            stdin,
            stderr_drain,
            ..
        } = running;

        drop(stdin);
        let status = child
            .wait()
            .map_err(|e| FlyoverError::encoder(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_drain
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
        self.finished = true;

        if !status.success() {
            return Err(FlyoverError::encoder(format!(
                "ffmpeg failed (status {status}): {}",
                stderr_output.trim()
            )));
        }

        tracing::info!(
            frames = self.frames_written,
            output = %self.output_path.display(),
            "Video encoded"
        );
        Ok(())
    }

    fn discard(&mut self) {
        if let Some(mut running) = self.running.take() {
            if let Err(err) = running.child.kill() {
                tracing::debug!(error = %err, "ffmpeg already exited");
            }
            let _ = running.child.wait();
            let _ = running.stderr_drain.join();
        }
        if self.output_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.output_path) {
                tracing::warn!(
                    error = %err,
                    path = %self.output_path.display(),
                    "Failed to remove partial output"
                );
            }
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.running.is_some() {
            self.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_describe_raw_input() {
        let args = ffmpeg_args(1080, 1920, 30, VideoFormat::Mp4H264, Path::new("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1080x1920 -r 30 -i pipe:0"));
        assert!(joined.contains("libx264"));
        assert!(joined.contains("+faststart"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_codec_per_format() {
        assert!(codec_args(VideoFormat::Mp4H265).contains(&"libx265"));
        assert!(codec_args(VideoFormat::Webm).contains(&"libvpx-vp9"));
        assert!(!codec_args(VideoFormat::Webm).contains(&"+faststart"));
    }

    #[test]
    fn test_finish_without_frames_fails() {
        let mut encoder = FfmpegEncoder::new("never.mp4");
        let err = encoder.finish().unwrap_err();
        assert!(err.is_collaborator());
    }

    #[test]
    fn test_odd_frame_size_is_rejected_before_spawn() {
        let mut encoder = FfmpegEncoder::new("odd.mp4");
        let frame = PixelBuffer::filled(3, 3, [0, 0, 0, 255]);
        let err = encoder.append(&frame).unwrap_err();
        assert!(err.is_collaborator());
        assert_eq!(encoder.frames_written(), 0);
    }
}

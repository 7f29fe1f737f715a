//! Screen capture and thumbnail extraction via ffmpeg subprocesses.
//!
//! Recording produces a single local MP4; a thumbnail frame is pulled
//! from it afterwards. Requires `ffmpeg` and `ffprobe` on PATH.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Capture input arguments for the current platform's screen grabber.
fn capture_input_args() -> Vec<String> {
    if cfg!(target_os = "macos") {
        // Default display via AVFoundation, no audio
        vec![
            "-f".into(),
            "avfoundation".into(),
            "-i".into(),
            "1:none".into(),
        ]
    } else {
        let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0.0".to_string());
        vec![
            "-f".into(),
            "x11grab".into(),
            "-framerate".into(),
            "30".into(),
            "-i".into(),
            display,
        ]
    }
}

/// Full ffmpeg argument list for a duration-bounded screen recording.
fn recording_args(input: &[String], duration_secs: u64, output: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostdin".into(),
    ];
    args.extend_from_slice(input);
    args.extend([
        "-t".into(),
        duration_secs.to_string(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "veryfast".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-y".into(),
        output.into(),
    ]);
    args
}

/// Record the screen for `duration_secs` seconds into `output`.
pub fn record_screen(output: &Path, duration_secs: u64) -> Result<()> {
    let output_str = output
        .to_str()
        .context("output path is not valid UTF-8")?;
    let args = recording_args(&capture_input_args(), duration_secs, output_str);

    log::info!("recording screen for {}s -> {}", duration_secs, output_str);

    let result = Command::new("ffmpeg")
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .context("failed to spawn ffmpeg; is it installed?")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        bail!("ffmpeg recording failed: {}", stderr.trim());
    }
    Ok(())
}

/// Extract a single thumbnail frame from a recording.
/// Seeks one second in; falls back to the first frame for clips shorter
/// than that.
pub fn extract_thumbnail(video: &Path, thumbnail: &Path) -> Result<()> {
    let video_str = video.to_str().context("video path is not valid UTF-8")?;
    let thumb_str = thumbnail
        .to_str()
        .context("thumbnail path is not valid UTF-8")?;

    let seeked = run_ffmpeg_frame_grab(video_str, thumb_str, true)?;
    if seeked && thumbnail.exists() {
        return Ok(());
    }

    log::warn!("seeked frame grab failed, retrying from the first frame");
    if !run_ffmpeg_frame_grab(video_str, thumb_str, false)? {
        bail!("ffmpeg could not extract a thumbnail frame from {video_str}");
    }
    Ok(())
}

fn run_ffmpeg_frame_grab(video: &str, thumbnail: &str, seek: bool) -> Result<bool> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin"]);
    if seek {
        cmd.args(["-ss", "00:00:01"]);
    }
    cmd.args(["-i", video])
        .args(["-an", "-sn"])
        .args(["-frames:v", "1"])
        .args(["-q:v", "2"])
        .args(["-y", thumbnail])
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = cmd
        .output()
        .context("failed to spawn ffmpeg; is it installed?")?;
    Ok(output.status.success())
}

/// Probe a recording's duration in whole seconds via ffprobe.
pub fn probe_duration(video: &Path) -> Result<i32> {
    let video_str = video.to_str().context("video path is not valid UTF-8")?;

    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(["-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(video_str)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to spawn ffprobe; is it installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe failed: {}", stderr.trim());
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(raw: &str) -> Result<i32> {
    let secs: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("unparseable ffprobe duration: {raw:?}"))?;
    Ok(secs.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12.48\n").unwrap(), 12);
        assert_eq!(parse_duration("0.51").unwrap(), 1);
        assert!(parse_duration("N/A").is_err());
    }

    #[test]
    fn test_recording_args_bound_duration() {
        let input = vec!["-f".to_string(), "x11grab".to_string()];
        let args = recording_args(&input, 30, "out.mp4");
        let t_pos = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t_pos + 1], "30");
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert!(args.contains(&"x11grab".to_string()));
    }
}

//! Kast capture client.
//!
//! Records the screen to a local MP4 and drives the same upload pipeline
//! a browser would: upload credentials from the API, direct PUTs to the
//! CDN for the video and thumbnail binaries, a metadata save, then a
//! fixed-interval poll until the CDN reports the video processed.
//!
//! ## Environment Variables
//! - `KAST_API_URL` - API base URL (default: `http://localhost:3000`)
//! - `KAST_API_TOKEN` - per-user API token from `POST /auth/token`

mod api;
mod recorder;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::info;

use crate::api::{ApiClient, SaveVideoRequest, content_type_for};

const API_BASE_ENV: &str = "KAST_API_URL";
const API_TOKEN_ENV: &str = "KAST_API_TOKEN";
const DEFAULT_API_BASE: &str = "http://localhost:3000";
const DEFAULT_RECORD_SECS: u64 = 30;

/// Matches the web player's status poll cadence
const POLL_INTERVAL_SECS: u64 = 3;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("record") => cmd_record(&args[1..]),
        Some("upload") => cmd_upload(&args[1..]),
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        "usage:\n  \
         kast record [--duration SECS] [--output FILE]\n  \
         kast upload --video FILE --title TITLE --description TEXT \
         [--thumbnail FILE] [--visibility public|private]"
    );
}

/// Pull the value following a `--flag` out of an argument list
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn cmd_record(args: &[String]) -> Result<()> {
    let duration: u64 = match flag_value(args, "--duration") {
        Some(raw) => raw.parse().context("--duration must be a whole number")?,
        None => DEFAULT_RECORD_SECS,
    };
    let output = PathBuf::from(flag_value(args, "--output").unwrap_or("recording.mp4"));

    recorder::record_screen(&output, duration)?;
    println!("recorded {}", output.display());
    println!("next: kast upload --video {} --title ... --description ...", output.display());
    Ok(())
}

fn cmd_upload(args: &[String]) -> Result<()> {
    let video = PathBuf::from(
        flag_value(args, "--video").context("--video is required")?,
    );
    let title = flag_value(args, "--title").context("--title is required")?;
    let description = flag_value(args, "--description").context("--description is required")?;
    let visibility = flag_value(args, "--visibility").unwrap_or("public");

    // Validate before any network call
    if title.trim().is_empty() || description.trim().is_empty() {
        bail!("title and description must not be empty");
    }
    if !matches!(visibility, "public" | "private") {
        bail!("--visibility must be public or private");
    }
    if !video.exists() {
        bail!("video file {} does not exist", video.display());
    }

    // A thumbnail is required by the upload contract; extract one from the
    // recording when none is supplied
    let thumbnail = match flag_value(args, "--thumbnail") {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.exists() {
                bail!("thumbnail file {} does not exist", path.display());
            }
            path
        }
        None => {
            let generated = video.with_extension("jpg");
            recorder::extract_thumbnail(&video, &generated)?;
            info!("extracted thumbnail {}", generated.display());
            generated
        }
    };

    let duration = recorder::probe_duration(&video).unwrap_or_else(|e| {
        log::warn!("could not probe duration ({e}); storing 0");
        0
    });

    let base_url = env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let token = env::var(API_TOKEN_ENV)
        .with_context(|| format!("{API_TOKEN_ENV} must be set (see POST /auth/token)"))?;
    let client = ApiClient::new(base_url, token)?;

    // 1. CDN container + upload credentials
    let creds = client.upload_credentials()?;
    info!("created video container {}", creds.video_id);

    // 2. video binary straight to the CDN
    client.put_cdn_object(
        &creds.upload_url,
        &creds.access_key,
        content_type_for(&video),
        &video,
    )?;
    info!("uploaded video binary");

    // 3. thumbnail credentials for a derived object key
    let thumb_creds = client.thumbnail_credentials(&creds.video_id)?;

    // 4. thumbnail binary straight to the CDN
    client.put_cdn_object(
        &thumb_creds.upload_url,
        &thumb_creds.access_key,
        content_type_for(&thumbnail),
        &thumbnail,
    )?;
    info!("uploaded thumbnail binary");

    // 5. metadata row referencing both assets
    client.save_video(&SaveVideoRequest {
        video_id: creds.video_id.clone(),
        title: title.to_string(),
        description: description.to_string(),
        thumbnail_url: thumb_creds.cdn_url,
        visibility: visibility.to_string(),
        duration,
    })?;
    println!("saved video {}", creds.video_id);

    // Poll until the CDN reports the terminal "processed" status
    loop {
        let status = client.processing_status(&creds.video_id)?;
        if status.is_processed {
            println!("processing complete");
            break;
        }
        info!(
            "status {}, encoding {}%",
            status.status, status.encoding_progress
        );
        thread::sleep(Duration::from_secs(POLL_INTERVAL_SECS));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value() {
        let args: Vec<String> = ["--title", "Demo", "--duration", "12"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(flag_value(&args, "--title"), Some("Demo"));
        assert_eq!(flag_value(&args, "--duration"), Some("12"));
        assert_eq!(flag_value(&args, "--missing"), None);
    }
}

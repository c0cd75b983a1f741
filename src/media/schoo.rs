//! Schoo lecture video source.

use super::{run_tool, MediaFetcher};
use crate::config::SourceSettings;
use crate::error::{Result, YoyakuError};
use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, instrument};
use url::Url;

static CLASS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?schoo\.jp/class/(\d+)/room").expect("valid class URL pattern")
});

/// Extract the video id from a class URL or a bare numeric id.
pub fn parse_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Some(input.to_string());
    }

    CLASS_URL
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Downloads the HLS stream of a class into a single mp4.
#[derive(Debug, Clone)]
pub struct SchooFetcher {
    video_base_url: Url,
    season: String,
}

impl SchooFetcher {
    pub fn new(settings: &SourceSettings) -> Result<Self> {
        let mut base = settings.video_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let video_base_url = Url::parse(&base).map_err(|e| {
            YoyakuError::Config(format!("invalid video_base_url '{base}': {e}"))
        })?;

        Ok(Self {
            video_base_url,
            season: settings.season.clone(),
        })
    }

    /// Playlist URL: `<video_base_url><season>/<id>.m3u8`.
    pub fn m3u8_link(&self, video_id: &str) -> Result<Url> {
        self.video_base_url
            .join(&format!("{}/{}.m3u8", self.season, video_id))
            .map_err(|e| YoyakuError::MediaFetch(format!("cannot build playlist URL: {e}")))
    }
}

#[async_trait]
impl MediaFetcher for SchooFetcher {
    #[instrument(skip(self, output), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &str, output: &Path) -> Result<()> {
        let link = self.m3u8_link(video_id)?;
        info!("Downloading {} to {}", link, output.display());

        let mut args: Vec<&OsStr> = [
            "-nostdin",
            "-loglevel",
            "error",
            "-y",
            "-i",
            link.as_str(),
            "-bsf:a",
            "aac_adtstoasc",
            "-c",
            "copy",
        ]
        .into_iter()
        .map(OsStr::new)
        .collect();
        args.push(output.as_os_str());

        run_tool("ffmpeg", args).await?;
        Ok(())
    }
}

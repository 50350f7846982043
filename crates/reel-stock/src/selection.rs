//! Acceptance filter and rendition preference.

use reel_models::CandidateClip;

use crate::client::{ProviderVideo, Rendition};

/// Minimum width for a preferred HD rendition.
const HD_MIN_WIDTH: u32 = 720;
/// Minimum width for a usable fallback rendition.
const FALLBACK_MIN_WIDTH: u32 = 480;

/// Pick the rendition to download.
///
/// Preference: the first `hd` file at least 720 wide, then the first file at
/// least 480 wide, then the first file of any size.
pub fn select_rendition(files: &[Rendition]) -> Option<&Rendition> {
    let width = |r: &Rendition| r.width.unwrap_or(0);

    files
        .iter()
        .find(|r| r.quality.as_deref() == Some("hd") && width(r) >= HD_MIN_WIDTH)
        .or_else(|| files.iter().find(|r| width(r) >= FALLBACK_MIN_WIDTH))
        .or_else(|| files.first())
}

/// Turn a search result into a candidate, or reject it.
///
/// Landscape videos and videos without any rendition are rejected.
pub fn accept_video(video: &ProviderVideo) -> Option<CandidateClip> {
    if video.height < video.width {
        return None;
    }

    let rendition = select_rendition(&video.video_files)?;
    Some(CandidateClip {
        remote_url: rendition.link.clone(),
        reported_duration_secs: video.duration,
        width: video.width,
        height: video.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendition(quality: Option<&str>, width: Option<u32>, link: &str) -> Rendition {
        Rendition {
            quality: quality.map(str::to_string),
            width,
            height: width.map(|w| w * 16 / 9),
            link: link.to_string(),
        }
    }

    fn video(width: u32, height: u32, files: Vec<Rendition>) -> ProviderVideo {
        ProviderVideo {
            width,
            height,
            duration: 10.0,
            video_files: files,
        }
    }

    #[test]
    fn test_hd_preferred_over_wider_sd() {
        let files = vec![
            rendition(Some("sd"), Some(540), "sd"),
            rendition(Some("hd"), Some(720), "hd"),
            rendition(Some("uhd"), Some(2160), "uhd"),
        ];
        assert_eq!(select_rendition(&files).unwrap().link, "hd");
    }

    #[test]
    fn test_narrow_hd_is_not_preferred() {
        let files = vec![
            rendition(Some("hd"), Some(640), "narrow-hd"),
            rendition(Some("sd"), Some(480), "sd-480"),
        ];
        assert_eq!(select_rendition(&files).unwrap().link, "sd-480");
    }

    #[test]
    fn test_falls_back_to_first() {
        let files = vec![
            rendition(None, None, "first"),
            rendition(Some("sd"), Some(360), "second"),
        ];
        assert_eq!(select_rendition(&files).unwrap().link, "first");
        assert!(select_rendition(&[]).is_none());
    }

    #[test]
    fn test_landscape_rejected() {
        let v = video(1920, 1080, vec![rendition(Some("hd"), Some(1920), "x")]);
        assert!(accept_video(&v).is_none());
    }

    #[test]
    fn test_portrait_and_square_accepted() {
        let portrait = video(1080, 1920, vec![rendition(Some("hd"), Some(1080), "p")]);
        let clip = accept_video(&portrait).unwrap();
        assert_eq!(clip.remote_url, "p");
        assert_eq!(clip.reported_duration_secs, 10.0);
        assert!(clip.is_portrait());

        let square = video(1080, 1080, vec![rendition(None, Some(1080), "s")]);
        assert!(accept_video(&square).is_some());
    }

    #[test]
    fn test_video_without_renditions_rejected() {
        assert!(accept_video(&video(1080, 1920, vec![])).is_none());
    }
}

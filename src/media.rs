//! Upload intake: what kind of file this is and whether the backend will take it.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use image::ImageFormat;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const MB: u64 = 1024 * 1024;
/// Ceiling for the mixed image/video extraction upload.
pub const MAX_MEDIA_BYTES: u64 = 50 * MB;
/// Ceiling for the image-only transforms (posterize, line art, blend).
pub const MAX_IMAGE_BYTES: u64 = 10 * MB;

const VIDEO_TYPES: [(&str, &str); 6] = [
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("Please upload an image or video file")]
    UnsupportedType,
    #[error("Please upload an image file")]
    NotAnImage,
    #[error("File too large. Maximum size is {}MB", .limit / MB)]
    TooLarge { size: u64, limit: u64 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// A local file accepted for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub mime: &'static str,
    pub size: u64,
}

impl MediaAsset {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string())
    }
}

/// MIME type guessed from the file extension, if it is an image or video.
pub fn mime_for(path: &Path) -> Option<&'static str> {
    if let Ok(format) = ImageFormat::from_path(path) {
        let mime = format.to_mime_type();
        if mime.starts_with("image/") {
            return Some(mime);
        }
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    VIDEO_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Accept an image or video up to 50MB.
pub fn inspect(path: &Path) -> Result<MediaAsset, MediaError> {
    let asset = classify(path)?;
    check_size(&asset, MAX_MEDIA_BYTES)?;
    debug!(path = %path.display(), mime = asset.mime, size = asset.size, "accepted media");
    Ok(asset)
}

/// Accept an image up to 10MB.
pub fn inspect_image(path: &Path) -> Result<MediaAsset, MediaError> {
    let asset = match classify(path) {
        Ok(asset) => asset,
        Err(MediaError::UnsupportedType) => return Err(MediaError::NotAnImage),
        Err(e) => return Err(e),
    };
    if asset.kind != MediaKind::Image {
        return Err(MediaError::NotAnImage);
    }
    check_size(&asset, MAX_IMAGE_BYTES)?;
    Ok(asset)
}

fn classify(path: &Path) -> Result<MediaAsset, MediaError> {
    let meta = std::fs::metadata(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            MediaError::NotFound(path.to_path_buf())
        } else {
            MediaError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let mime = mime_for(path).ok_or(MediaError::UnsupportedType)?;
    let kind = if mime.starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    Ok(MediaAsset {
        path: path.to_path_buf(),
        kind,
        mime,
        size: meta.len(),
    })
}

fn check_size(asset: &MediaAsset, limit: u64) -> Result<(), MediaError> {
    if asset.size > limit {
        return Err(MediaError::TooLarge {
            size: asset.size,
            limit,
        });
    }
    Ok(())
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: String,
}

/// Read a video's duration in seconds with `ffprobe`.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .arg(path)
        .output()
        .context("failed to run ffprobe; pass --duration to skip probing")?;
    if !output.status.success() {
        bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    parse_probe(&output.stdout)
        .with_context(|| format!("unreadable ffprobe output for {}", path.display()))
}

fn parse_probe(stdout: &[u8]) -> Result<f64> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    let duration: f64 = probe.format.duration.trim().parse()?;
    if !duration.is_finite() || duration < 0.0 {
        bail!("invalid duration {duration}");
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn sized_file(dir: &Path, name: &str, size: u64) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap().set_len(size).unwrap();
        path
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for(Path::new("a.png")), Some("image/png"));
        assert_eq!(mime_for(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for(Path::new("clip.MP4")), Some("video/mp4"));
        assert_eq!(mime_for(Path::new("clip.webm")), Some("video/webm"));
        assert_eq!(mime_for(Path::new("notes.txt")), None);
        assert_eq!(mime_for(Path::new("noext")), None);
    }

    #[test]
    fn inspect_classifies_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let img = inspect(&sized_file(dir.path(), "a.png", 10)).unwrap();
        assert_eq!(img.kind, MediaKind::Image);
        assert_eq!(img.size, 10);
        let vid = inspect(&sized_file(dir.path(), "b.mov", 10)).unwrap();
        assert!(vid.is_video());
        assert_eq!(vid.mime, "video/quicktime");
        assert_eq!(vid.file_name(), "b.mov");
    }

    #[test]
    fn inspect_enforces_fifty_megabytes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect(&sized_file(dir.path(), "ok.mp4", MAX_MEDIA_BYTES)).is_ok());
        let err = inspect(&sized_file(dir.path(), "big.mp4", MAX_MEDIA_BYTES + 1)).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 50MB");
    }

    #[test]
    fn inspect_image_enforces_ten_megabytes_and_images_only() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect_image(&sized_file(dir.path(), "big.png", MAX_IMAGE_BYTES + 1)).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 10MB");

        let err = inspect_image(&sized_file(dir.path(), "clip.mp4", 10)).unwrap_err();
        assert_eq!(err.to_string(), "Please upload an image file");

        let err = inspect_image(&sized_file(dir.path(), "doc.txt", 10)).unwrap_err();
        assert!(matches!(err, MediaError::NotAnImage));
    }

    #[test]
    fn unsupported_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect(&sized_file(dir.path(), "doc.txt", 1)).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType));

        let err = inspect(&dir.path().join("missing.png")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn parses_ffprobe_json() {
        let out = br#"{"format": {"duration": "12.480000"}}"#;
        assert!((parse_probe(out).unwrap() - 12.48).abs() < 1e-9);
        assert!(parse_probe(br#"{"format": {"duration": "N/A"}}"#).is_err());
        assert!(parse_probe(b"garbage").is_err());
    }
}

//! Building queue tracks from uploaded files
//!
//! Metadata extraction itself happens in the host (it needs the media engine
//! to read the duration). This module filters what the host hands over and
//! turns it into [`Track`]s.

use crate::types::Track;
use serde::{Deserialize, Serialize};

/// Artist shown for files without tag data
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const SUPPORTED_MIME_TYPES: [&str; 6] = [
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/ogg",
    "audio/aac",
    "audio/m4a",
];

const SUPPORTED_EXTENSIONS: [&str; 5] = ["mp3", "wav", "ogg", "aac", "m4a"];

/// What the host learned about an uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetadata {
    /// File name as uploaded, extension included
    pub name: String,

    /// Duration in seconds; NaN or 0 when the host couldn't read it
    pub duration: f64,

    /// File size in bytes
    pub size: u64,

    /// MIME type reported by the host (may be empty)
    #[serde(rename = "type")]
    pub mime_type: String,

    /// Playable locator (object URL)
    pub url: String,
}

/// Whether a file looks like audio the player can handle
pub fn is_supported_audio_file(name: &str, mime_type: &str) -> bool {
    if SUPPORTED_MIME_TYPES.contains(&mime_type) {
        return true;
    }
    extension(name)
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// File name without its final extension
pub fn display_title(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains('/') => stem,
        _ => name,
    }
}

fn extension(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && !ext.contains('/'))
}

impl TrackMetadata {
    /// Convert into a queue track with the given id
    pub fn into_track(self, id: impl Into<String>) -> Track {
        let duration = if self.duration.is_finite() && self.duration > 0.0 {
            self.duration
        } else {
            0.0
        };
        let title = display_title(&self.name).to_string();
        Track::new(id, title, UNKNOWN_ARTIST, duration, self.url)
    }
}

/// Build a playlist from uploaded files, skipping anything unsupported
///
/// Ids are `track-{position}-{stamp}`; pass a timestamp so ids stay unique
/// across uploads.
pub fn tracks_from_metadata(files: Vec<TrackMetadata>, stamp: u64) -> Vec<Track> {
    let total = files.len();
    let tracks: Vec<Track> = files
        .into_iter()
        .filter(|file| is_supported_audio_file(&file.name, &file.mime_type))
        .enumerate()
        .map(|(i, file)| file.into_track(format!("track-{}-{}", i, stamp)))
        .collect();

    if tracks.len() < total {
        tracing::info!(
            "Skipped {} unsupported file(s) out of {}",
            total - tracks.len(),
            total
        );
    }
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str) -> TrackMetadata {
        TrackMetadata {
            name: name.to_string(),
            duration: 200.0,
            size: 4_000_000,
            mime_type: mime.to_string(),
            url: format!("blob:{}", name),
        }
    }

    #[test]
    fn supported_by_mime_or_extension() {
        assert!(is_supported_audio_file("song", "audio/mpeg"));
        assert!(is_supported_audio_file("song.MP3", ""));
        assert!(is_supported_audio_file("take.m4a", "application/octet-stream"));
        assert!(!is_supported_audio_file("cover.jpg", "image/jpeg"));
        assert!(!is_supported_audio_file("notes", ""));
    }

    #[test]
    fn title_drops_extension() {
        assert_eq!(display_title("Midnight Dreams.mp3"), "Midnight Dreams");
        assert_eq!(display_title("archive.tar.gz"), "archive.tar");
        assert_eq!(display_title("no-extension"), "no-extension");
    }

    #[test]
    fn metadata_into_track() {
        let track = file("Neon Lights.ogg", "audio/ogg").into_track("t1");
        assert_eq!(track.id, "t1");
        assert_eq!(track.title, "Neon Lights");
        assert_eq!(track.artist, UNKNOWN_ARTIST);
        assert_eq!(track.duration_secs, 200.0);
        assert_eq!(track.source, "blob:Neon Lights.ogg");
        assert!(track.validate().is_ok());
    }

    #[test]
    fn unreadable_duration_becomes_zero() {
        let mut meta = file("a.wav", "audio/wav");
        meta.duration = f64::NAN;
        assert_eq!(meta.into_track("x").duration_secs, 0.0);
    }

    #[test]
    fn playlist_skips_unsupported_files() {
        let files = vec![
            file("one.mp3", "audio/mpeg"),
            file("cover.png", "image/png"),
            file("two.wav", "audio/wav"),
        ];
        let tracks = tracks_from_metadata(files, 1700);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "track-0-1700");
        assert_eq!(tracks[1].id, "track-1-1700");
        assert_eq!(tracks[1].title, "two");
    }

    #[test]
    fn metadata_deserializes_from_host_json() {
        let meta: TrackMetadata = serde_json::from_str(
            r#"{"name":"x.mp3","duration":12.5,"size":10,"type":"audio/mpeg","url":"blob:x"}"#,
        )
        .unwrap();
        assert_eq!(meta.mime_type, "audio/mpeg");
    }
}

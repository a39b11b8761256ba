//! Tag reader backed by lofty (ID3, Vorbis comments, MP4 atoms, APE, ...)

use std::path::Path;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;

use super::tags::Tags;
use crate::scanner::{CatalogItem, TagReader};

/// Reads embedded tags from the file at a catalog item's path.
///
/// Decoding runs on the blocking pool so a slow disk does not stall the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }

    /// Synchronously read the tags of one file.
    pub fn read_path(path: &Path) -> Result<Tags> {
        let tagged_file = Probe::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .read()
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let duration = tagged_file.properties().duration();
        let duration_ms = (!duration.is_zero())
            .then(|| u64::try_from(duration.as_millis()).ok())
            .flatten();

        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            bail!("No tags found in {}", path.display());
        };

        Ok(Tags {
            title: non_empty(tag.title().map(|s| s.to_string())),
            artist: non_empty(tag.artist().map(|s| s.to_string())),
            album: non_empty(tag.album().map(|s| s.to_string())),
            album_artist: non_empty(tag.get_string(&ItemKey::AlbumArtist).map(str::to_string)),
            genres: tag
                .genre()
                .map(|g| Tags::split_genres(&g))
                .unwrap_or_default(),
            year: tag.year(),
            track_number: tag.track(),
            disc_number: tag.disk(),
            duration_ms,
            lyrics: non_empty(tag.get_string(&ItemKey::Lyrics).map(str::to_string)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl TagReader for LoftyTagReader {
    async fn read_tags(&self, item: &CatalogItem) -> Result<Tags> {
        let path = item.path.clone();
        tokio::task::spawn_blocking(move || Self::read_path(&path))
            .await
            .context("Tag reader task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use lofty::config::WriteOptions;
    use lofty::tag::{Tag, TagType};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    /// Untagged FLAC stream: one second of 16-bit stereo at 44.1 kHz, no frames.
    fn write_bare_flac(path: &Path) {
        let mut bytes = b"fLaC".to_vec();
        // STREAMINFO, not the last block
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x22]);
        bytes.extend_from_slice(&4096u16.to_be_bytes());
        bytes.extend_from_slice(&4096u16.to_be_bytes());
        bytes.extend_from_slice(&[0; 6]);
        let packed: u64 = (44_100u64 << 44) | (1 << 41) | (15 << 36) | 44_100;
        bytes.extend_from_slice(&packed.to_be_bytes());
        bytes.extend_from_slice(&[0; 16]);
        // Trailing PADDING block
        bytes.extend_from_slice(&[0x81, 0x00, 0x00, 0x10]);
        bytes.extend_from_slice(&[0; 16]);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  Title ".to_string())), Some("Title".to_string()));
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let item = CatalogItem::new(Uuid::new_v4(), dir.path().join("missing.mp3"));

        let err = LoftyTagReader::new().read_tags(&item).await.unwrap_err();
        assert!(err.to_string().contains("missing.mp3"));
    }

    #[tokio::test]
    async fn test_unrecognised_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"definitely not audio").unwrap();

        let item = CatalogItem::new(Uuid::new_v4(), &path);
        assert!(LoftyTagReader::new().read_tags(&item).await.is_err());
    }

    #[tokio::test]
    async fn test_reads_vorbis_comments_from_flac() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roygbiv.flac");
        write_bare_flac(&path);

        let mut tag = Tag::new(TagType::VorbisComments);
        tag.set_title(" Roygbiv ".to_string());
        tag.set_artist("Boards of Canada".to_string());
        tag.set_album("Music Has the Right to Children".to_string());
        tag.insert_text(ItemKey::AlbumArtist, "Boards of Canada".to_string());
        tag.set_genre("Electronic;Ambient;electronic".to_string());
        tag.insert_text(ItemKey::RecordingDate, "1998".to_string());
        tag.set_track(12);
        tag.set_disk(1);
        tag.insert_text(ItemKey::Lyrics, "instrumental".to_string());
        tag.save_to_path(&path, WriteOptions::default()).unwrap();

        let item = CatalogItem::new(Uuid::new_v4(), &path);
        let tags = LoftyTagReader::new().read_tags(&item).await.unwrap();

        assert_eq!(
            tags,
            Tags {
                title: Some("Roygbiv".to_string()),
                artist: Some("Boards of Canada".to_string()),
                album: Some("Music Has the Right to Children".to_string()),
                album_artist: Some("Boards of Canada".to_string()),
                genres: vec!["Electronic".to_string(), "Ambient".to_string()],
                year: Some(1998),
                track_number: Some(12),
                disc_number: Some(1),
                duration_ms: Some(1000),
                lyrics: Some("instrumental".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_untagged_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.flac");
        write_bare_flac(&path);

        let item = CatalogItem::new(Uuid::new_v4(), &path);
        let err = LoftyTagReader::new().read_tags(&item).await.unwrap_err();
        assert!(err.to_string().contains("No tags found"));
    }
}

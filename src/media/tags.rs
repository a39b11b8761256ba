//! Embedded tag payload read from a media file

use serde::{Deserialize, Serialize};

/// Metadata fields read from a file's embedded tags (ID3/Vorbis/MP4/etc).
///
/// The scanner never looks inside this value; it is handed as a whole to the
/// catalog, which decides what differs from the stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genres: Vec<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub duration_ms: Option<u64>,
    pub lyrics: Option<String>,
}

impl Tags {
    /// Split a raw genre tag on the separators taggers commonly use
    /// (`;`, `/`, `\0`) and drop empty entries and duplicates.
    pub fn split_genres(raw: &str) -> Vec<String> {
        let mut genres: Vec<String> = Vec::new();
        for part in raw.split([';', '/', '\0']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if !genres.iter().any(|g| g.eq_ignore_ascii_case(part)) {
                genres.push(part.to_string());
            }
        }
        genres
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_genres() {
        assert_eq!(
            Tags::split_genres("Rock; Alternative/rock\0Indie"),
            vec!["Rock", "Alternative", "Indie"]
        );
    }

    #[test]
    fn test_split_genres_empty() {
        assert!(Tags::split_genres(" ; / ").is_empty());
    }
}

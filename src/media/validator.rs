//! Declared content type vs. magic signature validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media types accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
}

impl MediaType {
    pub const ALL: [MediaType; 5] = [
        MediaType::Jpeg,
        MediaType::Png,
        MediaType::Gif,
        MediaType::Bmp,
        MediaType::Webp,
    ];

    /// MIME string as stored and served
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Bmp => "image/bmp",
            MediaType::Webp => "image/webp",
        }
    }

    /// Leading bytes every payload of this type must start with.
    ///
    /// WEBP only checks the generic `RIFF` container prefix, so other RIFF
    /// formats (WAVE, AVI) declared as `image/webp` are accepted too.
    pub fn signature(&self) -> &'static [u8] {
        match self {
            MediaType::Jpeg => &[0xFF, 0xD8],
            MediaType::Png => &[0x89, 0x50, 0x4E, 0x47],
            MediaType::Gif => &[0x47, 0x49, 0x46],
            MediaType::Bmp => &[0x42, 0x4D],
            MediaType::Webp => &[0x52, 0x49, 0x46, 0x46],
        }
    }

    /// Whether `data` starts with this type's signature; short input never matches
    pub fn matches(&self, data: &[u8]) -> bool {
        data.starts_with(self.signature())
    }

    /// Guess the media type from content alone
    pub fn sniff(data: &[u8]) -> Option<MediaType> {
        Self::ALL.into_iter().find(|t| t.matches(data))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for MediaType {
    type Err = String;

    /// Exact match against the allow-list; no case folding or parameters
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.mime() == s)
            .ok_or_else(|| format!("Unsupported media type: {}", s))
    }
}

/// Accept `data` only if `declared_type` is allow-listed and the bytes carry its signature
pub fn validate(declared_type: &str, data: &[u8]) -> bool {
    match declared_type.parse::<MediaType>() {
        Ok(media_type) => media_type.matches(data),
        Err(_) => false,
    }
}

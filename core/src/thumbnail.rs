//! URL helpers for uploaded images.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailMode {
    #[default]
    Crop,
    Resize,
}

impl ThumbnailMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailMode::Crop => "crop",
            ThumbnailMode::Resize => "resize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub mode: ThumbnailMode,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            width: 120,
            height: 120,
            quality: 80,
            mode: ThumbnailMode::Crop,
        }
    }
}

/// URL of the backend's thumbnail script for an uploaded image.
///
/// `source` is either the file URL or a file record with a `url` field.
/// Only the part from `/files/` on is passed to the script, relative to
/// `home_url`. Returns an empty string when there is nothing to resize.
pub fn thumbnail_url(home_url: &str, source: &Value, options: &ThumbnailOptions) -> String {
    let url = match source {
        Value::String(url) => url.as_str(),
        Value::Object(file) => match file.get("url") {
            Some(Value::String(url)) => url.as_str(),
            _ => return String::new(),
        },
        _ => return String::new(),
    };
    let Some(start) = url.find("/files/") else {
        return String::new();
    };
    format!(
        "{home_url}etc/thumbnail/?src=../..{}&width={}&height={}&quality={}&mode={}",
        &url[start..],
        options.width,
        options.height,
        options.quality,
        options.mode.as_str()
    )
}

/// URL of the `n`th file attached to a post, if there is one.
pub fn post_photo_url(post: &Value, n: usize) -> Option<String> {
    post.get("files")?
        .get(n)?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

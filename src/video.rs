//! YouTube link parsing for thumbnails and frame previews.

use std::sync::OnceLock;

use regex::Regex;

const VIDEO_ID_LEN: usize = 11;
const VIDEO_ID_PATTERN: &str =
    r"^.*((youtu\.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*";

fn video_id_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(VIDEO_ID_PATTERN) {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::error!(?err, "invalid video id pattern");
                None
            }
        })
        .as_ref()
}

/// Returns the 11-character video id of a YouTube link, if any.
pub fn extract_video_id(url: &str) -> Option<String> {
    let captures = video_id_regex()?.captures(url)?;
    let id = captures.get(7)?.as_str();
    (id.len() == VIDEO_ID_LEN).then(|| id.to_string())
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg")
}

//! Preview surface content and frame-request bookkeeping.

use image::GenericImageView;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("frame image is empty")]
    EmptyFrame,
    #[error("failed to decode frame image: {0}")]
    Decode(#[from] image::ImageError),
}

/// A decoded single-frame preview returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameImage {
    pub fn decode(bytes: Vec<u8>) -> Result<Self, PreviewError> {
        if bytes.is_empty() {
            return Err(PreviewError::EmptyFrame);
        }
        let (width, height) = image::load_from_memory(&bytes)?.dimensions();
        Ok(Self {
            bytes,
            width,
            height,
        })
    }
}

/// What the preview surface currently shows behind the overlay box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PreviewSource {
    #[default]
    Empty,
    Thumbnail(String),
    Frame(FrameImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Latest-wins bookkeeping for overlapping frame fetches.
///
/// Requests are never cancelled; a response is applied only when its token
/// is still the most recently issued one.
#[derive(Debug, Default)]
pub struct FrameRequests {
    issued: u64,
    settled: Option<u64>,
}

impl FrameRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RequestToken {
        self.issued = self.issued.saturating_add(1);
        RequestToken(self.issued)
    }

    /// Settles a response and reports whether it may update the view.
    pub fn finish(&mut self, token: RequestToken) -> bool {
        if token.0 != self.issued {
            tracing::debug!(
                token = token.0,
                latest = self.issued,
                "dropping stale frame preview response"
            );
            return false;
        }
        self.settled = Some(token.0);
        true
    }

    pub fn latest(&self) -> Option<RequestToken> {
        (self.issued > 0).then_some(RequestToken(self.issued))
    }

    /// Whether the surface should be dimmed while the latest request is pending.
    pub fn loading(&self) -> bool {
        self.issued > 0 && self.settled != Some(self.issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encoding should succeed");
        bytes
    }

    #[test]
    fn decode_records_frame_size() {
        let frame = FrameImage::decode(png_bytes(16, 9)).expect("valid png should decode");
        assert_eq!((frame.width, frame.height), (16, 9));
    }

    #[test]
    fn decode_rejects_empty_and_garbage_payloads() {
        assert!(matches!(
            FrameImage::decode(Vec::new()),
            Err(PreviewError::EmptyFrame)
        ));
        assert!(matches!(
            FrameImage::decode(b"{\"error\":\"nope\"}".to_vec()),
            Err(PreviewError::Decode(_))
        ));
    }

    #[test]
    fn only_latest_response_is_applied() {
        let mut requests = FrameRequests::new();
        let first = requests.begin();
        let second = requests.begin();
        assert!(requests.loading());

        assert!(requests.finish(second));
        assert!(!requests.loading());
        assert!(!requests.finish(first));
        assert_eq!(requests.latest(), Some(second));
    }

    #[test]
    fn stale_response_keeps_loading_state_until_latest_arrives() {
        let mut requests = FrameRequests::new();
        assert!(!requests.loading());
        let first = requests.begin();
        let second = requests.begin();

        assert!(!requests.finish(first));
        assert!(requests.loading());
        assert!(requests.finish(second));
        assert!(!requests.loading());
    }
}

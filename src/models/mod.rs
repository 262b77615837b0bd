//! Data models for announcement extraction.

mod event;
mod image;

pub use event::{AnnouncementEvent, ExtractionResult, ImageFailure};
pub use image::RawImage;

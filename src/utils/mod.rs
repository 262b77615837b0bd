//! Shared utility functions.
//!
//! - `mime`: upload contract checks (type sniffing, size limit)

pub mod mime;

pub use mime::{validate_image, InputError, ALLOWED_IMAGE_TYPES, MAX_IMAGE_BYTES};

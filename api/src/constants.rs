//! Application constants

/// Number of videos per page in the library listing
pub const DEFAULT_PAGE_SIZE: i64 = 8;

/// Maximum page size a caller may request
pub const MAX_PAGE_SIZE: i64 = 50;

/// Storage folder that holds thumbnail objects
pub const THUMBNAIL_PREFIX: &str = "thumbnails";

/// Placeholder title used when a CDN video container is created,
/// replaced by the real title when metadata is saved
pub const PENDING_VIDEO_TITLE: &str = "Temporary Title";

//! Profile photo heuristic.
//!
//! A CV usually carries the author's photo near the top of the first page,
//! cropped in portrait orientation and stored at a moderate size. The test
//! below encodes exactly that and nothing more: it is a best-effort signal
//! and will both miss photos and accept logos that happen to fit.

/// The only page a profile photo may come from.
pub const PROFILE_PAGE: u32 = 1;

/// Exclusive lower bound on the encoded image size, in bytes.
pub const MIN_PROFILE_BYTES: usize = 5_000;

/// Exclusive upper bound on the encoded image size, in bytes.
pub const MAX_PROFILE_BYTES: usize = 500_000;

/// Whether an image qualifies as a profile photo candidate.
pub fn is_profile_candidate(page: u32, width: u32, height: u32, size: usize) -> bool {
    page == PROFILE_PAGE
        && height > width
        && size > MIN_PROFILE_BYTES
        && size < MAX_PROFILE_BYTES
}

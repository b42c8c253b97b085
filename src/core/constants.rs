//! Tunables shared across modules.

use std::time::Duration;

/// Timeout applied to plain text turns.
pub const TEXT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout applied to turns that carry file uploads. Uploads are routed
/// through a slower multipart endpoint, so they get more headroom.
pub const UPLOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Interval between reveal ticks while an assistant reply is being typed out.
pub const REVEAL_TICK: Duration = Duration::from_millis(30);

/// Each reveal tick uncovers `remaining / REVEAL_DIVISOR` graphemes, so the
/// animation moves fast through long replies and eases out near the end.
pub const REVEAL_DIVISOR: usize = 24;

/// Lower bound on graphemes revealed per tick; keeps short tails from
/// crawling.
pub const REVEAL_MIN_STEP: usize = 1;

/// Upper bound on graphemes revealed per tick; keeps long replies from
/// appearing all at once.
pub const REVEAL_MAX_STEP: usize = 32;

/// Server truncates derived conversation titles to this many characters.
/// Mirrored locally so optimistic sidebar entries match what comes back.
pub const TITLE_MAX_CHARS: usize = 30;

/// Largest file accepted for upload, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Images larger than this edge length get downscaled before upload.
pub const MAX_IMAGE_EDGE: u32 = 2048;

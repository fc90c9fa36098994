//! Decoding of ICCCM client properties.

use crate::backend::WmHints;
use crate::client::SizeHints;

pub(crate) mod size_flags {
    pub const P_MIN_SIZE: u32 = 1 << 4;
    pub const P_MAX_SIZE: u32 = 1 << 5;
    pub const P_RESIZE_INC: u32 = 1 << 6;
    pub const P_ASPECT: u32 = 1 << 7;
    pub const P_BASE_SIZE: u32 = 1 << 8;
}

pub(crate) mod hint_flags {
    pub const INPUT: u32 = 1;
    pub const URGENCY: u32 = 1 << 8;
}

/// Word offsets into WM_NORMAL_HINTS.
mod offset {
    pub const FLAGS: usize = 0;
    pub const MIN_WIDTH: usize = 5;
    pub const MIN_HEIGHT: usize = 6;
    pub const MAX_WIDTH: usize = 7;
    pub const MAX_HEIGHT: usize = 8;
    pub const WIDTH_INC: usize = 9;
    pub const HEIGHT_INC: usize = 10;
    pub const MIN_ASPECT_X: usize = 11;
    pub const MIN_ASPECT_Y: usize = 12;
    pub const MAX_ASPECT_X: usize = 13;
    pub const MAX_ASPECT_Y: usize = 14;
    pub const BASE_WIDTH: usize = 15;
    pub const BASE_HEIGHT: usize = 16;
}

pub const SIZE_HINTS_WORDS: u32 = 18;

/// Decodes WM_NORMAL_HINTS. Missing base size falls back to the minimum and
/// vice versa.
pub fn parse_size_hints(words: &[u32]) -> SizeHints {
    use offset::*;
    use size_flags::*;

    let read = |index: usize| words.get(index).copied().unwrap_or(0) as i32;
    let flags = words.get(FLAGS).copied().unwrap_or(0);
    let mut hints = SizeHints::default();

    if flags & P_BASE_SIZE != 0 {
        hints.base_width = read(BASE_WIDTH);
        hints.base_height = read(BASE_HEIGHT);
    } else if flags & P_MIN_SIZE != 0 {
        hints.base_width = read(MIN_WIDTH);
        hints.base_height = read(MIN_HEIGHT);
    }

    if flags & P_RESIZE_INC != 0 {
        hints.increment_width = read(WIDTH_INC);
        hints.increment_height = read(HEIGHT_INC);
    }

    if flags & P_MAX_SIZE != 0 {
        hints.max_width = read(MAX_WIDTH);
        hints.max_height = read(MAX_HEIGHT);
    }

    if flags & P_MIN_SIZE != 0 {
        hints.min_width = read(MIN_WIDTH);
        hints.min_height = read(MIN_HEIGHT);
    } else if flags & P_BASE_SIZE != 0 {
        hints.min_width = read(BASE_WIDTH);
        hints.min_height = read(BASE_HEIGHT);
    }

    if flags & P_ASPECT != 0 {
        hints.min_aspect = read(MIN_ASPECT_Y) as f32 / (read(MIN_ASPECT_X) as f32).max(1.0);
        hints.max_aspect = read(MAX_ASPECT_X) as f32 / (read(MAX_ASPECT_Y) as f32).max(1.0);
    }

    hints
}

pub fn parse_wm_hints(words: &[u32]) -> Option<WmHints> {
    let flags = *words.first()?;
    let input = (flags & hint_flags::INPUT != 0)
        .then(|| words.get(1).map(|&input| input != 0))
        .flatten();
    Some(WmHints {
        urgent: flags & hint_flags::URGENCY != 0,
        input,
    })
}

/// WM_CLASS holds `instance\0class\0`. Returns `(class, instance)`.
pub fn parse_class(bytes: &[u8]) -> (String, String) {
    let mut parts = bytes
        .split(|&byte| byte == 0)
        .map(|part| String::from_utf8_lossy(part).into_owned());
    let instance = parts.next().unwrap_or_default();
    let class = parts.next().unwrap_or_default();
    (class, instance)
}

//! Hints Module
//!
//! Window hints (WM_NORMAL_HINTS / WM_HINTS) and the geometry constraint
//! engine that turns a requested rectangle into one the client accepts.

use bitflags::bitflags;

use crate::shared::Geometry;

bitflags! {
    /// WM_SIZE_HINTS flags field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SizeHintFlags: u32 {
        const US_POSITION  = 1 << 0;
        const US_SIZE      = 1 << 1;
        const P_POSITION   = 1 << 2;
        const P_SIZE       = 1 << 3;
        const P_MIN_SIZE   = 1 << 4;
        const P_MAX_SIZE   = 1 << 5;
        const P_RESIZE_INC = 1 << 6;
        const P_ASPECT     = 1 << 7;
        const P_BASE_SIZE  = 1 << 8;
        const P_WIN_GRAVITY = 1 << 9;
    }
}

bitflags! {
    /// WM_HINTS flags field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmHintFlags: u32 {
        const INPUT         = 1 << 0;
        const STATE         = 1 << 1;
        const ICON_PIXMAP   = 1 << 2;
        const ICON_WINDOW   = 1 << 3;
        const ICON_POSITION = 1 << 4;
        const ICON_MASK     = 1 << 5;
        const WINDOW_GROUP  = 1 << 6;
        const URGENCY       = 1 << 8;
    }
}

/// Size hints (XSizeHints equivalent)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeHints {
    pub flags: SizeHintFlags,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub min_aspect_num: u32,
    pub min_aspect_den: u32,
    pub max_aspect_num: u32,
    pub max_aspect_den: u32,
    pub base_width: u32,
    pub base_height: u32,
    pub win_gravity: u8,
}

/// WM hints (XWMHints equivalent)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WmHints {
    pub flags: WmHintFlags,
    pub input: bool,
    pub initial_state: u32,
    pub icon_pixmap: Option<u32>,
    pub icon_window: Option<u32>,
    pub icon_x: i32,
    pub icon_y: i32,
    pub icon_mask: Option<u32>,
    pub window_group: Option<u32>,
}

fn nonzero(value: u32) -> Option<u32> {
    if value != 0 { Some(value) } else { None }
}

impl WmHints {
    /// Parse the 9-word WM_HINTS property payload.
    pub fn from_raw(values: &[u32]) -> Option<Self> {
        if values.len() < 9 {
            return None;
        }
        let flags = WmHintFlags::from_bits_truncate(values[0]);
        Some(Self {
            flags,
            input: (values[1] & 1) != 0,
            initial_state: values[2],
            icon_pixmap: nonzero(values[3]),
            icon_window: nonzero(values[4]),
            icon_x: values[5] as i32,
            icon_y: values[6] as i32,
            icon_mask: nonzero(values[7]),
            window_group: if flags.contains(WmHintFlags::WINDOW_GROUP) { nonzero(values[8]) } else { None },
        })
    }

    pub fn is_urgent(&self) -> bool {
        self.flags.contains(WmHintFlags::URGENCY)
    }

    /// False only when the client explicitly refuses keyboard input.
    pub fn accepts_input(&self) -> bool {
        !self.flags.contains(WmHintFlags::INPUT) || self.input
    }
}

/// Per-axis bounds derived from the hints.
#[derive(Debug, Clone, Copy)]
struct Axis {
    min: u32,
    max: u32,
    base: u32,
    inc: u32,
    aspect_base: u32,
}

impl Axis {
    /// Clamp into [min, max] and snap down onto the increment grid.
    /// Stays on `min` when no grid point fits inside the bounds.
    fn fit(&self, size: u32) -> u32 {
        let clamped = size.min(self.max).max(self.min);
        if self.inc <= 1 || clamped <= self.base {
            return clamped;
        }
        let down = self.base + ((clamped - self.base) / self.inc) * self.inc;
        if down >= self.min {
            return down;
        }
        match down.checked_add(self.inc) {
            Some(up) if up <= self.max => up,
            _ => clamped,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AspectRange {
    min_num: i128,
    min_den: i128,
    max_num: i128,
    max_den: i128,
}

impl AspectRange {
    fn too_narrow(&self, dx: i128, dy: i128) -> bool {
        dx * self.min_den < self.min_num * dy
    }

    fn too_wide(&self, dx: i128, dy: i128) -> bool {
        dx * self.max_den > self.max_num * dy
    }

    fn contains(&self, dx: i128, dy: i128) -> bool {
        dx > 0 && dy > 0 && !self.too_narrow(dx, dy) && !self.too_wide(dx, dy)
    }

    /// Move one dimension so the ratio falls in range. Height is tried
    /// first; width wins only when it moves the rectangle strictly less.
    fn adjust(&self, width: u32, height: u32, h: &Axis, v: &Axis) -> (u32, u32) {
        let dx = width as i128 - h.aspect_base as i128;
        let dy = height as i128 - v.aspect_base as i128;
        if dx <= 0 || dy <= 0 || self.contains(dx, dy) {
            return (width, height);
        }

        let (want_dy, want_dx) = if self.too_narrow(dx, dy) {
            (dx * self.min_den / self.min_num, ceil_div(dy * self.min_num, self.min_den))
        } else {
            (ceil_div(dx * self.max_den, self.max_num), dy * self.max_num / self.max_den)
        };

        let new_height = v.fit(to_size(v.aspect_base as i128 + want_dy));
        let new_width = h.fit(to_size(h.aspect_base as i128 + want_dx));

        let height_ok = self.contains(dx, new_height as i128 - v.aspect_base as i128);
        let width_ok = self.contains(new_width as i128 - h.aspect_base as i128, dy);
        let height_cost = new_height.abs_diff(height);
        let width_cost = new_width.abs_diff(width);

        match (height_ok, width_ok) {
            (true, true) if width_cost < height_cost => (new_width, height),
            (true, _) => (width, new_height),
            (false, true) => (new_width, height),
            (false, false) => (width, height),
        }
    }
}

fn ceil_div(num: i128, den: i128) -> i128 {
    (num + den - 1) / den
}

fn to_size(value: i128) -> u32 {
    value.clamp(0, u32::MAX as i128) as u32
}

impl SizeHints {
    /// Parse the 18-word WM_NORMAL_HINTS property payload.
    pub fn from_raw(values: &[u32]) -> Option<Self> {
        if values.len() < 18 {
            return None;
        }
        Some(Self {
            flags: SizeHintFlags::from_bits_truncate(values[0]),
            x: values[1] as i32,
            y: values[2] as i32,
            width: values[3],
            height: values[4],
            min_width: values[5],
            min_height: values[6],
            max_width: values[7],
            max_height: values[8],
            width_inc: values[9],
            height_inc: values[10],
            min_aspect_num: values[11],
            min_aspect_den: values[12],
            max_aspect_num: values[13],
            max_aspect_den: values[14],
            base_width: values[15],
            base_height: values[16],
            win_gravity: values[17] as u8,
        })
    }

    /// Min and max both present, non-zero, and equal on both axes.
    pub fn is_fixed(&self) -> bool {
        self.flags.contains(SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_MAX_SIZE)
            && self.max_width == self.min_width
            && self.max_height == self.min_height
            && self.max_width != 0
            && self.max_height != 0
    }

    fn axis(&self, min: u32, max: u32, base: u32, inc: u32) -> Axis {
        let has_min = self.flags.contains(SizeHintFlags::P_MIN_SIZE);
        let has_base = self.flags.contains(SizeHintFlags::P_BASE_SIZE);

        let base_size = if has_base { base } else if has_min { min } else { 0 };
        let min_size = (if has_min { min } else if has_base { base } else { 0 }).max(1);
        let max_size = if self.flags.contains(SizeHintFlags::P_MAX_SIZE) && max != 0 {
            max.max(min_size)
        } else {
            u32::MAX
        };
        let inc = if self.flags.contains(SizeHintFlags::P_RESIZE_INC) { inc } else { 0 };

        Axis {
            min: min_size,
            max: max_size,
            base: base_size,
            inc,
            aspect_base: if has_base { base } else { 0 },
        }
    }

    fn aspect(&self) -> Option<AspectRange> {
        if !self.flags.contains(SizeHintFlags::P_ASPECT) {
            return None;
        }
        let range = AspectRange {
            min_num: self.min_aspect_num as i128,
            min_den: self.min_aspect_den as i128,
            max_num: self.max_aspect_num as i128,
            max_den: self.max_aspect_den as i128,
        };
        if range.min_num > 0 && range.min_den > 0 && range.max_num > 0 && range.max_den > 0 {
            Some(range)
        } else {
            None
        }
    }

    /// Apply size hints to a requested geometry.
    ///
    /// Position is never touched. With `honor` off the request is returned
    /// as is. Applying the result a second time yields the same rectangle.
    pub fn apply(&self, honor: bool, requested: Geometry) -> Geometry {
        if !honor {
            return requested;
        }
        if self.is_fixed() {
            return requested.with_size(self.min_width, self.min_height);
        }

        let horizontal = self.axis(self.min_width, self.max_width, self.base_width, self.width_inc);
        let vertical = self.axis(self.min_height, self.max_height, self.base_height, self.height_inc);

        let mut width = horizontal.fit(requested.width);
        let mut height = vertical.fit(requested.height);

        if let Some(aspect) = self.aspect() {
            (width, height) = aspect.adjust(width, height, &horizontal, &vertical);
        }

        requested.with_size(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_max(min: (u32, u32), max: (u32, u32)) -> SizeHints {
        SizeHints {
            flags: SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_MAX_SIZE,
            min_width: min.0,
            min_height: min.1,
            max_width: max.0,
            max_height: max.1,
            ..Default::default()
        }
    }

    fn terminal_like() -> SizeHints {
        SizeHints {
            flags: SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_BASE_SIZE | SizeHintFlags::P_RESIZE_INC,
            min_width: 30,
            min_height: 20,
            base_width: 10,
            base_height: 4,
            width_inc: 7,
            height_inc: 13,
            ..Default::default()
        }
    }

    fn aspect_4_3() -> SizeHints {
        SizeHints {
            flags: SizeHintFlags::P_ASPECT | SizeHintFlags::P_MAX_SIZE,
            max_width: 1000,
            max_height: 1000,
            min_aspect_num: 4,
            min_aspect_den: 3,
            max_aspect_num: 4,
            max_aspect_den: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_honor_disabled_returns_request() {
        let hints = min_max((200, 200), (200, 200));
        let requested = Geometry::new(5, 6, 500, 7);
        assert_eq!(hints.apply(false, requested), requested);
    }

    #[test]
    fn test_fixed_size() {
        let hints = min_max((200, 200), (200, 200));
        assert!(hints.is_fixed());
        for (w, h) in [(500, 500), (1, 1), (200, 900)] {
            let out = hints.apply(true, Geometry::new(10, 20, w, h));
            assert_eq!(out, Geometry::new(10, 20, 200, 200));
        }
    }

    #[test]
    fn test_not_fixed_without_both_bounds() {
        let mut hints = min_max((200, 200), (200, 200));
        hints.flags.remove(SizeHintFlags::P_MAX_SIZE);
        assert!(!hints.is_fixed());
        assert!(!min_max((0, 0), (0, 0)).is_fixed());
    }

    #[test]
    fn test_min_max_clamp() {
        let hints = min_max((100, 50), (400, 300));
        assert_eq!(hints.apply(true, Geometry::new(0, 0, 10, 10)).width, 100);
        assert_eq!(hints.apply(true, Geometry::new(0, 0, 10, 10)).height, 50);
        let big = hints.apply(true, Geometry::new(0, 0, 1000, 1000));
        assert_eq!((big.width, big.height), (400, 300));
    }

    #[test]
    fn test_min_wins_over_smaller_max() {
        let hints = min_max((300, 300), (100, 100));
        let out = hints.apply(true, Geometry::new(0, 0, 50, 500));
        assert_eq!((out.width, out.height), (300, 300));
    }

    #[test]
    fn test_zero_request_never_degenerate() {
        let out = SizeHints::default().apply(true, Geometry::new(0, 0, 0, 0));
        assert_eq!((out.width, out.height), (1, 1));
    }

    #[test]
    fn test_increments_round_down_above_base() {
        let hints = terminal_like();
        let out = hints.apply(true, Geometry::new(0, 0, 100, 100));
        // 10 + 12 * 7 = 94, 4 + 7 * 13 = 95
        assert_eq!((out.width, out.height), (94, 95));
    }

    #[test]
    fn test_increments_respect_min() {
        let hints = terminal_like();
        // 31 sits on the width grid; 21 snaps to 17 (< min 20) so the next grid point wins
        let out = hints.apply(true, Geometry::new(0, 0, 31, 21));
        assert_eq!((out.width, out.height), (31, 30));
    }

    #[test]
    fn test_aspect_prefers_height() {
        let out = aspect_4_3().apply(true, Geometry::new(0, 0, 400, 400));
        assert_eq!((out.width, out.height), (400, 300));
    }

    #[test]
    fn test_aspect_too_wide() {
        let out = aspect_4_3().apply(true, Geometry::new(0, 0, 800, 300));
        assert_eq!((out.width, out.height), (800, 600));
    }

    #[test]
    fn test_aspect_falls_back_to_width_at_bound() {
        let mut hints = aspect_4_3();
        hints.max_height = 500;
        // Height would need 750, over the max, so width shrinks instead
        let out = hints.apply(true, Geometry::new(0, 0, 1000, 300));
        assert_eq!((out.width, out.height), (400, 300));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let hint_sets = [
            SizeHints::default(),
            min_max((200, 200), (200, 200)),
            min_max((100, 50), (400, 300)),
            min_max((300, 300), (100, 100)),
            terminal_like(),
            aspect_4_3(),
            SizeHints {
                flags: SizeHintFlags::P_ASPECT
                    | SizeHintFlags::P_BASE_SIZE
                    | SizeHintFlags::P_RESIZE_INC
                    | SizeHintFlags::P_MIN_SIZE,
                min_width: 40,
                min_height: 40,
                base_width: 8,
                base_height: 8,
                width_inc: 5,
                height_inc: 9,
                min_aspect_num: 1,
                min_aspect_den: 2,
                max_aspect_num: 2,
                max_aspect_den: 1,
                ..Default::default()
            },
        ];
        let sizes = [0, 1, 7, 31, 99, 100, 257, 640, 1001, 4000];
        for hints in &hint_sets {
            for &w in &sizes {
                for &h in &sizes {
                    let once = hints.apply(true, Geometry::new(3, 4, w, h));
                    let twice = hints.apply(true, once);
                    assert_eq!(once, twice, "hints {:?} request {}x{}", hints, w, h);
                }
            }
        }
    }

    #[test]
    fn test_parse_raw_size_hints() {
        let mut raw = [0u32; 18];
        raw[0] = (SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_MAX_SIZE).bits();
        raw[5] = 64;
        raw[6] = 48;
        raw[7] = 64;
        raw[8] = 48;
        let hints = SizeHints::from_raw(&raw).unwrap();
        assert!(hints.is_fixed());
        assert!(SizeHints::from_raw(&raw[..10]).is_none());
    }

    #[test]
    fn test_parse_raw_wm_hints() {
        let raw = [
            (WmHintFlags::INPUT | WmHintFlags::URGENCY | WmHintFlags::WINDOW_GROUP).bits(),
            0,
            1,
            0,
            0,
            0,
            0,
            0,
            0x400001,
        ];
        let hints = WmHints::from_raw(&raw).unwrap();
        assert!(hints.is_urgent());
        assert!(!hints.accepts_input());
        assert_eq!(hints.window_group, Some(0x400001));
    }
}

//! Icons Module
//!
//! Client icon payload, decoded from the _NET_WM_ICON property.

use tracing::debug;

/// Largest icon accepted, in pixels.
const MAX_ICON_PIXELS: usize = 1024 * 1024;

/// Icon data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconData {
    /// Icon width
    pub width: u32,
    /// Icon height
    pub height: u32,
    /// Icon pixels (ARGB32 format)
    pub pixels: Vec<u32>,
}

impl IconData {
    /// Decode a _NET_WM_ICON payload.
    ///
    /// The property is a sequence of `width, height, pixels...` entries, one
    /// per size. The largest complete entry is kept; a truncated trailing
    /// entry ends the scan.
    pub fn from_net_wm_icon(values: &[u32]) -> Option<Self> {
        let mut best: Option<&[u32]> = None;
        let mut best_dims = (0, 0);
        let mut rest = values;

        while let [width, height, tail @ ..] = rest {
            let Some(count) = (*width as usize).checked_mul(*height as usize) else {
                break;
            };
            if count == 0 || count > MAX_ICON_PIXELS || tail.len() < count {
                break;
            }
            if count > (best_dims.0 as usize) * (best_dims.1 as usize) {
                best = Some(&tail[..count]);
                best_dims = (*width, *height);
            }
            rest = &tail[count..];
        }

        let pixels = best?;
        debug!("Decoded icon {}x{}", best_dims.0, best_dims.1);
        Some(Self {
            width: best_dims.0,
            height: best_dims.1,
            pixels: pixels.to_vec(),
        })
    }
}

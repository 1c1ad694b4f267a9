//! Display mode extraction and selection
//!
//! Mode preference, given the capture geometry `width x height @ hz`:
//!
//! 1. exact `width x height` with matching refresh rate (wins immediately)
//! 2. any exact `width x height`
//! 3. matching width with a smaller height (1920x1080 for a 1920x1200
//!    source: show something rather than nothing)
//! 4. the connector's preferred mode
//! 5. the first mode
//!
//! Interlaced modes are never selected by rules 1-4.

use drm::control::{Mode, ModeFlags, ModeTypeFlags};

/// Owned snapshot of one connector mode
///
/// Keeps selection and refresh-rate math independent of a live DRM node.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMode {
    /// Horizontal display pixels
    pub width: u32,

    /// Vertical display pixels
    pub height: u32,

    /// Pixel clock in kHz
    pub clock_khz: u32,

    /// Total horizontal pixels including blanking
    pub htotal: u32,

    /// Total vertical lines including blanking
    pub vtotal: u32,

    /// Vertical scan multiplier (0 or 1 = none)
    pub vscan: u32,

    /// Interlaced mode
    pub interlace: bool,

    /// Double-scan mode
    pub dblscan: bool,

    /// Connector-preferred mode
    pub preferred: bool,
}

impl DisplayMode {
    /// Snapshot a kernel mode
    pub fn from_drm(mode: &Mode) -> Self {
        let (width, height) = mode.size();
        let (_, _, htotal) = mode.hsync();
        let (_, _, vtotal) = mode.vsync();
        Self {
            width: width as u32,
            height: height as u32,
            clock_khz: mode.clock(),
            htotal: htotal as u32,
            vtotal: vtotal as u32,
            vscan: mode.vscan() as u32,
            interlace: mode.flags().contains(ModeFlags::INTERLACE),
            dblscan: mode.flags().contains(ModeFlags::DBLSCAN),
            preferred: mode.mode_type().contains(ModeTypeFlags::PREFERRED),
        }
    }

    /// Refresh rate in Hz derived from the mode timings
    pub fn refresh_rate(&self) -> f32 {
        if self.htotal == 0 || self.vtotal == 0 {
            return 0.0;
        }
        let mut mhz = (self.clock_khz as i64 * 1_000_000 / self.htotal as i64
            + self.vtotal as i64 / 2)
            / self.vtotal as i64;
        if self.interlace {
            mhz *= 2;
        }
        if self.dblscan {
            mhz /= 2;
        }
        if self.vscan > 1 {
            mhz /= self.vscan as i64;
        }
        mhz as f32 / 1000.0
    }
}

/// Whether a capture geometry can be scanned out on the chosen mode
///
/// The width must match exactly and the capture must not be taller than
/// the mode's display height; anything else falls back to the stub path.
pub fn resolution_fits(capture_width: u32, capture_height: u32, mode: &DisplayMode) -> bool {
    capture_width == mode.width && capture_height <= mode.height
}

/// Pick the best mode index for the capture geometry
///
/// `width == 0` (stub open) skips the exact-match rules and lands on the
/// preferred mode. Returns `None` only for an empty mode list.
pub fn find_best_mode(modes: &[DisplayMode], width: u32, height: u32, hz: f32) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut closest: Option<usize> = None;
    let mut preferred: Option<usize> = None;

    for (index, mode) in modes.iter().enumerate() {
        if mode.interlace {
            continue;
        }
        let mode_hz = mode.refresh_rate();
        if mode.width == width && mode.height == height {
            best = Some(index);
            if hz > 0.0 && mode_hz == hz {
                return best; // Exact mode with the same frequency
            }
        }
        if mode.width == width && mode.height < height {
            let keep = match closest {
                Some(current) => modes[current].refresh_rate() != hz,
                None => true,
            };
            if keep {
                closest = Some(index);
            }
        }
        if preferred.is_none() && mode.preferred {
            preferred = Some(index);
        }
    }

    best.or(closest)
        .or(preferred)
        .or(if modes.is_empty() { None } else { Some(0) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(width: u32, height: u32, hz_approx: u32) -> DisplayMode {
        // Synthesize plausible CVT-ish timings producing ~hz_approx
        let htotal = width + width / 5;
        let vtotal = height + height / 20;
        let clock_khz = (htotal * vtotal * hz_approx) / 1000;
        DisplayMode {
            width,
            height,
            clock_khz,
            htotal,
            vtotal,
            vscan: 0,
            interlace: false,
            dblscan: false,
            preferred: false,
        }
    }

    #[test]
    fn test_refresh_rate_formula() {
        // 1920x1080p60 CEA timing: clock=148500 kHz, htotal=2200, vtotal=1125
        let mode = DisplayMode {
            width: 1920,
            height: 1080,
            clock_khz: 148_500,
            htotal: 2200,
            vtotal: 1125,
            vscan: 0,
            interlace: false,
            dblscan: false,
            preferred: false,
        };
        assert_eq!(mode.refresh_rate(), 60.0);

        // Interlace doubles, dblscan halves
        let interlaced = DisplayMode {
            interlace: true,
            ..mode.clone()
        };
        assert_eq!(interlaced.refresh_rate(), 120.0);
        let doubled = DisplayMode {
            dblscan: true,
            ..mode
        };
        assert_eq!(doubled.refresh_rate(), 30.0);
    }

    #[test]
    fn test_exact_match_with_rate_wins_immediately() {
        let modes = vec![
            mode(1920, 1080, 30),
            mode(1920, 1080, 60),
            mode(1280, 720, 60),
        ];
        let hz = modes[1].refresh_rate();
        assert_eq!(find_best_mode(&modes, 1920, 1080, hz), Some(1));
    }

    #[test]
    fn test_exact_resolution_beats_closest() {
        let modes = vec![mode(1920, 1080, 30), mode(1280, 720, 60)];
        // No rate match: any exact resolution wins
        assert_eq!(find_best_mode(&modes, 1920, 1080, 60.0), Some(0));
    }

    #[test]
    fn test_closest_smaller_height_for_oversized_source() {
        // 1920x1200 source on a display topping out at 1920x1080
        let modes = vec![mode(1280, 720, 60), mode(1920, 1080, 60)];
        assert_eq!(find_best_mode(&modes, 1920, 1200, 60.0), Some(1));
    }

    #[test]
    fn test_preferred_fallback() {
        let mut modes = vec![mode(1280, 720, 60), mode(1024, 768, 60)];
        modes[1].preferred = true;
        assert_eq!(find_best_mode(&modes, 3840, 2160, 60.0), Some(1));
    }

    #[test]
    fn test_first_mode_fallback_and_empty() {
        let modes = vec![mode(1280, 720, 60)];
        assert_eq!(find_best_mode(&modes, 3840, 2160, 60.0), Some(0));
        assert_eq!(find_best_mode(&[], 1920, 1080, 60.0), None);
    }

    #[test]
    fn test_resolution_fits() {
        let display = mode(1920, 1080, 60);

        // A 1920x1200 capture does not fit a display topping out at
        // 1920x1080: the open path must fall back to BAD_RESOLUTION
        assert!(!resolution_fits(1920, 1200, &display));

        // Exact geometry fits
        assert!(resolution_fits(1920, 1080, &display));

        // A shorter capture still scans out
        assert!(resolution_fits(1920, 720, &display));

        // Width mismatches never fit, larger or smaller
        assert!(!resolution_fits(1280, 720, &display));
        assert!(!resolution_fits(2560, 1080, &display));
    }

    #[test]
    fn test_interlaced_modes_are_skipped() {
        let mut modes = vec![mode(1920, 1080, 60), mode(1280, 720, 60)];
        modes[0].interlace = true;
        assert_eq!(find_best_mode(&modes, 1920, 1080, 60.0), Some(1));
    }
}

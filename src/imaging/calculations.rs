//! Pure calculation functions for variant dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Height that preserves the source aspect ratio at `target_width`.
///
/// `round(target_width * src_h / src_w)`, never less than one pixel.
/// Degenerate sources (zero width) yield a height of 1.
///
/// # Examples
/// ```
/// # use media_variants::imaging::scaled_height;
/// // 4000x3000 at 1024 wide → 768 high
/// assert_eq!(scaled_height((4000, 3000), 1024), 768);
/// ```
pub fn scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return 1;
    }
    let height = (target_width as f64 * src_h as f64 / src_w as f64).round() as u32;
    height.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_height() {
        // 2000x1500 at 1000 → 750
        assert_eq!(scaled_height((2000, 1500), 1000), 750);
    }

    #[test]
    fn portrait_height() {
        // 1500x2000 at 384 → 512
        assert_eq!(scaled_height((1500, 2000), 384), 512);
    }

    #[test]
    fn rounding_to_nearest() {
        // 300x200 at 256 → 170.67 → 171
        assert_eq!(scaled_height((300, 200), 256), 171);
        // 300x100 at 256 → 85.33 → 85
        assert_eq!(scaled_height((300, 100), 256), 85);
    }

    #[test]
    fn extreme_panorama_clamps_to_one() {
        assert_eq!(scaled_height((10_000, 1), 256), 1);
    }

    #[test]
    fn zero_width_source() {
        assert_eq!(scaled_height((0, 100), 256), 1);
    }

    #[test]
    fn upscale_small_source() {
        // 100x50 at 1024 → 512
        assert_eq!(scaled_height((100, 50), 1024), 512);
    }
}

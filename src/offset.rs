//! Sub-pixel offset folding
//!
//! The offset applied when drawing a profile at a non-integral position is the
//! fractional part of the coordinate folded into `[0, 0.5]`.

use crate::Position;

/// Folds the fractional part of `c` into `[0, 0.5]`
///
/// The fractional part is taken with respect to `floor(c)`, so negative
/// coordinates are handled toward negative infinity, then values above one half
/// are mirrored: `f -> 1 - f`.
pub fn fold_offset(c: f64) -> f64 {
    let f = c - c.floor();
    if f > 0.5 {
        1.0 - f
    } else {
        f
    }
}

/// Returns the folded sub-pixel offset `(ox, oy)` of an image position
pub fn psf_offset(pos: Position) -> (f64, f64) {
    (fold_offset(pos.x), fold_offset(pos.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fold_boundaries() {
        assert_abs_diff_eq!(fold_offset(0.999999), fold_offset(0.000001), epsilon = 1e-12);
        assert_abs_diff_eq!(fold_offset(0.999999), 1e-6, epsilon = 1e-12);
        assert_eq!(fold_offset(0.5), 0.5);
        assert_abs_diff_eq!(fold_offset(0.5000001), 0.4999999, epsilon = 1e-12);
        assert_eq!(fold_offset(3.0), 0.0);
    }

    #[test]
    fn fold_negative_coordinates() {
        // floor(-0.3) = -1 so f = 0.7, folded to 0.3
        assert_abs_diff_eq!(fold_offset(-0.3), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(fold_offset(-2.75), 0.25, epsilon = 1e-12);
        assert_eq!(fold_offset(-4.5), 0.5);
    }

    #[test]
    fn fold_range() {
        let mut c = -10.0;
        while c < 10.0 {
            let f = fold_offset(c);
            assert!((0.0..=0.5).contains(&f), "fold({c}) = {f}");
            c += 0.0137;
        }
    }

    #[test]
    fn position_offset() {
        let (ox, oy) = psf_offset(Position::new(8.5, 10.1));
        assert_eq!(ox, 0.5);
        assert_abs_diff_eq!(oy, 0.1, epsilon = 1e-12);
    }
}

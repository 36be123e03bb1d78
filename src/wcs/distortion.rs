use nalgebra::Matrix2;

/// Radial distortion: `d -> d * (1 + k1 r^2 + k2 r^4)`
///
/// Coordinates are pixel offsets from the WCS origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialDistortion {
    pub k1: f64,
    pub k2: f64,
}
impl RadialDistortion {
    pub fn new(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }
    fn scale(&self, r2: f64) -> f64 {
        1. + self.k1 * r2 + self.k2 * r2 * r2
    }
    /// Forward distortion
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let s = self.scale(x * x + y * y);
        (x * s, y * s)
    }
    /// Jacobian of [`RadialDistortion::distort`] at `(x, y)`
    ///
    /// `d(x_i s)/dx_j = s δ_ij + 2 s' x_i x_j` with `s' = ds/d(r^2)`
    pub fn jacobian(&self, x: f64, y: f64) -> Matrix2<f64> {
        let r2 = x * x + y * y;
        let s = self.scale(r2);
        let ds = self.k1 + 2. * self.k2 * r2;
        Matrix2::new(
            s + 2. * ds * x * x,
            2. * ds * x * y,
            2. * ds * x * y,
            s + 2. * ds * y * y,
        )
    }
}

use nalgebra::{Matrix2, Vector2};

use super::Profile;
use crate::psf::{PsfError, Result};

/// Reduced shear `g = g1 + i g2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shear {
    g1: f64,
    g2: f64,
}
impl Shear {
    /// New shear, `|g|` must be less than 1
    pub fn new(g1: f64, g2: f64) -> Result<Self> {
        let g = g1.hypot(g2);
        if !(g.is_finite() && g < 1.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "shear magnitude must be less than 1, found |({g1}, {g2})| = {g}"
            )));
        }
        Ok(Self { g1, g2 })
    }
    pub fn g1(&self) -> f64 {
        self.g1
    }
    pub fn g2(&self) -> f64 {
        self.g2
    }
    pub fn magnitude(&self) -> f64 {
        self.g1.hypot(self.g2)
    }
    /// Area preserving shear matrix `[[1+g1, g2], [g2, 1-g1]] / sqrt(1-|g|^2)`
    pub fn matrix(&self) -> Matrix2<f64> {
        let Self { g1, g2 } = *self;
        let f = 1. / (1. - g1 * g1 - g2 * g2).sqrt();
        Matrix2::new(1. + g1, g2, g2, 1. - g1) * f
    }
    /// Inverse of [`Shear::matrix`]
    pub fn inverse_matrix(&self) -> Matrix2<f64> {
        let Self { g1, g2 } = *self;
        let f = 1. / (1. - g1 * g1 - g2 * g2).sqrt();
        Matrix2::new(1. - g1, -g2, -g2, 1. + g1) * f
    }
}

/// Sheared profile
///
/// The surface brightness is `I'(x) = I(S^-1 x)` where `S` is the shear matrix,
/// leaving the flux unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheared<P> {
    profile: P,
    shear: Shear,
    inverse: Matrix2<f64>,
}
impl<P> Sheared<P> {
    pub fn new(profile: P, shear: Shear) -> Self {
        Self {
            profile,
            inverse: shear.inverse_matrix(),
            shear,
        }
    }
    pub fn shear(&self) -> Shear {
        self.shear
    }
    pub fn inner(&self) -> &P {
        &self.profile
    }
}
impl<P: Profile> Profile for Sheared<P> {
    fn flux(&self) -> f64 {
        self.profile.flux()
    }
    fn x_value(&self, u: f64, v: f64) -> f64 {
        let w = self.inverse * Vector2::new(u, v);
        self.profile.x_value(w[0], w[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{profile::Gaussian, wcs::LocalTransform};
    use approx::assert_relative_eq;

    #[test]
    fn area_preserving() {
        let shear = Shear::new(0.2, -0.1).unwrap();
        assert_relative_eq!(shear.matrix().determinant(), 1., epsilon = 1e-12);
        let identity = shear.matrix() * shear.inverse_matrix();
        assert_relative_eq!(identity, Matrix2::identity(), epsilon = 1e-12);
        assert!(Shear::new(0.8, 0.6).is_err());
        assert!(Shear::new(f64::NAN, 0.).is_err());
    }

    #[test]
    fn elongated_along_x() {
        let g = Gaussian::from_fwhm(0.9).unwrap().shear(0.3, 0.).unwrap();
        assert!(g.x_value(0.5, 0.) > g.x_value(0., 0.5));
        let local = LocalTransform::pixel_scale(0.2);
        let image = g.draw_image(41, 41, &local, (0., 0.)).unwrap();
        assert_relative_eq!(image.sum(), 1., max_relative = 1e-6);
    }
}

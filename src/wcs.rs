//! World coordinate systems
//!
//! A [`Wcs`] maps image pixel positions to world coordinates (arcsec) and provides
//! the [`LocalTransform`], the local linearization of that mapping, at any image
//! position.

use std::fmt;

use nalgebra::{Matrix2, Vector2};

use crate::{
    psf::{PsfError, Result},
    Position, SCALE,
};

mod distortion;
pub use distortion::RadialDistortion;

/// Local linear pixel to world transform
///
/// The Jacobian `[[du/dx, du/dy], [dv/dx, dv/dy]]` with world units in arcsec
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    jacobian: Matrix2<f64>,
}
impl LocalTransform {
    pub fn new(dudx: f64, dudy: f64, dvdx: f64, dvdy: f64) -> Self {
        Self {
            jacobian: Matrix2::new(dudx, dudy, dvdx, dvdy),
        }
    }
    /// Square pixels of size `scale` [arcsec]
    pub fn pixel_scale(scale: f64) -> Self {
        Self::new(scale, 0., 0., scale)
    }
    pub fn from_matrix(jacobian: Matrix2<f64>) -> Self {
        Self { jacobian }
    }
    pub fn jacobian(&self) -> &Matrix2<f64> {
        &self.jacobian
    }
    pub fn determinant(&self) -> f64 {
        self.jacobian.determinant()
    }
    /// Pixel area [arcsec^2]
    pub fn pixel_area(&self) -> f64 {
        self.determinant().abs()
    }
    pub fn is_singular(&self) -> bool {
        let det = self.determinant();
        !det.is_finite() || det.abs() < f64::EPSILON * self.jacobian.norm_squared()
    }
    /// World displacement [arcsec] of the pixel displacement `(dx, dy)`
    pub fn to_world(&self, dx: f64, dy: f64) -> Vector2<f64> {
        self.jacobian * Vector2::new(dx, dy)
    }
}

/// Pixel to world coordinate mapping
pub trait Wcs: fmt::Debug + Send + Sync {
    /// Local linear transform at `image_pos`
    fn local(&self, image_pos: Position) -> Result<LocalTransform>;
    /// World coordinates [arcsec] of `image_pos`
    fn to_world(&self, image_pos: Position) -> Result<Vector2<f64>>;
}

/// Rectangular region of the pixel plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}
impl Bounds {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.xmin && pos.x <= self.xmax && pos.y >= self.ymin && pos.y <= self.ymax
    }
}

/// Uniform pixel scale WCS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScaleWcs {
    scale: f64,
}
impl PixelScaleWcs {
    pub fn new(scale: f64) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "pixel scale must be positive, found {scale}"
            )));
        }
        Ok(Self { scale })
    }
    pub fn scale(&self) -> f64 {
        self.scale
    }
}
impl Wcs for PixelScaleWcs {
    fn local(&self, image_pos: Position) -> Result<LocalTransform> {
        if !image_pos.is_finite() {
            return Err(PsfError::TransformUnavailable {
                x: image_pos.x,
                y: image_pos.y,
            });
        }
        Ok(LocalTransform::pixel_scale(self.scale))
    }
    fn to_world(&self, image_pos: Position) -> Result<Vector2<f64>> {
        if !image_pos.is_finite() {
            return Err(PsfError::TransformUnavailable {
                x: image_pos.x,
                y: image_pos.y,
            });
        }
        Ok(Vector2::new(image_pos.x, image_pos.y) * self.scale)
    }
}

/// Affine WCS with an optional radial distortion
///
/// `world = J0 * D(pos - origin) + world_origin`, where `D` is the radial distortion
/// (identity when absent) applied to the pixel offset from the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineWcs {
    jacobian: Matrix2<f64>,
    origin: Position,
    world_origin: Vector2<f64>,
    distortion: Option<RadialDistortion>,
    footprint: Option<Bounds>,
}
impl AffineWcs {
    pub fn new(jacobian: Matrix2<f64>, origin: Position) -> Result<Self> {
        if LocalTransform::from_matrix(jacobian).is_singular() {
            return Err(PsfError::InvalidConfiguration(format!(
                "singular WCS jacobian: {jacobian}"
            )));
        }
        Ok(Self {
            jacobian,
            origin,
            world_origin: Vector2::zeros(),
            distortion: None,
            footprint: None,
        })
    }
    pub fn world_origin(self, u: f64, v: f64) -> Self {
        Self {
            world_origin: Vector2::new(u, v),
            ..self
        }
    }
    pub fn distortion(self, distortion: RadialDistortion) -> Self {
        Self {
            distortion: Some(distortion),
            ..self
        }
    }
    /// Region of the pixel plane where the mapping is valid
    pub fn footprint(self, bounds: Bounds) -> Self {
        Self {
            footprint: Some(bounds),
            ..self
        }
    }
    pub fn origin(&self) -> Position {
        self.origin
    }
    fn check(&self, image_pos: Position) -> Result<Vector2<f64>> {
        let valid = image_pos.is_finite()
            && self
                .footprint
                .as_ref()
                .map_or(true, |bounds| bounds.contains(image_pos));
        if !valid {
            return Err(PsfError::TransformUnavailable {
                x: image_pos.x,
                y: image_pos.y,
            });
        }
        Ok(Vector2::new(
            image_pos.x - self.origin.x,
            image_pos.y - self.origin.y,
        ))
    }
}
impl Wcs for AffineWcs {
    fn local(&self, image_pos: Position) -> Result<LocalTransform> {
        let d = self.check(image_pos)?;
        let jacobian = match &self.distortion {
            Some(distortion) => self.jacobian * distortion.jacobian(d.x, d.y),
            None => self.jacobian,
        };
        let local = LocalTransform::from_matrix(jacobian);
        if local.is_singular() {
            return Err(PsfError::TransformUnavailable {
                x: image_pos.x,
                y: image_pos.y,
            });
        }
        Ok(local)
    }
    fn to_world(&self, image_pos: Position) -> Result<Vector2<f64>> {
        let d = self.check(image_pos)?;
        let d = match &self.distortion {
            Some(distortion) => {
                let (x, y) = distortion.distort(d.x, d.y);
                Vector2::new(x, y)
            }
            None => d,
        };
        Ok(self.jacobian * d + self.world_origin)
    }
}

/// Radial distortion of the simulation WCS [pixel^-2]
const SIM_DISTORTION_K1: f64 = 2e-7;

/// Simulation WCS for a `dim` x `dim` image
///
/// The pixel scale is [`SCALE`], the origin is set at the image center and the
/// footprint extends `dim` pixels beyond every image edge.
pub fn make_sim_wcs(dim: usize) -> AffineWcs {
    make_sim_wcs_with_scale(dim, SCALE)
}
/// Simulation WCS for a `dim` x `dim` image with pixels of size `scale` [arcsec]
pub fn make_sim_wcs_with_scale(dim: usize, scale: f64) -> AffineWcs {
    let dim = dim as f64;
    let center = (dim - 1.) * 0.5;
    AffineWcs {
        jacobian: Matrix2::new(scale, 0., 0., scale),
        origin: Position::new(center, center),
        world_origin: Vector2::zeros(),
        distortion: Some(RadialDistortion::new(SIM_DISTORTION_K1, 0.)),
        footprint: Some(Bounds::new(-dim, 2. * dim, -dim, 2. * dim)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pixel_scale() {
        let wcs = PixelScaleWcs::new(0.2).unwrap();
        let local = wcs.local(Position::new(3.3, -7.1)).unwrap();
        assert_relative_eq!(local.pixel_area(), 0.04, epsilon = 1e-15);
        assert_relative_eq!(local.to_world(1., 0.)[0], 0.2);
        assert!(PixelScaleWcs::new(0.).is_err());
        assert!(matches!(
            wcs.local(Position::new(f64::NAN, 0.)),
            Err(PsfError::TransformUnavailable { .. })
        ));
    }

    #[test]
    fn affine_local_matches_finite_difference() {
        let wcs = AffineWcs::new(Matrix2::new(0.2, 0.01, -0.02, 0.19), Position::new(10., 10.))
            .unwrap()
            .world_origin(5., -3.)
            .distortion(RadialDistortion::new(1e-4, 1e-8));
        let pos = Position::new(23.7, -4.2);
        let local = wcs.local(pos).unwrap();
        let h = 1e-5;
        let dx = (wcs.to_world(Position::new(pos.x + h, pos.y)).unwrap()
            - wcs.to_world(Position::new(pos.x - h, pos.y)).unwrap())
            / (2. * h);
        let dy = (wcs.to_world(Position::new(pos.x, pos.y + h)).unwrap()
            - wcs.to_world(Position::new(pos.x, pos.y - h)).unwrap())
            / (2. * h);
        let jacobian = local.jacobian();
        assert_relative_eq!(jacobian[(0, 0)], dx[0], epsilon = 1e-8);
        assert_relative_eq!(jacobian[(1, 0)], dx[1], epsilon = 1e-8);
        assert_relative_eq!(jacobian[(0, 1)], dy[0], epsilon = 1e-8);
        assert_relative_eq!(jacobian[(1, 1)], dy[1], epsilon = 1e-8);
    }

    #[test]
    fn affine_singular() {
        assert!(AffineWcs::new(Matrix2::new(1., 2., 2., 4.), Position::default()).is_err());
    }

    #[test]
    fn sim_wcs() {
        let wcs = make_sim_wcs(20);
        assert_eq!(wcs.origin(), Position::new(9.5, 9.5));
        let center = wcs.local(Position::new(9.5, 9.5)).unwrap();
        assert_eq!(*center.jacobian(), Matrix2::new(SCALE, 0., 0., SCALE));
        let corner = wcs.local(Position::new(0., 0.)).unwrap();
        assert!(corner.pixel_area() > center.pixel_area());
        assert_relative_eq!(corner.pixel_area(), center.pixel_area(), max_relative = 1e-3);
        assert!(wcs.local(Position::new(-25., 3.)).is_err());
        assert!(wcs.to_world(Position::new(3., 45.)).is_err());
    }
}

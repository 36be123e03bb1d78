/*!
# Continuous light profiles

A [`Profile`] is a surface brightness distribution in world coordinates (arcsec)
centered on the origin. It is drawn on a pixel grid with [`Profile::draw_image`]
given the [`LocalTransform`] of the grid and a sub-pixel offset of the profile
center with respect to the grid center.

The pixel values are the profile flux integrated over each pixel footprint, see
[`Rasterizer`].
*/

use std::fmt;

use nalgebra::DMatrix;

use crate::{
    image::Image,
    psf::{PsfError, Result},
    wcs::LocalTransform,
};

mod gaussian;
mod moffat;
mod shear;
pub use gaussian::Gaussian;
pub use moffat::Moffat;
pub use shear::{Shear, Sheared};

/// Continuous 2D light profile
pub trait Profile: fmt::Debug + Send + Sync {
    /// Total flux
    fn flux(&self) -> f64;
    /// Surface brightness at the world offset `(u, v)` [arcsec] from the profile center
    fn x_value(&self, u: f64, v: f64) -> f64;
    /// Draws the profile on a `nx` x `ny` pixel grid
    ///
    /// The profile center lands on the grid true center `((nx-1)/2, (ny-1)/2)` shifted
    /// by `offset` pixels.
    fn draw_image(
        &self,
        nx: usize,
        ny: usize,
        local: &LocalTransform,
        offset: (f64, f64),
    ) -> Result<Image> {
        Rasterizer::default().draw(self, nx, ny, local, offset)
    }
    /// Applies the reduced shear `(g1, g2)` to the profile
    fn shear(self, g1: f64, g2: f64) -> Result<Sheared<Self>>
    where
        Self: Sized,
    {
        Ok(Sheared::new(self, Shear::new(g1, g2)?))
    }
}

/// Number of samples per pixel side used by default
pub const DEFAULT_SAMPLES: usize = 5;

/// Pixel integration of continuous profiles
///
/// The surface brightness is integrated over each pixel with the composite
/// Simpson rule on a `samples` x `samples` grid spanning the pixel edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Rasterizer {
    weights: Vec<f64>,
}
impl Default for Rasterizer {
    fn default() -> Self {
        Self::simpson(DEFAULT_SAMPLES)
    }
}
impl Rasterizer {
    /// Composite Simpson rule with `samples` points per pixel side
    ///
    /// `samples` is rounded up to the next odd number, with a minimum of 3.
    pub fn simpson(samples: usize) -> Self {
        let n = samples.max(3) | 1;
        let panels = (n - 1) as f64;
        let weights = (0..n)
            .map(|i| {
                let w = if i == 0 || i == n - 1 {
                    1.
                } else if i % 2 == 1 {
                    4.
                } else {
                    2.
                };
                w / (3. * panels)
            })
            .collect();
        Self { weights }
    }
    pub fn samples(&self) -> usize {
        self.weights.len()
    }
    /// Sample positions within a pixel, relative to the pixel center
    fn nodes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let n = self.weights.len();
        let step = 1. / (n - 1) as f64;
        self.weights
            .iter()
            .enumerate()
            .map(move |(i, &w)| (i as f64 * step - 0.5, w))
    }
    /// Draws `profile` on a `nx` x `ny` pixel grid, see [`Profile::draw_image`]
    pub fn draw<P: Profile + ?Sized>(
        &self,
        profile: &P,
        nx: usize,
        ny: usize,
        local: &LocalTransform,
        offset: (f64, f64),
    ) -> Result<Image> {
        if nx == 0 || ny == 0 {
            return Err(PsfError::InvalidConfiguration(format!(
                "cannot draw a {nx}x{ny} image"
            )));
        }
        if local.is_singular() {
            return Err(PsfError::InvalidConfiguration(format!(
                "cannot draw with the singular local transform {:?}",
                local.jacobian()
            )));
        }
        let area = local.pixel_area();
        let xc = (nx as f64 - 1.) * 0.5 + offset.0;
        let yc = (ny as f64 - 1.) * 0.5 + offset.1;
        let nodes: Vec<_> = self.nodes().collect();

        let mut array = DMatrix::zeros(ny, nx);
        for y in 0..ny {
            let dy = y as f64 - yc;
            for x in 0..nx {
                let dx = x as f64 - xc;
                let value: f64 = nodes
                    .iter()
                    .flat_map(|&(sy, wy)| {
                        nodes.iter().map(move |&(sx, wx)| {
                            let uv = local.to_world(dx + sx, dy + sy);
                            wx * wy * profile.x_value(uv[0], uv[1])
                        })
                    })
                    .sum();
                array[(y, x)] = value * area;
            }
        }
        Ok(Image::from_array(array))
    }
}

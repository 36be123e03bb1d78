/*!
# Spatially varying PSF from a power spectrum

A [`PowerSpectrumField`] is a Gaussian random realization of convergence and shear
fields on a regular grid covering the image plus a buffer. The PSF at a given image
position is a Moffat profile whose size follows the magnification and whose shape
follows the reduced shear interpolated at that position.

The field is built with [`PowerSpectrumFieldBuilder`] and the random number
generator is only used at construction time.

```no_run
use psf_model::{make_ps_psf, Position};
use rand::{rngs::StdRng, SeedableRng};

let mut rng = StdRng::seed_from_u64(7812);
let field = make_ps_psf(&mut rng, 20)?;
let profile = field.profile_at(Position::new(8.5, 10.1))?;
# Ok::<(), psf_model::PsfError>(())
```
*/

use std::sync::Arc;

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{
    profile::{Moffat, Profile},
    psf::{PsfError, Result},
    wcs::Bounds,
    Position, SCALE,
};

mod lookup;
mod realization;
pub use lookup::{Grid, LookupTable2D};
pub use realization::{power, Realization};

/// Moffat index of the PSF profiles
pub const MOFFAT_BETA: f64 = 2.5;
/// Largest number of grid nodes per side before the grid spacing grows above 1 arcsec
const MAX_GRID: f64 = 128.;

/// [`PowerSpectrumField`] builder
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrumFieldBuilder {
    im_width: usize,
    buff: usize,
    scale: f64,
    trunc: f64,
    noise_level: Option<f64>,
    variation_factor: f64,
    median_seeing: f64,
}
impl PowerSpectrumFieldBuilder {
    /// Field covering a `im_width` x `im_width` pixels image
    pub fn new(im_width: usize) -> Self {
        Self {
            im_width,
            buff: 0,
            scale: SCALE,
            trunc: 1.,
            noise_level: None,
            variation_factor: 10.,
            median_seeing: 0.8,
        }
    }
    /// Extra pixels on each side of the image
    pub fn buff(self, buff: usize) -> Self {
        Self { buff, ..self }
    }
    /// Pixel scale [arcsec]
    pub fn scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }
    /// Power spectrum truncation scale [arcsec]
    pub fn trunc(self, trunc: f64) -> Self {
        Self { trunc, ..self }
    }
    /// Standard deviation of the white noise added to the reduced shear
    pub fn noise_level(self, noise_level: f64) -> Self {
        Self {
            noise_level: Some(noise_level),
            ..self
        }
    }
    /// Shear RMS in units of 0.01
    pub fn variation_factor(self, variation_factor: f64) -> Self {
        Self {
            variation_factor,
            ..self
        }
    }
    /// PSF FWHM at unit magnification [arcsec]
    pub fn median_seeing(self, median_seeing: f64) -> Self {
        Self {
            median_seeing,
            ..self
        }
    }
    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PsfError::InvalidConfiguration(msg));
        if self.im_width == 0 {
            return invalid("power spectrum field image width must be positive".into());
        }
        for (name, value) in [
            ("pixel scale", self.scale),
            ("truncation scale", self.trunc),
            ("median seeing", self.median_seeing),
        ] {
            if !(value.is_finite() && value > 0.) {
                return invalid(format!("power spectrum field {name} must be positive, found {value}"));
            }
        }
        for (name, value) in [
            ("variation factor", Some(self.variation_factor)),
            ("noise level", self.noise_level),
        ] {
            if let Some(value) = value {
                if !(value.is_finite() && value >= 0.) {
                    return invalid(format!(
                        "power spectrum field {name} must be non-negative, found {value}"
                    ));
                }
            }
        }
        Ok(())
    }
    /// Draws the convergence and shear fields
    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<PowerSpectrumField> {
        self.validate()?;
        let total = (self.im_width + 2 * self.buff) as f64 * self.scale;
        let spacing = (total / MAX_GRID).max(1.);
        // n - 1 intervals span the whole buffered width
        let n = ((total / spacing).ceil() as usize + 1).max(2);
        let grid = Grid::new(n, spacing);
        let shear_rms = 0.01 * self.variation_factor;
        log::info!(
            "power spectrum field: {n}x{n} grid, {spacing:.3}arcsec spacing, shear RMS: {shear_rms:.3}"
        );

        let Realization {
            kappa,
            gamma1,
            gamma2,
        } = Realization::draw(rng, grid, self.trunc, shear_rms);

        let mut g1 = DMatrix::zeros(n, n);
        let mut g2 = DMatrix::zeros(n, n);
        let mut mu = DMatrix::zeros(n, n);
        for idx in 0..n * n {
            let (k, s1, s2) = (kappa[idx], gamma1[idx], gamma2[idx]);
            let m = 1. / ((1. - k).powi(2) - s1 * s1 - s2 * s2);
            if !(m.is_finite() && m > 0.) {
                return Err(PsfError::InvalidConfiguration(format!(
                    "power spectrum field magnification is not positive ({m}), reduce the variation factor"
                )));
            }
            g1[idx] = s1 / (1. - k);
            g2[idx] = s2 / (1. - k);
            mu[idx] = m;
        }
        if let Some(sigma) = self.noise_level {
            g1.iter_mut()
                .chain(g2.iter_mut())
                .for_each(|g| *g += sigma * rng.sample::<f64, _>(StandardNormal));
        }

        Ok(PowerSpectrumField {
            im_cen: (self.im_width as f64 - 1.) * 0.5,
            scale: self.scale,
            median_seeing: self.median_seeing,
            g1: LookupTable2D::new(grid, g1)?,
            g2: LookupTable2D::new(grid, g2)?,
            mu: LookupTable2D::new(grid, mu)?,
        })
    }
}

/// Reduced shear and magnification at a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lensing {
    pub g1: f64,
    pub g2: f64,
    pub mu: f64,
}

/// Spatially varying PSF sampled from a power spectrum
#[derive(Debug, Clone)]
pub struct PowerSpectrumField {
    im_cen: f64,
    scale: f64,
    median_seeing: f64,
    g1: LookupTable2D,
    g2: LookupTable2D,
    mu: LookupTable2D,
}
impl PowerSpectrumField {
    pub fn builder(im_width: usize) -> PowerSpectrumFieldBuilder {
        PowerSpectrumFieldBuilder::new(im_width)
    }
    /// Field coordinates [arcsec] of an image position
    fn field_coordinates(&self, position: Position) -> (f64, f64) {
        (
            (position.x - self.im_cen) * self.scale,
            (position.y - self.im_cen) * self.scale,
        )
    }
    /// Interpolated reduced shear and magnification at `position`
    pub fn lensing_at(&self, position: Position) -> Result<Lensing> {
        let (u, v) = self.field_coordinates(position);
        let out_of_domain = || PsfError::PositionOutOfDomain {
            x: position.x,
            y: position.y,
        };
        Ok(Lensing {
            g1: self.g1.interpolate(u, v).ok_or_else(out_of_domain)?,
            g2: self.g2.interpolate(u, v).ok_or_else(out_of_domain)?,
            mu: self.mu.interpolate(u, v).ok_or_else(out_of_domain)?,
        })
    }
    /// PSF profile at the image `position`
    pub fn profile_at(&self, position: Position) -> Result<Arc<dyn Profile>> {
        let Lensing { g1, g2, mu } = self.lensing_at(position)?;
        let (g1, g2) = bounded_shear(g1, g2);
        let fwhm = self.median_seeing / mu.powf(0.75);
        let profile = Moffat::from_fwhm(MOFFAT_BETA, fwhm)?.shear(g1, g2)?;
        Ok(Arc::new(profile))
    }
    /// Image area [pixel] covered by the field
    pub fn bounds(&self) -> Bounds {
        let grid = self.g1.grid();
        let (lo, hi) = (
            self.im_cen + grid.start() / self.scale,
            self.im_cen + grid.end() / self.scale,
        );
        Bounds::new(lo, hi, lo, hi)
    }
    pub fn grid(&self) -> Grid {
        self.g1.grid()
    }
}

/// Rescales shears with `|g| >= 1` to `|g| = 0.5`
fn bounded_shear(g1: f64, g2: f64) -> (f64, f64) {
    let g = g1.hypot(g2);
    if g >= 1. {
        log::warn!("shear |g| = {g:.3} >= 1 renormalized to 0.5");
        (0.5 * g1 / g, 0.5 * g2 / g)
    } else {
        (g1, g2)
    }
}

/// Power spectrum field for a `dim` x `dim` image with the simulation pixel scale
pub fn make_ps_psf<R: Rng + ?Sized>(rng: &mut R, dim: usize) -> Result<PowerSpectrumField> {
    PowerSpectrumFieldBuilder::new(dim)
        .buff(dim / 2)
        .scale(SCALE)
        .variation_factor(1.)
        .build(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn field(seed: u64) -> PowerSpectrumField {
        make_ps_psf(&mut StdRng::seed_from_u64(seed), 20).unwrap()
    }

    #[test]
    fn grid_size() {
        // (20 + 2 x 10) x 0.2 = 8 arcsec
        let grid = field(1).grid();
        assert_eq!(grid, Grid::new(9, 1.));
        let bounds = field(1).bounds();
        assert_relative_eq!(bounds.xmin, 9.5 - 20.);
        assert_relative_eq!(bounds.xmax, 9.5 + 20.);
        assert!(bounds.contains(Position::new(0., 19.)));
    }

    #[test]
    fn buffer_corners() {
        // 10 pixel buffer around a 20x20 image
        let field = field(12);
        for (x, y) in [
            (-10., -10.),
            (29., -10.),
            (-10., 29.),
            (29., 29.),
            (-10., 9.5),
            (9.5, 29.),
        ] {
            assert!(field.profile_at(Position::new(x, y)).is_ok(), "({x}, {y})");
        }
        let grid = PowerSpectrumFieldBuilder::new(700)
            .buff(350)
            .variation_factor(1.)
            .build(&mut StdRng::seed_from_u64(3))
            .unwrap()
            .grid();
        assert!((grid.n - 1) as f64 * grid.spacing >= 1400. * SCALE);
    }

    #[test]
    fn reproducible() {
        let pos = Position::new(8.5, 10.1);
        assert_eq!(field(7812).lensing_at(pos), field(7812).lensing_at(pos));
        assert_ne!(field(7812).lensing_at(pos), field(12).lensing_at(pos));
    }

    #[test]
    fn out_of_domain() {
        let field = field(12);
        for (x, y) in [(-30., 5.), (5., 40.), (f64::NAN, 5.)] {
            assert!(matches!(
                field.profile_at(Position::new(x, y)),
                Err(PsfError::PositionOutOfDomain { .. })
            ));
        }
        assert!(field.profile_at(Position::new(-5., 24.)).is_ok());
    }

    #[test]
    fn small_variations() {
        let field = field(7812);
        for (x, y) in [(0., 0.), (8.5, 10.1), (19., 19.)] {
            let Lensing { g1, g2, mu } = field.lensing_at(Position::new(x, y)).unwrap();
            assert!(g1.hypot(g2) < 0.1);
            assert!(mu > 0.5 && mu < 2.);
        }
    }

    #[test]
    fn uniform_field() {
        let field = PowerSpectrumFieldBuilder::new(20)
            .buff(10)
            .variation_factor(0.)
            .median_seeing(0.9)
            .build(&mut StdRng::seed_from_u64(3))
            .unwrap();
        let pos = Position::new(4.2, 13.3);
        let Lensing { g1, g2, mu } = field.lensing_at(pos).unwrap();
        assert_eq!((g1, g2), (0., 0.));
        assert_relative_eq!(mu, 1., epsilon = 1e-15);
        let profile = field.profile_at(pos).unwrap();
        let moffat = Moffat::from_fwhm(MOFFAT_BETA, 0.9).unwrap();
        for (u, v) in [(0., 0.), (0.3, -0.1)] {
            assert_relative_eq!(profile.x_value(u, v), moffat.x_value(u, v), epsilon = 1e-12);
        }
    }

    #[test]
    fn shear_noise() {
        let builder = PowerSpectrumFieldBuilder::new(20).buff(10).variation_factor(0.);
        let field = builder
            .clone()
            .noise_level(0.01)
            .build(&mut StdRng::seed_from_u64(3))
            .unwrap();
        let Lensing { g1, g2, mu } = field.lensing_at(Position::new(4.2, 13.3)).unwrap();
        assert!(g1 != 0. && g2 != 0.);
        assert_relative_eq!(mu, 1., epsilon = 1e-15);
        assert!(builder.noise_level(-1.).build(&mut StdRng::seed_from_u64(3)).is_err());
    }

    #[test]
    fn invalid_configuration() {
        let mut rng = StdRng::seed_from_u64(3);
        for builder in [
            PowerSpectrumFieldBuilder::new(0),
            PowerSpectrumFieldBuilder::new(20).scale(0.),
            PowerSpectrumFieldBuilder::new(20).trunc(-1.),
            PowerSpectrumFieldBuilder::new(20).median_seeing(f64::NAN),
            PowerSpectrumFieldBuilder::new(20).variation_factor(-1.),
        ] {
            assert!(matches!(
                builder.build(&mut rng),
                Err(PsfError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn shear_renormalization() {
        assert_eq!(bounded_shear(0.1, -0.2), (0.1, -0.2));
        let (g1, g2) = bounded_shear(0.8, 0.6);
        assert_relative_eq!(g1.hypot(g2), 0.5, epsilon = 1e-12);
        assert_relative_eq!(g1 / g2, 0.8 / 0.6, epsilon = 1e-12);
    }
}

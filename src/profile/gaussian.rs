use std::f64::consts::PI;

use super::Profile;
use crate::psf::{PsfError, Result};

/// FWHM to standard deviation ratio `2 sqrt(2 ln 2)`
const FWHM_FACTOR: f64 = 2.354_820_045_030_949;

/// Circular Gaussian profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    sigma: f64,
    flux: f64,
}
impl Gaussian {
    /// Unit flux Gaussian with standard deviation `sigma` [arcsec]
    pub fn from_sigma(sigma: f64) -> Result<Self> {
        if !(sigma.is_finite() && sigma > 0.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "Gaussian sigma must be positive, found {sigma}"
            )));
        }
        Ok(Self { sigma, flux: 1. })
    }
    /// Unit flux Gaussian with full width at half maximum `fwhm` [arcsec]
    pub fn from_fwhm(fwhm: f64) -> Result<Self> {
        Self::from_sigma(fwhm / FWHM_FACTOR).map_err(|_| {
            PsfError::InvalidConfiguration(format!("Gaussian FWHM must be positive, found {fwhm}"))
        })
    }
    pub fn with_flux(self, flux: f64) -> Self {
        Self { flux, ..self }
    }
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
    pub fn fwhm(&self) -> f64 {
        self.sigma * FWHM_FACTOR
    }
}
impl Profile for Gaussian {
    fn flux(&self) -> f64 {
        self.flux
    }
    fn x_value(&self, u: f64, v: f64) -> f64 {
        let s2 = self.sigma * self.sigma;
        self.flux / (2. * PI * s2) * (-(u * u + v * v) / (2. * s2)).exp()
    }
}

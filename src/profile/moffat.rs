use std::f64::consts::PI;

use super::Profile;
use crate::psf::{PsfError, Result};

/// Moffat profile: `I(r) ∝ (1 + (r/r0)^2)^-beta`
///
/// The profile is normalized to its flux, optionally within the truncation radius
/// beyond which the surface brightness is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moffat {
    beta: f64,
    scale_radius: f64,
    trunc: Option<f64>,
    flux: f64,
    norm: f64,
}
impl Moffat {
    /// Unit flux Moffat profile with scale radius `r0` [arcsec]
    pub fn from_scale_radius(beta: f64, scale_radius: f64) -> Result<Self> {
        if !(beta.is_finite() && beta > 1.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "Moffat beta must be larger than 1, found {beta}"
            )));
        }
        if !(scale_radius.is_finite() && scale_radius > 0.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "Moffat scale radius must be positive, found {scale_radius}"
            )));
        }
        let mut this = Self {
            beta,
            scale_radius,
            trunc: None,
            flux: 1.,
            norm: 0.,
        };
        this.norm = this.normalization();
        Ok(this)
    }
    /// Unit flux Moffat profile with full width at half maximum `fwhm` [arcsec]
    pub fn from_fwhm(beta: f64, fwhm: f64) -> Result<Self> {
        if !(fwhm.is_finite() && fwhm > 0.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "Moffat FWHM must be positive, found {fwhm}"
            )));
        }
        let factor = 2. * (2f64.powf(1. / beta) - 1.).sqrt();
        Self::from_scale_radius(beta, fwhm / factor)
    }
    /// Truncates the profile at radius `trunc` [arcsec]
    pub fn truncate(self, trunc: f64) -> Result<Self> {
        if !(trunc.is_finite() && trunc > 0.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "Moffat truncation radius must be positive, found {trunc}"
            )));
        }
        let mut this = Self {
            trunc: Some(trunc),
            ..self
        };
        this.norm = this.normalization();
        Ok(this)
    }
    pub fn with_flux(self, flux: f64) -> Self {
        let mut this = Self { flux, ..self };
        this.norm = this.normalization();
        this
    }
    pub fn beta(&self) -> f64 {
        self.beta
    }
    pub fn scale_radius(&self) -> f64 {
        self.scale_radius
    }
    pub fn fwhm(&self) -> f64 {
        2. * self.scale_radius * (2f64.powf(1. / self.beta) - 1.).sqrt()
    }
    /// Central surface brightness such that the integrated flux is `flux`
    fn normalization(&self) -> f64 {
        let r0 = self.scale_radius;
        // fraction of the untruncated flux enclosed within the truncation radius
        let enclosed = self
            .trunc
            .map_or(1., |t| 1. - (1. + (t / r0).powi(2)).powf(1. - self.beta));
        self.flux * (self.beta - 1.) / (PI * r0 * r0 * enclosed)
    }
}
impl Profile for Moffat {
    fn flux(&self) -> f64 {
        self.flux
    }
    fn x_value(&self, u: f64, v: f64) -> f64 {
        let r2 = u * u + v * v;
        if self.trunc.is_some_and(|t| r2 > t * t) {
            return 0.;
        }
        self.norm * (1. + r2 / (self.scale_radius * self.scale_radius)).powf(-self.beta)
    }
}

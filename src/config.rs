use std::{
    env::{self, VarError},
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_pickle as pickle;

use crate::{
    power_spectrum::PowerSpectrumFieldBuilder,
    profile::{Gaussian, Moffat, Profile},
    psf::{PsfError, PsfModel},
    wcs::make_sim_wcs_with_scale,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("failed to (de)serialize the PSF configuration")]
    Pickle(#[from] pickle::Error),
    #[error(r#""PSF_CONFIG" env var is not set"#)]
    Env(#[from] VarError),
    #[error("invalid PSF configuration")]
    Psf(#[from] PsfError),
}
type Result<T> = std::result::Result<T, ConfigError>;

/// PSF profile family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PsfKind {
    /// Same profile everywhere: Gaussian or, if `beta` is set, Moffat
    Fixed { fwhm: f64, beta: Option<f64> },
    /// Profile varying with the power spectrum field
    PowerSpectrum {
        variation_factor: f64,
        median_seeing: f64,
        trunc: f64,
        noise_level: Option<f64>,
    },
}
impl PsfKind {
    /// Gaussian fixed PSF
    pub fn gaussian(fwhm: f64) -> Self {
        PsfKind::Fixed { fwhm, beta: None }
    }
    /// Power spectrum PSF with the simulation defaults
    pub fn power_spectrum() -> Self {
        PsfKind::PowerSpectrum {
            variation_factor: 1.,
            median_seeing: 0.8,
            trunc: 1.,
            noise_level: None,
        }
    }
}

/// PSF model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsfConfig {
    /// Image size [pixel]
    pub image_dim: usize,
    /// Kernel image size [pixel]
    pub psf_dim: usize,
    /// Pixel scale [arcsec]
    pub pixel_scale: f64,
    pub kind: PsfKind,
    /// Seed of the power spectrum field realization
    pub seed: u64,
}
impl Default for PsfConfig {
    fn default() -> Self {
        Self {
            image_dim: 20,
            psf_dim: 15,
            pixel_scale: crate::SCALE,
            kind: PsfKind::gaussian(0.9),
            seed: 7812,
        }
    }
}
impl PsfConfig {
    /// Loads a configuration from a pickle file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;
        let config: Self = pickle::from_reader(&mut file, Default::default())?;
        log::info!("PSF configuration loaded from {path:?}");
        Ok(config)
    }
    /// Loads the configuration which path is given by the env variable `PSF_CONFIG`
    pub fn from_env() -> Result<Self> {
        let path = env::var("PSF_CONFIG")?;
        Self::load(path)
    }
    /// Saves the configuration to a pickle file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path).map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;
        pickle::to_writer(&mut file, self, Default::default())?;
        Ok(())
    }
    /// Builds the PSF model on the simulation WCS
    pub fn build(&self) -> Result<PsfModel> {
        if !(self.pixel_scale.is_finite() && self.pixel_scale > 0.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "pixel scale must be positive, found {}",
                self.pixel_scale
            ))
            .into());
        }
        let wcs = Arc::new(make_sim_wcs_with_scale(self.image_dim, self.pixel_scale));
        let model = match self.kind {
            PsfKind::Fixed { fwhm, beta } => {
                let profile: Arc<dyn Profile> = match beta {
                    Some(beta) => Arc::new(Moffat::from_fwhm(beta, fwhm)?),
                    None => Arc::new(Gaussian::from_fwhm(fwhm)?),
                };
                PsfModel::fixed(profile, self.psf_dim, wcs)?
            }
            PsfKind::PowerSpectrum {
                variation_factor,
                median_seeing,
                trunc,
                noise_level,
            } => {
                let mut builder = PowerSpectrumFieldBuilder::new(self.image_dim)
                    .buff(self.image_dim / 2)
                    .scale(self.pixel_scale)
                    .variation_factor(variation_factor)
                    .median_seeing(median_seeing)
                    .trunc(trunc);
                if let Some(noise_level) = noise_level {
                    builder = builder.noise_level(noise_level);
                }
                let mut rng = StdRng::seed_from_u64(self.seed);
                let field = builder.build(&mut rng)?;
                PsfModel::power_spectrum(Arc::new(field), self.psf_dim, wcs)?
            }
        };
        Ok(model)
    }
}

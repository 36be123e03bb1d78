/*!
# PSF models

A [`PsfModel`] renders a continuous PSF profile into a square kernel image at any
image position. The profile comes either from a fixed profile or from a
[`PowerSpectrumField`] queried at the requested position, see [`ProfileSource`].

Two rendering modes are available:

- [`PsfModel::render_centered`]: the profile is always centered on the kernel grid,
- [`PsfModel::render_at_position`]: the profile is shifted by the folded sub-pixel
  phase of the position, see [`psf_offset`].

In both cases the profile is drawn with the local WCS transform evaluated at the
full, non-integral position.
*/

use std::{fmt, sync::Arc};

use rayon::prelude::*;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    image::{BBox, Image},
    offset::psf_offset,
    power_spectrum::PowerSpectrumField,
    profile::Profile,
    wcs::Wcs,
    Position,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PsfError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("position ({x}, {y}) is outside the power spectrum field footprint")]
    PositionOutOfDomain { x: f64, y: f64 },
    #[error("no local WCS transform available at ({x}, {y})")]
    TransformUnavailable { x: f64, y: f64 },
    #[error("no PSF attached to the exposure")]
    MissingPsf,
}
pub type Result<T> = std::result::Result<T, PsfError>;

/// PSF rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RenderMode {
    /// Profile centered on the kernel grid
    Centered,
    /// Profile shifted by the sub-pixel phase of the position
    Offset,
}

/// PSF interface of an [`Exposure`](crate::Exposure)
pub trait Psf: fmt::Debug + Send + Sync {
    /// Kernel image: the PSF centered on the image, its center on pixel `(0, 0)`
    fn compute_kernel_image(&self, position: Position) -> Result<Image>;
    /// PSF image with the sub-pixel phase of `position`, located around `position`
    /// in the parent pixel grid
    fn compute_image(&self, position: Position) -> Result<Image>;
    /// Bounding box of the kernel image
    fn compute_bbox(&self) -> BBox;
    /// Kernel image size `(nx, ny)`
    fn dimensions(&self) -> (usize, usize);
}

/// Source of the PSF profile at a given position
#[derive(Debug, Clone)]
pub enum ProfileSource {
    /// Same profile everywhere
    Fixed(Arc<dyn Profile>),
    /// Profile from the power spectrum field at the position
    PowerSpectrum(Arc<PowerSpectrumField>),
}
impl ProfileSource {
    pub fn profile_at(&self, position: Position) -> Result<Arc<dyn Profile>> {
        match self {
            ProfileSource::Fixed(profile) => Ok(Arc::clone(profile)),
            ProfileSource::PowerSpectrum(field) => field.profile_at(position),
        }
    }
}

/// Position dependent PSF kernel renderer
#[derive(Debug, Clone)]
pub struct PsfModel {
    source: ProfileSource,
    dim: usize,
    wcs: Arc<dyn Wcs>,
}
impl PsfModel {
    /// Creates a PSF model rendering `dim` x `dim` kernel images
    pub fn new(source: ProfileSource, dim: usize, wcs: Arc<dyn Wcs>) -> Result<Self> {
        if dim == 0 {
            return Err(PsfError::InvalidConfiguration(
                "PSF kernel size must be positive".to_string(),
            ));
        }
        Ok(Self { source, dim, wcs })
    }
    /// PSF model with the same `profile` at all positions
    pub fn fixed(profile: Arc<dyn Profile>, dim: usize, wcs: Arc<dyn Wcs>) -> Result<Self> {
        Self::new(ProfileSource::Fixed(profile), dim, wcs)
    }
    /// PSF model with the profile of the power spectrum `field` at each position
    pub fn power_spectrum(
        field: Arc<PowerSpectrumField>,
        dim: usize,
        wcs: Arc<dyn Wcs>,
    ) -> Result<Self> {
        Self::new(ProfileSource::PowerSpectrum(field), dim, wcs)
    }
    /// Same PSF model with `dim` x `dim` kernel images
    pub fn resized(&self, dim: usize) -> Result<Self> {
        Self::new(self.source.clone(), dim, Arc::clone(&self.wcs))
    }
    /// Kernel image size
    pub fn dim(&self) -> usize {
        self.dim
    }
    pub fn source(&self) -> &ProfileSource {
        &self.source
    }
    pub fn wcs(&self) -> &Arc<dyn Wcs> {
        &self.wcs
    }
    /// Renders the PSF at `position` according to `mode`
    ///
    /// The image origin is at `-dim/2` for centered kernels and at `floor(position) - dim/2`
    /// for offset images.
    pub fn render(&self, position: Position, mode: RenderMode) -> Result<Image> {
        let profile = self.source.profile_at(position)?;
        let local = self.wcs.local(position)?;
        let unavailable = || PsfError::TransformUnavailable {
            x: position.x,
            y: position.y,
        };
        if local.is_singular() {
            return Err(unavailable());
        }
        let half = (self.dim / 2) as i64;
        let (offset, xy0) = match mode {
            RenderMode::Centered => ((0., 0.), (-half, -half)),
            RenderMode::Offset => (
                psf_offset(position),
                (
                    pixel_origin(position.x, half).ok_or_else(unavailable)?,
                    pixel_origin(position.y, half).ok_or_else(unavailable)?,
                ),
            ),
        };
        log::debug!(
            "rendering {} {}x{} PSF at {} with offset {:?}",
            mode,
            self.dim,
            self.dim,
            position,
            offset
        );
        let image = profile.draw_image(self.dim, self.dim, &local, offset)?;
        Ok(image.with_xy0(xy0.0, xy0.1))
    }
    /// Renders the PSF centered on the kernel grid
    pub fn render_centered(&self, position: Position) -> Result<Image> {
        self.render(position, RenderMode::Centered)
    }
    /// Renders the PSF with the sub-pixel phase of `position`
    pub fn render_at_position(&self, position: Position) -> Result<Image> {
        self.render(position, RenderMode::Offset)
    }
    /// Renders the PSF at each position in parallel
    pub fn render_many(&self, positions: &[Position], mode: RenderMode) -> Result<Vec<Image>> {
        positions
            .par_iter()
            .map(|&position| self.render(position, mode))
            .collect()
    }
}
/// `floor(c) - half`, `None` if it does not fit in the pixel grid integer range
fn pixel_origin(c: f64, half: i64) -> Option<i64> {
    let pixel = c.floor();
    if !(pixel >= i64::MIN as f64 && pixel < i64::MAX as f64) {
        return None;
    }
    (pixel as i64).checked_sub(half)
}

impl Psf for PsfModel {
    fn compute_kernel_image(&self, position: Position) -> Result<Image> {
        self.render_centered(position)
    }
    fn compute_image(&self, position: Position) -> Result<Image> {
        self.render_at_position(position)
    }
    fn compute_bbox(&self) -> BBox {
        let half = (self.dim / 2) as i64;
        BBox::new(-half, -half, self.dim, self.dim)
    }
    fn dimensions(&self) -> (usize, usize) {
        (self.dim, self.dim)
    }
}

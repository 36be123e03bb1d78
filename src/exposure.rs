/*!
# Host exposure

A minimal exposure container: a masked image, an optional WCS and an optional PSF.
The PSF is attached as a shared [`Psf`] trait object and retrieved as the same
handle.
*/

use std::sync::Arc;

use nalgebra::DMatrix;

use crate::{
    psf::{Psf, PsfError, Result},
    wcs::Wcs,
    Position,
};

/// Image, mask and variance planes
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedImage {
    pub image: DMatrix<f32>,
    pub mask: DMatrix<u32>,
    pub variance: DMatrix<f32>,
}
impl MaskedImage {
    /// Zeroed `width` x `height` masked image
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            image: DMatrix::zeros(height, width),
            mask: DMatrix::zeros(height, width),
            variance: DMatrix::zeros(height, width),
        }
    }
    /// `(width, height)`
    pub fn dimensions(&self) -> (usize, usize) {
        let (ny, nx) = self.image.shape();
        (nx, ny)
    }
}

#[derive(Debug, Clone)]
pub struct Exposure {
    masked_image: MaskedImage,
    psf: Option<Arc<dyn Psf>>,
    wcs: Option<Arc<dyn Wcs>>,
}
impl Exposure {
    pub fn new(masked_image: MaskedImage) -> Self {
        Self {
            masked_image,
            psf: None,
            wcs: None,
        }
    }
    pub fn set_psf(&mut self, psf: Arc<dyn Psf>) {
        self.psf = Some(psf);
    }
    pub fn psf(&self) -> Option<Arc<dyn Psf>> {
        self.psf.clone()
    }
    pub fn set_wcs(&mut self, wcs: Arc<dyn Wcs>) {
        self.wcs = Some(wcs);
    }
    pub fn wcs(&self) -> Option<Arc<dyn Wcs>> {
        self.wcs.clone()
    }
    pub fn masked_image(&self) -> &MaskedImage {
        &self.masked_image
    }
    pub fn masked_image_mut(&mut self) -> &mut MaskedImage {
        &mut self.masked_image
    }
    /// Adds a point source of the given `flux` at `position`
    ///
    /// The source is the PSF image at `position` scaled to `flux`; pixels falling
    /// outside of the exposure are dropped.
    pub fn add_source(&mut self, position: Position, flux: f64) -> Result<()> {
        let psf = self.psf.as_ref().ok_or(PsfError::MissingPsf)?;
        let mut stamp = psf.compute_image(position)?;
        let total = stamp.sum();
        if total > 0. {
            stamp.scale(flux / total);
        }
        let (x0, y0) = stamp.xy0();
        let (width, height) = self.masked_image.dimensions();
        let (nx, ny) = stamp.dimensions();
        let mut clipped = 0usize;
        for y in 0..ny {
            for x in 0..nx {
                let (px, py) = (x0 + x as i64, y0 + y as i64);
                if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                    clipped += 1;
                    continue;
                }
                self.masked_image.image[(py as usize, px as usize)] += stamp.get(x, y) as f32;
            }
        }
        if clipped > 0 {
            log::debug!("{clipped} pixels of the source at {position} fall outside the exposure");
        }
        Ok(())
    }
}

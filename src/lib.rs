/*!
# PSF models for image simulation

This library renders a telescope point spread function (PSF) into fixed size
kernel images at arbitrary sub-pixel positions of a detector.

## Key Components

- [`PsfModel`] - PSF model built either from a fixed profile or from a [`PowerSpectrumField`]
- [`Profile`] - continuous light profiles ([`Gaussian`], [`Moffat`], [`Sheared`]) drawn on pixel grids
- [`Wcs`] - pixel to world mapping providing the [`LocalTransform`] at any image position
- [`Exposure`] - simulated exposure holding pixel data and the attached [`Psf`]

## Usage

```rust,no_run
use std::sync::Arc;
use psf_model::{make_sim_wcs, Gaussian, Position, PsfModel};

let wcs = Arc::new(make_sim_wcs(20));
let psf = PsfModel::fixed(Arc::new(Gaussian::from_fwhm(0.9)?), 15, wcs)?;

let pos = Position::new(8.5, 10.1);
// always centered
let kernel = psf.render_centered(pos)?;
// shifted by the sub-pixel phase of `pos`
let image = psf.render_at_position(pos)?;
# Ok::<(), psf_model::PsfError>(())
```
*/

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod exposure;
pub mod image;
pub mod offset;
pub mod power_spectrum;
pub mod profile;
pub mod psf;
pub mod wcs;

pub use config::{ConfigError, PsfConfig, PsfKind};
pub use exposure::{Exposure, MaskedImage};
pub use image::{BBox, Image};
pub use offset::{fold_offset, psf_offset};
pub use power_spectrum::{make_ps_psf, PowerSpectrumField, PowerSpectrumFieldBuilder};
pub use profile::{Gaussian, Moffat, Profile, Rasterizer, Shear, Sheared};
pub use psf::{ProfileSource, Psf, PsfError, PsfModel, RenderMode};
pub use wcs::{make_sim_wcs, AffineWcs, Bounds, LocalTransform, PixelScaleWcs, Wcs};

/// Detector pixel scale of the simulations [arcsec/pixel]
pub const SCALE: f64 = 0.2;

/// Image position in pixel coordinates
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}
impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}
impl From<Position> for (f64, f64) {
    fn from(pos: Position) -> Self {
        (pos.x, pos.y)
    }
}
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

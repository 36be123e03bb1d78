//! PSF images
//!
//! Images are stored in [nalgebra] matrices indexed as `[(row, column)] = [(y, x)]`,
//! together with the position `xy0` of their first pixel in the parent pixel grid.

use std::{fs::File, io, io::BufWriter, path::Path};

use nalgebra::DMatrix;
use npyz::WriterBuilder;

/// Integer pixel bounding box
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub x0: i64,
    pub y0: i64,
    pub width: usize,
    pub height: usize,
}
impl BBox {
    pub fn new(x0: i64, y0: i64, width: usize, height: usize) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }
    /// Last column (inclusive)
    pub fn x1(&self) -> i64 {
        self.x0 + self.width as i64 - 1
    }
    /// Last row (inclusive)
    pub fn y1(&self) -> i64 {
        self.y0 + self.height as i64 - 1
    }
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x0 && x <= self.x1() && y >= self.y0 && y <= self.y1()
    }
}

/// Dense image of pixel values with its origin in the parent grid
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    array: DMatrix<f64>,
    xy0: (i64, i64),
}
impl Image {
    /// Creates a `nx` by `ny` image filled with zeros
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self {
            array: DMatrix::zeros(ny, nx),
            xy0: (0, 0),
        }
    }
    pub fn from_array(array: DMatrix<f64>) -> Self {
        Self { array, xy0: (0, 0) }
    }
    pub fn with_xy0(self, x0: i64, y0: i64) -> Self {
        Self {
            xy0: (x0, y0),
            ..self
        }
    }
    pub fn array(&self) -> &DMatrix<f64> {
        &self.array
    }
    pub fn into_array(self) -> DMatrix<f64> {
        self.array
    }
    /// Image size `(nx, ny)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.array.ncols(), self.array.nrows())
    }
    /// Position of the first pixel in the parent grid
    pub fn xy0(&self) -> (i64, i64) {
        self.xy0
    }
    pub fn bbox(&self) -> BBox {
        let (nx, ny) = self.dimensions();
        BBox::new(self.xy0.0, self.xy0.1, nx, ny)
    }
    /// Pixel value at column `x` and row `y`
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.array[(y, x)]
    }
    pub fn sum(&self) -> f64 {
        self.array.sum()
    }
    pub fn max(&self) -> f64 {
        self.array.max()
    }
    pub fn scale(&mut self, factor: f64) -> &mut Self {
        self.array *= factor;
        self
    }
    /// Flux weighted center `(x, y)` in array coordinates
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let total = self.sum();
        if total.abs() < f64::EPSILON {
            return None;
        }
        let (nx, ny) = self.dimensions();
        let (mut xc, mut yc) = (0f64, 0f64);
        for y in 0..ny {
            for x in 0..nx {
                let value = self.array[(y, x)];
                xc += x as f64 * value;
                yc += y as f64 * value;
            }
        }
        Some((xc / total, yc / total))
    }
    /// Iterator over the pixel values, row after row
    pub fn row_major(&self) -> impl Iterator<Item = f64> + '_ {
        let (nx, ny) = self.dimensions();
        (0..ny).flat_map(move |y| (0..nx).map(move |x| self.array[(y, x)]))
    }
    /// Writes the image into a `.npy` file with shape `(ny, nx)`
    pub fn to_npy(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let (nx, ny) = self.dimensions();
        let file = BufWriter::new(File::create(path)?);
        let mut writer = npyz::WriteOptions::<f64>::new()
            .default_dtype()
            .shape(&[ny as u64, nx as u64])
            .writer(file)
            .begin_nd()?;
        writer.extend(self.row_major())?;
        writer.finish()
    }
}

/// Writes a stack of images with identical sizes into a `.npy` file with shape `(n, ny, nx)`
pub fn images_to_npy(images: &[Image], path: impl AsRef<Path>) -> io::Result<()> {
    let (nx, ny) = images.first().map_or((0, 0), |image| image.dimensions());
    if let Some(image) = images.iter().find(|image| image.dimensions() != (nx, ny)) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "image size mismatch: {:?} instead of {:?}",
                image.dimensions(),
                (nx, ny)
            ),
        ));
    }
    let file = BufWriter::new(File::create(path)?);
    let mut writer = npyz::WriteOptions::<f64>::new()
        .default_dtype()
        .shape(&[images.len() as u64, ny as u64, nx as u64])
        .writer(file)
        .begin_nd()?;
    for image in images {
        writer.extend(image.row_major())?;
    }
    writer.finish()
}

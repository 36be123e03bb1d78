use nalgebra::DMatrix;

use crate::psf::{PsfError, Result};

/// Regular square grid of `n` x `n` nodes centered on the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub n: usize,
    pub spacing: f64,
}
impl Grid {
    pub fn new(n: usize, spacing: f64) -> Self {
        Self { n, spacing }
    }
    /// Coordinate of the first node
    pub fn start(&self) -> f64 {
        -0.5 * (self.n as f64 - 1.) * self.spacing
    }
    /// Coordinate of the last node
    pub fn end(&self) -> f64 {
        -self.start()
    }
    /// Coordinate of node `i`
    pub fn node(&self, i: usize) -> f64 {
        self.start() + i as f64 * self.spacing
    }
    /// Lower node index and fractional distance to the next node
    fn locate(&self, u: f64) -> Option<(usize, f64)> {
        if !(u >= self.start() && u <= self.end()) {
            return None;
        }
        let t = (u - self.start()) / self.spacing;
        let i = (t.floor() as usize).min(self.n - 2);
        Some((i, t - i as f64))
    }
}

/// Bilinear interpolation of values sampled on a [`Grid`]
///
/// The values are indexed as `[(y, x)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable2D {
    grid: Grid,
    values: DMatrix<f64>,
}
impl LookupTable2D {
    pub fn new(grid: Grid, values: DMatrix<f64>) -> Result<Self> {
        if grid.n < 2 || !(grid.spacing.is_finite() && grid.spacing > 0.) {
            return Err(PsfError::InvalidConfiguration(format!(
                "a lookup table requires at least 2x2 nodes with a positive spacing, found {grid:?}"
            )));
        }
        if values.shape() != (grid.n, grid.n) {
            return Err(PsfError::InvalidConfiguration(format!(
                "{:?} lookup table values for a {}x{} grid",
                values.shape(),
                grid.n,
                grid.n
            )));
        }
        Ok(Self { grid, values })
    }
    pub fn grid(&self) -> Grid {
        self.grid
    }
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }
    /// Value at `(u, v)`, `None` outside of the grid
    pub fn interpolate(&self, u: f64, v: f64) -> Option<f64> {
        let (i, tx) = self.grid.locate(u)?;
        let (j, ty) = self.grid.locate(v)?;
        let z = &self.values;
        let bottom = z[(j, i)] * (1. - tx) + z[(j, i + 1)] * tx;
        let top = z[(j + 1, i)] * (1. - tx) + z[(j + 1, i + 1)] * tx;
        Some(bottom * (1. - ty) + top * ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plane() -> LookupTable2D {
        let grid = Grid::new(5, 0.5);
        let values = DMatrix::from_fn(5, 5, |j, i| 1. + 2. * grid.node(i) - 3. * grid.node(j));
        LookupTable2D::new(grid, values).unwrap()
    }

    #[test]
    fn grid_nodes() {
        let grid = Grid::new(8, 1.);
        assert_eq!(grid.start(), -3.5);
        assert_eq!(grid.end(), 3.5);
        assert_eq!(grid.node(7), 3.5);
    }

    #[test]
    fn exact_on_planes() {
        let lut = plane();
        for (u, v) in [(0., 0.), (-1., 1.), (0.3, -0.77), (1., -1.), (0.99, 0.01)] {
            assert_relative_eq!(
                lut.interpolate(u, v).unwrap(),
                1. + 2. * u - 3. * v,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn outside() {
        let lut = plane();
        assert!(lut.interpolate(1.01, 0.).is_none());
        assert!(lut.interpolate(0., -1.2).is_none());
        assert!(lut.interpolate(f64::NAN, 0.).is_none());
    }

    #[test]
    fn invalid_tables() {
        for (grid, shape) in [
            (Grid::new(1, 1.), (1, 1)),
            (Grid::new(0, 1.), (0, 0)),
            (Grid::new(4, 0.), (4, 4)),
            (Grid::new(4, 1.), (4, 3)),
        ] {
            assert!(matches!(
                LookupTable2D::new(grid, DMatrix::zeros(shape.0, shape.1)),
                Err(PsfError::InvalidConfiguration(_))
            ));
        }
    }
}

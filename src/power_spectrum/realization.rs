use std::f64::consts::PI;

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::StandardNormal;
use rustfft::{num_complex::Complex64, FftDirection, FftPlanner};

use super::lookup::Grid;

/// Kolmogorov like power function with an exponential cutoff at `trunc` [arcsec]
pub fn power(k: f64, trunc: f64) -> f64 {
    (k * k + 1. / (trunc * trunc)).powf(-11. / 6.) * (-(k * trunc).powi(2)).exp()
}

/// Wavenumber of FFT bin `i` on a `n` points grid with spacing `d` [rad/arcsec]
fn wavenumber(i: usize, n: usize, d: f64) -> f64 {
    let f = if i <= (n - 1) / 2 {
        i as f64
    } else {
        i as f64 - n as f64
    };
    2. * PI * f / (n as f64 * d)
}

/// Unnormalized in-place 2D FFT of a `n` x `n` row major buffer
pub fn fft2(buffer: &mut [Complex64], n: usize, direction: FftDirection) {
    let fft = FftPlanner::new().plan_fft(n, direction);
    fft.process(buffer);
    transpose(buffer, n);
    fft.process(buffer);
    transpose(buffer, n);
}

fn transpose(buffer: &mut [Complex64], n: usize) {
    for i in 0..n {
        for j in i + 1..n {
            buffer.swap(i * n + j, j * n + i);
        }
    }
}

/// Convergence and shear fields of a Gaussian random field realization
#[derive(Debug, Clone)]
pub struct Realization {
    pub kappa: DMatrix<f64>,
    pub gamma1: DMatrix<f64>,
    pub gamma2: DMatrix<f64>,
}
impl Realization {
    /// Draws E and B modes with the power function truncated at `trunc` and
    /// rescales the fields so that the shear variance is `shear_rms^2`
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, grid: Grid, trunc: f64, shear_rms: f64) -> Self {
        let n = grid.n;
        let white = |rng: &mut R| -> Vec<Complex64> {
            let mut buffer: Vec<Complex64> = (0..n * n)
                .map(|_| Complex64::new(rng.sample(StandardNormal), 0.))
                .collect();
            fft2(&mut buffer, n, FftDirection::Forward);
            buffer
        };
        let e_modes = white(&mut *rng);
        let b_modes = white(&mut *rng);

        let mut kappa = vec![Complex64::new(0., 0.); n * n];
        let mut gamma1 = kappa.clone();
        let mut gamma2 = kappa.clone();
        for j in 0..n {
            let ky = wavenumber(j, n, grid.spacing);
            for i in 0..n {
                let kx = wavenumber(i, n, grid.spacing);
                let k2 = kx * kx + ky * ky;
                if k2 == 0. {
                    continue;
                }
                let amplitude = power(k2.sqrt(), trunc).sqrt();
                let e = e_modes[j * n + i] * amplitude;
                let b = b_modes[j * n + i] * amplitude;
                let cos2phi = (kx * kx - ky * ky) / k2;
                let sin2phi = 2. * kx * ky / k2;
                let idx = j * n + i;
                kappa[idx] = e;
                gamma1[idx] = e * cos2phi - b * sin2phi;
                gamma2[idx] = e * sin2phi + b * cos2phi;
            }
        }
        let real = |mut buffer: Vec<Complex64>| {
            fft2(&mut buffer, n, FftDirection::Inverse);
            let values: Vec<f64> = buffer.iter().map(|c| c.re).collect();
            DMatrix::from_row_slice(n, n, &values)
        };
        let mut kappa = real(kappa);
        let mut gamma1 = real(gamma1);
        let mut gamma2 = real(gamma2);

        let variance = (gamma1.norm_squared() + gamma2.norm_squared()) / (n * n) as f64;
        let rescale = if variance > 0. {
            shear_rms / variance.sqrt()
        } else {
            0.
        };
        kappa *= rescale;
        gamma1 *= rescale;
        gamma2 *= rescale;
        log::debug!("shear field rescaled by {rescale:.3e}");
        Self {
            kappa,
            gamma1,
            gamma2,
        }
    }
    /// Mean of `|γ|^2`
    pub fn shear_variance(&self) -> f64 {
        (self.gamma1.norm_squared() + self.gamma2.norm_squared()) / self.kappa.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn fft_round_trip() {
        let n = 6;
        let data: Vec<_> = (0..n * n)
            .map(|i| Complex64::new((i as f64 * 0.7).sin(), (i as f64 * 0.3).cos()))
            .collect();
        let mut buffer = data.clone();
        fft2(&mut buffer, n, FftDirection::Forward);
        fft2(&mut buffer, n, FftDirection::Inverse);
        for (a, b) in data.iter().zip(&buffer) {
            assert_relative_eq!(a.re, b.re / (n * n) as f64, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im / (n * n) as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn fft_of_constant() {
        let n = 4;
        let mut buffer = vec![Complex64::new(1., 0.); n * n];
        fft2(&mut buffer, n, FftDirection::Forward);
        assert_relative_eq!(buffer[0].re, 16., epsilon = 1e-12);
        assert!(buffer[1..].iter().all(|c| c.norm() < 1e-12));
    }

    #[test]
    fn wavenumbers() {
        let d = 0.5;
        assert_eq!(wavenumber(0, 8, d), 0.);
        assert_relative_eq!(wavenumber(1, 8, d), 2. * PI / 4.);
        assert_relative_eq!(wavenumber(4, 8, d), -2. * PI);
        assert_relative_eq!(wavenumber(7, 8, d), -2. * PI / 4.);
    }

    #[test]
    fn shear_variance() {
        let mut rng = StdRng::seed_from_u64(7812);
        let field = Realization::draw(&mut rng, Grid::new(16, 1.), 1., 0.01);
        assert_relative_eq!(field.shear_variance(), 1e-4, max_relative = 1e-10);
        assert_relative_eq!(field.kappa.mean(), 0., epsilon = 1e-12);
    }

    #[test]
    fn reproducible() {
        let draw = |seed| {
            Realization::draw(&mut StdRng::seed_from_u64(seed), Grid::new(8, 1.), 1., 0.1)
        };
        let (a, b) = (draw(12), draw(12));
        assert_eq!(a.gamma1, b.gamma1);
        assert_eq!(a.kappa, b.kappa);
        assert_ne!(a.gamma1, draw(13).gamma1);
    }
}

use std::path::PathBuf;

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use psf_model::{image::images_to_npy, Image, Position, PsfConfig, RenderMode};
use rayon::prelude::*;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "psf-grid",
    about = "Render PSF kernel images over a grid of image positions"
)]
struct Opt {
    /// Path to a pickled PSF configuration (default: "PSF_CONFIG" env var)
    #[structopt(short, long)]
    config: Option<PathBuf>,
    /// Number of positions per image side
    #[structopt(short, long, default_value = "8")]
    n: usize,
    /// Rendering mode: centered or offset
    #[structopt(short, long, default_value = "offset")]
    mode: RenderMode,
    /// Output ".npy" file
    #[structopt(short, long, default_value = "psf-grid.npy")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let config = match opt.config {
        Some(path) => PsfConfig::load(path)?,
        None => PsfConfig::from_env().unwrap_or_else(|e| {
            log::info!("{e}, using the default configuration");
            PsfConfig::default()
        }),
    };
    let psf = config.build()?;

    // positions offset from the pixel centers by a varying sub-pixel phase
    let n = opt.n.max(1);
    let step = config.image_dim as f64 / n as f64;
    let positions: Vec<_> = (0..n * n)
        .map(|k| {
            let (i, j) = (k % n, k / n);
            let phase = k as f64 / (n * n) as f64;
            Position::new(i as f64 * step + phase, j as f64 * step + phase)
        })
        .collect();
    log::info!(
        "rendering {} {}x{} PSFs ({})",
        positions.len(),
        psf.dim(),
        psf.dim(),
        opt.mode
    );

    let pb = ProgressBar::new(positions.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")?);
    let images = positions
        .par_iter()
        .progress_with(pb)
        .map(|&position| psf.render(position, opt.mode))
        .collect::<Result<Vec<Image>, _>>()?;

    let flux: Vec<f64> = images.iter().map(|image| image.sum()).collect();
    let (min, max) = flux
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &f| (a.min(f), b.max(f)));
    println!("PSF flux range: [{:.6}, {:.6}]", min, max);

    images_to_npy(&images, &opt.output)?;
    log::info!("PSF cube written to {:?}", opt.output);
    Ok(())
}

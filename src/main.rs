use std::path::PathBuf;

use psf_model::{Position, PsfConfig, PsfKind, RenderMode};
use structopt::StructOpt;
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, EnumString)]
#[strum(serialize_all = "kebab-case")]
enum Kind {
    Fixed,
    PowerSpectrum,
}

#[derive(Debug, StructOpt)]
#[structopt(name = "psf-model", about = "Render a PSF kernel image at a sub-pixel position")]
struct Opt {
    /// Path to a pickled PSF configuration (default: "PSF_CONFIG" env var)
    #[structopt(short, long)]
    config: Option<PathBuf>,
    /// Image position along x [pixel]
    #[structopt(short, long, default_value = "8.5")]
    x: f64,
    /// Image position along y [pixel]
    #[structopt(short, long, default_value = "10.1")]
    y: f64,
    /// Rendering mode: centered or offset
    #[structopt(short, long, default_value = "offset")]
    mode: RenderMode,
    /// PSF kind: fixed or power-spectrum
    #[structopt(short, long)]
    kind: Option<Kind>,
    /// Kernel image size [pixel]
    #[structopt(short, long)]
    dim: Option<usize>,
    /// Power spectrum field seed
    #[structopt(short, long)]
    seed: Option<u64>,
    /// Output ".npy" file
    #[structopt(short, long, default_value = "psf.npy")]
    output: PathBuf,
    /// Save the configuration to a pickle file
    #[structopt(long)]
    save_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = match opt.config {
        Some(path) => PsfConfig::load(path)?,
        None => PsfConfig::from_env().unwrap_or_else(|e| {
            log::info!("{e}, using the default configuration");
            PsfConfig::default()
        }),
    };
    let is_fixed = matches!(config.kind, PsfKind::Fixed { .. });
    match opt.kind {
        Some(Kind::Fixed) if !is_fixed => config.kind = PsfKind::gaussian(0.9),
        Some(Kind::PowerSpectrum) if is_fixed => config.kind = PsfKind::power_spectrum(),
        _ => (),
    }
    if let Some(dim) = opt.dim {
        config.psf_dim = dim;
    }
    if let Some(seed) = opt.seed {
        config.seed = seed;
    }
    if let Some(path) = opt.save_config {
        config.save(&path)?;
        log::info!("configuration saved to {path:?}");
    }

    let psf = config.build()?;
    let position = Position::new(opt.x, opt.y);
    let image = psf.render(position, opt.mode)?;

    let (nx, ny) = image.dimensions();
    println!("PSF ({:?}) at {} [{}]:", config.kind, position, opt.mode);
    println!(" - shape : {}x{}", nx, ny);
    println!(" - origin: {:?}", image.xy0());
    println!(" - flux  : {:.6}", image.sum());
    println!(" - peak  : {:.6}", image.max());
    if let Some((xc, yc)) = image.centroid() {
        println!(" - center: ({:.3}, {:.3})", xc, yc);
    }

    image.to_npy(&opt.output)?;
    log::info!("PSF image written to {:?}", opt.output);
    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use slice_renderer::{
    DicomLoader, FrameStatus, Loader, RasterSurface, Renderer2D, RendererConfig, SortBy, logging,
};

/// Render one slice of a DICOM series to a PNG file.
#[derive(Parser, Debug)]
#[command(name = "slice-render", version)]
struct Args {
    /// Directory containing the .dcm files of one series
    dir: PathBuf,

    /// Viewing plane: axial, coronal, sagittal or x, y, z
    #[arg(short = 'p', long, default_value = "axial")]
    orientation: String,

    /// Slice index along the viewing axis; the center slice when omitted
    #[arg(short, long)]
    index: Option<usize>,

    /// Output PNG path
    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Built-in colortable id (0 grayscale, 1 categorical, 2 heat)
    #[arg(short, long)]
    colortable: Option<u8>,

    /// JSON renderer configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    debug: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => RendererConfig::from_path(path)?,
        None => RendererConfig::default(),
    };

    let mut renderer = Renderer2D::new(config, &args.orientation)?;
    if let Some(id) = args.colortable {
        renderer.set_colortable(id)?;
    }
    renderer.resize(args.width, args.height);

    let mut loader = DicomLoader::new(SortBy::InstanceNumber);
    let mut volume = loader.load(&args.dir)?;
    if let Some(index) = args.index {
        let axis = renderer.orientation().axis_index();
        let applied = volume.set_index(axis, index);
        info!(requested = index, applied, "Slice selected");
    }

    let mut surface = RasterSurface::new(args.width, args.height);
    match renderer.render(Some(&volume), Some(&loader), &mut surface) {
        FrameStatus::Drawn { .. } => {}
        FrameStatus::NotReady(reason) => return Err(reason.into()),
    }

    surface.into_image().save(&args.output)?;
    info!(path = %args.output.display(), "Frame written");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

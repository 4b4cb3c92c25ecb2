use cad_import::{
    read_points_dxf, read_survey_points, write_cells_csv, write_grid_dxf, write_points_csv,
    write_report_csv, DxfEntityKind, GridLayerOptions, PointSource,
};
use clap::{Args, Parser, Subcommand};
use survey_grid::{
    config::{ExtrapolationPolicy, GridConfig, InterpolationMethod},
    pipeline::{build_surface, run_volume, VolumeBaseline},
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Grid scattered survey points and compute earthwork volumes by the square method.
#[derive(Parser)]
#[command(name = "survey_grid_cli", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Where survey points come from.
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Drawing layer holding the survey points (DXF input only)
    #[arg(long, default_value = "0")]
    layer: String,
    /// Entity type carrying the points: circle or point (DXF input only)
    #[arg(long = "entity", default_value = "circle")]
    entity: String,
}

impl SourceArgs {
    fn source(&self) -> Result<PointSource, String> {
        let kind = DxfEntityKind::from_name(&self.entity)
            .ok_or_else(|| format!("Unknown entity type {}", self.entity))?;
        Ok(PointSource {
            kind,
            layer: Some(self.layer.clone()),
        })
    }
}

/// Grid settings; flags override values from `--config`.
#[derive(Args, Debug, Clone)]
struct GridArgs {
    /// JSON file with grid settings
    #[arg(long)]
    config: Option<String>,
    /// Grid cell size in drawing units
    #[arg(long)]
    cell_size: Option<f64>,
    /// Padding around the point extents
    #[arg(long)]
    margin: Option<f64>,
    /// Interpolation method: linear or rbf
    #[arg(long)]
    method: Option<String>,
    /// Extrapolation outside the point hull: nearest or flat
    #[arg(long)]
    extrapolation: Option<String>,
}

impl GridArgs {
    fn config(&self) -> Result<GridConfig, Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => GridConfig::from_json_file(path)
                .map_err(|e| format!("Error reading {}: {}", path, e))?,
            None => GridConfig::default(),
        };
        if let Some(cell_size) = self.cell_size {
            cfg.cell_size = cell_size;
        }
        if let Some(margin) = self.margin {
            cfg.margin = margin;
        }
        if let Some(name) = &self.method {
            cfg.interpolation_method = InterpolationMethod::from_name(name)
                .ok_or_else(|| format!("Unknown interpolation method {}", name))?;
        }
        if let Some(name) = &self.extrapolation {
            cfg.extrapolation_policy = ExtrapolationPolicy::from_name(name)
                .ok_or_else(|| format!("Unknown extrapolation policy {}", name))?;
        }
        Ok(cfg)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Dump points from a DXF layer to an x,y,z CSV file.
    Extract {
        input: String,
        output: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Build the square grid and write it as a DXF layer.
    Grid {
        input: String,
        output: String,
        /// Also write the per-cell corner elevation table
        #[arg(long)]
        csv: Option<String>,
        /// Layer receiving the grid
        #[arg(long, default_value = "PY")]
        out_layer: String,
        /// Draw each cell as a 3DFACE
        #[arg(long)]
        faces: bool,
        /// Leave extrapolated nodes out of the drawing
        #[arg(long)]
        skip_extrapolated: bool,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Compute cut/fill volumes against a flat elevation or a second survey.
    Volume {
        input: String,
        /// Flat reference elevation
        #[arg(long, conflicts_with = "reference")]
        reference_elevation: Option<f64>,
        /// Second survey file gridded on the same geometry
        #[arg(long)]
        reference: Option<String>,
        /// Write the per-cell volume report
        #[arg(long)]
        csv: Option<String>,
        /// Leave cells touching extrapolated nodes out of the totals
        #[arg(long)]
        exclude_extrapolated: bool,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        grid: GridArgs,
    },
}

fn extract(input: &str, output: &str, source: &SourceArgs) -> CliResult {
    let source = source.source()?;
    let pts = read_points_dxf(input, source.kind, source.layer.as_deref())
        .map_err(|e| format!("Error reading {}: {}", input, e))?;
    write_points_csv(output, &pts).map_err(|e| format!("Error writing {}: {}", output, e))?;
    println!("Wrote {} points to {}", pts.count(), output);
    Ok(())
}

fn grid(
    input: &str,
    output: &str,
    csv: Option<&str>,
    opts: &GridLayerOptions,
    source: &SourceArgs,
    grid_args: &GridArgs,
) -> CliResult {
    let cfg = grid_args.config()?;
    let pts = read_survey_points(input, &source.source()?)
        .map_err(|e| format!("Error reading {}: {}", input, e))?;
    let (_, surface) = build_surface(&pts, &cfg)?;
    write_grid_dxf(output, &surface, opts).map_err(|e| format!("Error writing {}: {}", output, e))?;
    println!(
        "Grid: {} x {} nodes, {} extrapolated",
        surface.cols(),
        surface.rows(),
        surface.extrapolated_count()
    );
    println!("Wrote {}", output);
    if let Some(path) = csv {
        write_cells_csv(path, &surface).map_err(|e| format!("Error writing {}: {}", path, e))?;
        println!("Wrote {}", path);
    }
    Ok(())
}

fn volume(
    input: &str,
    reference_elevation: Option<f64>,
    reference: Option<&str>,
    csv: Option<&str>,
    exclude_extrapolated: bool,
    source: &SourceArgs,
    grid_args: &GridArgs,
) -> CliResult {
    let mut cfg = grid_args.config()?;
    if exclude_extrapolated {
        cfg.exclude_extrapolated = true;
    }
    let source = source.source()?;
    let pts = read_survey_points(input, &source)
        .map_err(|e| format!("Error reading {}: {}", input, e))?;
    let (_, report) = match reference {
        Some(path) => {
            let base = read_survey_points(path, &source)
                .map_err(|e| format!("Error reading {}: {}", path, e))?;
            run_volume(&pts, VolumeBaseline::Points(&base), &cfg)?
        }
        None => run_volume(
            &pts,
            VolumeBaseline::Elevation(reference_elevation.unwrap_or(0.0)),
            &cfg,
        )?,
    };
    println!("Cells: {}", report.cells.len());
    if report.excluded_cells > 0 {
        println!("Excluded cells: {}", report.excluded_cells);
    }
    println!("Cut: {:.3}", report.total_cut);
    println!("Fill: {:.3}", report.total_fill);
    println!("Net: {:.3}", report.net);
    if let Some(path) = csv {
        write_report_csv(path, &report).map_err(|e| format!("Error writing {}: {}", path, e))?;
        println!("Wrote {}", path);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose && std::env::var("RUST_LOG").is_err() {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            source,
        } => extract(&input, &output, &source),
        Commands::Grid {
            input,
            output,
            csv,
            out_layer,
            faces,
            skip_extrapolated,
            source,
            grid: grid_args,
        } => {
            let opts = GridLayerOptions {
                layer: out_layer,
                faces,
                skip_extrapolated,
                ..GridLayerOptions::default()
            };
            grid(&input, &output, csv.as_deref(), &opts, &source, &grid_args)
        }
        Commands::Volume {
            input,
            reference_elevation,
            reference,
            csv,
            exclude_extrapolated,
            source,
            grid,
        } => volume(
            &input,
            reference_elevation,
            reference.as_deref(),
            csv.as_deref(),
            exclude_extrapolated,
            &source,
            &grid,
        ),
    };
    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

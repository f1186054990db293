use anyhow::Context as _;
use duvet_core::{DepositionFitRequest, DepositionTimeScan, PeakFitRequest, Spectrum};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct SpectrumArgs {
    /// Background scan files
    #[arg(long = "background", required = true, num_args = 1..)]
    backgrounds: Vec<PathBuf>,

    /// Sample scan files; omit for a background-only spectrum
    #[arg(long = "sample", num_args = 1..)]
    samples: Vec<PathBuf>,

    /// Spectrum name used in the export header
    #[arg(long, default_value = "spectrum")]
    name: String,

    /// Description stored in the export header (required for export)
    #[arg(long)]
    description: String,

    /// Fit peaks before exporting
    #[arg(long)]
    fit: bool,

    /// Fit window in nm
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], default_values_t = [120.0, 340.0])]
    window: Vec<f64>,

    /// Candidate gaussian counts, inclusive on both ends
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], default_values_t = [1_usize, 3])]
    gaussians: Vec<usize>,

    /// Include the Rayleigh scattering baseline in the fit
    #[arg(long)]
    scattering: bool,

    /// Output path of the exported spectrum
    #[arg(long, short)]
    output: PathBuf,
}

pub(super) fn run_spectrum(args: SpectrumArgs) -> anyhow::Result<i32> {
    let mut spectrum = Spectrum::new(&args.name);
    spectrum.set_description(&args.description);

    for path in &args.backgrounds {
        spectrum
            .add_background(path)
            .with_context(|| format!("loading background '{}'", path.display()))?;
    }
    for path in &args.samples {
        spectrum
            .add_sample(path)
            .with_context(|| format!("loading sample '{}'", path.display()))?;
    }
    spectrum.average_scans().context("averaging scans")?;

    if args.fit {
        let request = PeakFitRequest {
            window: (args.window[0], args.window[1]),
            gaussian_counts: args.gaussians[0]..=args.gaussians[1],
            include_scattering: args.scattering,
            ..PeakFitRequest::default()
        };
        let fit = spectrum.fit_peaks(&request).context("fitting peaks")?;
        tracing::info!(
            gaussians = fit.gaussian_count,
            redchi2 = fit.reduced_chi_square,
            "peak fit complete"
        );
    }

    spectrum
        .export(&args.output)
        .context("exporting spectrum")?;

    let summary = serde_json::json!({
        "name": spectrum.name(),
        "points": spectrum.data().map_or(0, |data| data.len()),
        "peaks": spectrum.peaks(),
        "export": args.output,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}

#[derive(clap::Args)]
pub(super) struct DepositionArgs {
    /// Interferometry time-scan file
    input: PathBuf,

    /// Deposition window start in seconds
    #[arg(long, default_value_t = 0.0)]
    t_start: f64,

    /// Deposition window end in seconds
    #[arg(long, default_value_t = f64::INFINITY)]
    t_end: f64,

    /// Laser incidence angle in degrees
    #[arg(long, default_value_t = 22.0)]
    angle: f64,

    /// Fit the raw channel instead of the smoothed one
    #[arg(long)]
    no_smoothing: bool,

    /// Output path of the parameter table
    #[arg(long, short)]
    output: PathBuf,
}

pub(super) fn run_deposition(args: DepositionArgs) -> anyhow::Result<i32> {
    let mut scan = DepositionTimeScan::from_file(&args.input)
        .with_context(|| format!("loading time scan '{}'", args.input.display()))?;

    let request = DepositionFitRequest {
        t_start: args.t_start,
        t_end: args.t_end,
        incidence_angle_degrees: args.angle,
        smoothing: !args.no_smoothing,
        ..DepositionFitRequest::default()
    };
    let fit = scan
        .find_deposition_rate(&request)
        .context("fitting deposition curve")?
        .clone();
    tracing::info!(
        rate = fit.deposition_rate.value,
        refractive_index = fit.refractive_index.value,
        redchi2 = fit.reduced_chi_square,
        "deposition fit complete"
    );

    scan.export(&args.output).context("exporting parameters")?;

    let summary = serde_json::json!({
        "deposition_rate_nm_per_s": fit.deposition_rate,
        "refractive_index": fit.refractive_index,
        "reduced_chi_square": fit.reduced_chi_square,
        "extrema_from_fallback": fit.extrema_from_fallback,
        "export": args.output,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}

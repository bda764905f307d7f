use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use camreg_pipeline::export::{write_blob, write_registration_report};
use camreg_pipeline::{
    io, load_config, CalibrationBlob, Registrar, RegistrationConfig, RegistrationInputs,
    RegistrationReport, SidecarDetector,
};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

/// Two-camera registration from a shared calibration board.
#[derive(Debug, Parser)]
#[command(author, version, about = "Register two calibrated cameras against a shared board")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate and validate the camera-B to camera-A transform.
    Register(RegisterArgs),
    /// Print the board corner layout of a template file.
    BoardInfo {
        #[arg(long)]
        template: PathBuf,
    },
}

#[derive(Debug, clap::Args)]
struct RegisterArgs {
    #[arg(long)]
    image_a: PathBuf,
    #[arg(long)]
    image_b: PathBuf,
    /// Board template JSON (lengths in millimeters).
    #[arg(long)]
    template: PathBuf,
    #[arg(long)]
    calib_a: PathBuf,
    #[arg(long)]
    calib_b: PathBuf,
    /// Directory receiving calibration_blob.json and report.json.
    #[arg(long)]
    out_dir: PathBuf,
    /// Optional RegistrationConfig JSON. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Angular RMS threshold in radians, overriding the config.
    #[arg(long)]
    rms_threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
struct BoardInfo {
    squares_x: u32,
    squares_y: u32,
    square_length_m: f64,
    marker_length_m: f64,
    dictionary: String,
    corners: Vec<BoardCorner>,
}

#[derive(Debug, Serialize)]
struct BoardCorner {
    id: u32,
    position: [f64; 3],
}

fn registration_config(args: &RegisterArgs) -> Result<RegistrationConfig> {
    let mut config = match &args.config {
        Some(path) => load_config::<RegistrationConfig>(path)?,
        None => RegistrationConfig::default(),
    };
    if let Some(threshold) = args.rms_threshold {
        config.rms_threshold_rad = threshold;
    }
    Ok(config)
}

fn run_register(args: &RegisterArgs) -> Result<String> {
    let config = registration_config(args)?;
    let inputs = RegistrationInputs {
        image_a: args.image_a.clone(),
        image_b: args.image_b.clone(),
        template: args.template.clone(),
        calib_a: args.calib_a.clone(),
        calib_b: args.calib_b.clone(),
    };

    let loaded = inputs.load()?;
    let registrar = Registrar::with_detector(SidecarDetector, config);
    let result = registrar.register(
        &loaded.image_a,
        &loaded.image_b,
        &loaded.board,
        &loaded.intrinsics_a,
        &loaded.intrinsics_b,
    )?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    let blob = CalibrationBlob::new(&loaded.intrinsics_a, &loaded.intrinsics_b, &result.transform);
    let blob_path = args.out_dir.join("calibration_blob.json");
    write_blob(&blob_path, &blob)?;
    let report = RegistrationReport::from(&result);
    write_registration_report(&args.out_dir.join("report.json"), &report)?;
    info!("wrote {}", blob_path.display());

    Ok(serde_json::to_string_pretty(&report)?)
}

fn run_board_info(template: &Path) -> Result<String> {
    let board = io::load_template(template)?;
    let corners = board
        .geometry()
        .iter()
        .map(|(id, p)| BoardCorner {
            id,
            position: [p.x, p.y, p.z],
        })
        .collect();
    let info = BoardInfo {
        squares_x: board.squares_x,
        squares_y: board.squares_y,
        square_length_m: board.square_length,
        marker_length_m: board.marker_length,
        dictionary: board.dictionary.clone(),
        corners,
    };
    Ok(serde_json::to_string_pretty(&info)?)
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Ignore a subscriber that is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_logging();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let json = match &args.command {
        Command::Register(reg) => run_register(reg)?,
        Command::BoardInfo { template } => run_board_info(template)?,
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camreg_core::synthetic::planar;
    use image::{GrayImage, Luma};

    fn write_inputs(dir: &Path) -> RegisterArgs {
        let scene = planar::stereo_scene().unwrap();
        let args = RegisterArgs {
            image_a: dir.join("a.png"),
            image_b: dir.join("b.png"),
            template: dir.join("template.json"),
            calib_a: dir.join("calib_a.json"),
            calib_b: dir.join("calib_b.json"),
            out_dir: dir.join("out"),
            config: None,
            rms_threshold: None,
        };
        for path in [&args.image_a, &args.image_b] {
            GrayImage::from_pixel(1280, 720, Luma([0u8])).save(path).unwrap();
        }
        SidecarDetector::write(&args.image_a, &scene.detections_a()).unwrap();
        SidecarDetector::write(&args.image_b, &scene.detections_b()).unwrap();
        io::write_template(&args.template, &scene.board).unwrap();
        io::write_calibration(&args.calib_a, &scene.intrinsics_a).unwrap();
        io::write_calibration(&args.calib_b, &scene.intrinsics_b).unwrap();
        args
    }

    #[test]
    fn register_writes_blob_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_inputs(dir.path());
        let json = run_register(&args).unwrap();

        let report: RegistrationReport = serde_json::from_str(&json).unwrap();
        assert!(report.b_to_a_radians < 1e-6);
        assert!(report.a_to_b_radians < 1e-6);

        let blob: CalibrationBlob = serde_json::from_str(
            &std::fs::read_to_string(args.out_dir.join("calibration_blob.json")).unwrap(),
        )
        .unwrap();
        let cams = &blob.calibration_information.cameras;
        assert_eq!(cams.len(), 2);
        assert_eq!(cams[0].rt.translation, vec![0.0, 0.0, 0.0]);
        assert_eq!(cams[1].sensor_width, 1280);
        let scene = planar::stereo_scene().unwrap();
        let expected = camreg_pipeline::export::model_parameters(&scene.intrinsics_b);
        for (got, want) in cams[1].intrinsics.model_parameters.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        assert!(args.out_dir.join("report.json").exists());
    }

    #[test]
    fn threshold_override_rejects_registration() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = write_inputs(dir.path());
        args.rms_threshold = Some(-1.0);
        let err = run_register(&args).unwrap_err();
        assert!(err.to_string().contains("B to A"), "{err}");
        assert!(!args.out_dir.join("calibration_blob.json").exists());
    }

    #[test]
    fn config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = write_inputs(dir.path());
        let cfg = dir.path().join("cfg.json");
        std::fs::write(&cfg, r#"{"rms_threshold_rad": 0.5, "min_corners": 6}"#).unwrap();
        args.config = Some(cfg);
        let config = registration_config(&args).unwrap();
        assert_eq!(config.rms_threshold_rad, 0.5);
        assert_eq!(config.min_corners, 6);

        args.rms_threshold = Some(0.002);
        assert_eq!(registration_config(&args).unwrap().rms_threshold_rad, 0.002);
    }

    #[test]
    fn board_info_lists_corners() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_inputs(dir.path());
        let json = run_board_info(&args.template).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["corners"].as_array().unwrap().len(), 48);
        assert_eq!(value["corners"][0]["id"], 0);
        assert_eq!(value["squares_x"], 9);
    }

    #[test]
    fn missing_template_is_an_error() {
        assert!(run_board_info(Path::new("/no/such/template.json")).is_err());
    }
}

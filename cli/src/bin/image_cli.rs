use clap::{Parser, Subcommand};
use cli::ImagePlan;
use color_eyre::eyre::{eyre, Result};
use jobs::{ChannelSink, JobEvent};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};
use transforms::{ImageOperation, ModelSet, ResultHandle, Session};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a processing plan against its input image
    Process {
        /// Path to the TOML or JSON plan file
        #[arg(short, long)]
        config: PathBuf,
        /// Face detection model file
        #[arg(long)]
        face_model: Option<PathBuf>,
        /// Background matting model file
        #[arg(long)]
        matting_model: Option<PathBuf>,
        /// Super-resolution model file
        #[arg(long)]
        sr_model: Option<PathBuf>,
    },
    /// Print the JSON schema for plan operations
    Schema,
    /// Print basic information about an image file
    Info {
        /// Path to the image file
        #[arg(short, long)]
        image: PathBuf,
    },
}

struct ModelPaths {
    face: Option<PathBuf>,
    matting: Option<PathBuf>,
    sr: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            config,
            face_model,
            matting_model,
            sr_model,
        } => {
            let paths = ModelPaths {
                face: face_model,
                matting: matting_model,
                sr: sr_model,
            };
            process_plan(&config, paths)?;
        }
        Commands::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&ImageOperation::schema())?
            );
        }
        Commands::Info { image } => {
            print_info(&image)?;
        }
    }

    Ok(())
}

fn process_plan(config_path: &Path, model_paths: ModelPaths) -> Result<()> {
    let plan = ImagePlan::from_file(config_path)?;
    info!("Plan: {:?}", plan);

    std::fs::create_dir_all(&plan.output_dir)?;

    let models = load_models(model_paths)?;
    let (sender, events) = mpsc::channel();
    let mut session = Session::new(Arc::new(ChannelSink::new(sender)), models)?;

    let loaded = session.load_image(&plan.path)?;
    info!(
        "Input image: {}x{} ({})",
        loaded.width, loaded.height, loaded.encoded_size
    );

    for (index, step) in plan.steps.iter().enumerate() {
        let operation = match step.operation.clone() {
            Some(op) => op,
            None => {
                warn!(
                    "No operation found for step '{}': {}",
                    step.name,
                    step.description.clone().unwrap_or_default()
                );
                continue;
            }
        };

        let job_id = format!("step_{:03}", index + 1);
        info!("Processing step '{}' as {}", step.name, job_id);
        session.submit(&job_id, operation)?;
        let handle = wait_for_result(&events, &job_id)?;

        let output_path = Path::new(&plan.output_dir)
            .join(format!("{}.{}", step.name, handle.format.extension()));
        session.save_result(&handle, &output_path)?;
        info!(
            "Step '{}' -> {} ({}x{}, {})",
            step.name,
            output_path.display(),
            handle.width,
            handle.height,
            handle.human_size()
        );

        // Each step works on the previous step's result
        session.adopt_result(&handle)?;
    }

    info!("✅ Image processing completed!");
    Ok(())
}

fn wait_for_result(
    events: &mpsc::Receiver<JobEvent<ResultHandle>>,
    job_id: &str,
) -> Result<ResultHandle> {
    loop {
        let event = events
            .recv()
            .map_err(|_| eyre!("job engine stopped unexpectedly"))?;
        match event {
            JobEvent::Started { job_id: id } => info!("[{}] started", id),
            JobEvent::Progress { job_id: id, ratio } => {
                info!("[{}] {:.0}%", id, ratio * 100.0);
            }
            JobEvent::Completed { job_id: id, result } if id == job_id => return Ok(result),
            JobEvent::Failed { job_id: id, message } if id == job_id => {
                return Err(eyre!("step {} failed: {}", id, message));
            }
            other => warn!("unexpected event for {}", other.job_id()),
        }
    }
}

fn print_info(path: &Path) -> Result<()> {
    let encoded_size = std::fs::metadata(path)?.len();
    let image = image::open(path)?;
    println!("{}", path.display());
    println!("  dimensions: {}x{}", image.width(), image.height());
    println!(
        "  size: {}",
        image_kit_common::utils::format_file_size(encoded_size)
    );
    Ok(())
}

#[cfg(feature = "onnx")]
fn load_models(paths: ModelPaths) -> Result<ModelSet> {
    use inference::onnx::RtenModel;

    let mut models = ModelSet::unconfigured();
    if let Some(path) = paths.face {
        info!("Loading face detection model: {:?}", path);
        models = models.with_face(Arc::new(RtenModel::load(&path)?));
    }
    if let Some(path) = paths.matting {
        info!("Loading background matting model: {:?}", path);
        models = models.with_matting(Arc::new(RtenModel::load(&path)?));
    }
    if let Some(path) = paths.sr {
        info!("Loading super-resolution model: {:?}", path);
        models = models.with_super_resolution(Arc::new(RtenModel::load(&path)?));
    }
    Ok(models)
}

#[cfg(not(feature = "onnx"))]
fn load_models(paths: ModelPaths) -> Result<ModelSet> {
    if paths.face.is_some() || paths.matting.is_some() || paths.sr.is_some() {
        warn!("Built without the 'onnx' feature; model flags are ignored");
    }
    Ok(ModelSet::unconfigured())
}

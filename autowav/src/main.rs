use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libautowav::{CodecConfig, FrameDecoder};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autowav")]
#[command(version)]
#[command(about = "An experimental audio compressor using naive autoencoding", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a wav file
    Encode {
        /// A wav file to be encoded
        input: PathBuf,
        /// Path for the encoded data; the model goes next to it as <output>.model
        output: PathBuf,
        /// Training epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Frames per training step
        #[arg(long)]
        batch_size: Option<usize>,
        /// Seed for reproducible models
        #[arg(long)]
        seed: Option<u64>,
        /// Share of the machine the model may use (0.0-1.0]
        #[arg(long)]
        memory_fraction: Option<f32>,
        /// JSON file with encoding options
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Decode an encoded wav file
    Decode {
        /// Path of the encoded data; <input>.model must sit next to it
        input: PathBuf,
        /// Output prefix; the wav is written to <output>.wav
        output: PathBuf,
    },
    /// Show the parameters stored in an encoded file
    Info {
        /// Path of the encoded data
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode {
            input,
            output,
            epochs,
            batch_size,
            seed,
            memory_fraction,
            config,
        } => {
            let mut options = match config {
                Some(path) => CodecConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => CodecConfig::default(),
            };
            if let Some(e) = epochs {
                options = options.with_epochs(e);
            }
            if let Some(b) = batch_size {
                options = options.with_batch_size(b);
            }
            if let Some(s) = seed {
                options = options.with_seed(s);
            }
            if let Some(f) = memory_fraction {
                options = options.with_memory_fraction(f);
            }
            options.validate()?;

            libautowav::device::limit_memory_fraction(options.memory_fraction)?;
            encode(&input, &output, &options)?;
        }
        Commands::Decode { input, output } => {
            libautowav::device::limit_memory_fraction(
                libautowav::config::DEFAULT_MEMORY_FRACTION,
            )?;
            decode(&input, &output)?;
        }
        Commands::Info { input } => {
            info(&input)?;
        }
    }

    Ok(())
}

fn encode(input: &PathBuf, output: &PathBuf, options: &CodecConfig) -> Result<()> {
    println!("Reading {}...", input.display());
    println!(
        "Training autoencoder ({} epochs, batch {})...",
        options.epochs, options.batch_size
    );

    let summary = libautowav::encode_file(input, output, options)
        .with_context(|| format!("Failed to encode {}", input.display()))?;

    println!("  Sample rate: {} Hz", summary.params.sample_rate);
    println!("  Channels: {}", summary.params.channels);
    println!("  Duration: {:.2}s", summary.params.duration_secs());
    println!(
        "  Frames: {} x {} samples -> {} latents",
        summary.frame_count, summary.frame_length, summary.latent_width
    );
    if let Some(loss) = summary.loss {
        println!("  Final loss: {:.6}", loss);
    }
    if let Some(fraction) = libautowav::device::memory_fraction() {
        println!("  Compute share: {:.0}%", fraction * 100.0);
    }

    println!("Done!");
    println!("  Data: {}", summary.data_path.display());
    println!("  Model: {}", summary.model_path.display());

    Ok(())
}

fn decode(input: &PathBuf, output: &PathBuf) -> Result<()> {
    println!("Reading {}...", input.display());
    println!("Decoding...");

    let summary = libautowav::decode_file(input, output)
        .with_context(|| format!("Failed to decode {}", input.display()))?;

    println!("  Sample rate: {} Hz", summary.params.sample_rate);
    println!("  Channels: {}", summary.params.channels);
    println!("  Duration: {:.2}s", summary.params.duration_secs());

    println!("Done!");
    println!("  Output: {}", summary.wav_path.display());

    Ok(())
}

fn info(input: &PathBuf) -> Result<()> {
    let container = libautowav::container::read_container(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let params = container.params;

    println!("autowav Encoded File (libautowav {})", libautowav::version());
    println!("───────────────────────────────");
    println!("  Sample rate:  {} Hz", params.sample_rate);
    println!("  Channels:     {}", params.channels);
    println!("  Sample width: {} bytes", params.sample_width);
    println!("  Samples:      {}", params.sample_count);
    println!("  Duration:     {:.2}s", params.duration_secs());
    println!("  Frames:       {}", container.frame_count());
    println!("  Latent width: {}", container.latent_width());

    let model = libautowav::model_path(input);
    match libautowav::container::load::<libautowav::AutoencoderDecoder>(input) {
        Ok((_, decoder)) => println!(
            "  Model:        {} ({} -> {})",
            model.display(),
            decoder.latent_width(),
            decoder.frame_length()
        ),
        Err(e) => println!("  Model:        {} ({})", model.display(), e),
    }

    Ok(())
}

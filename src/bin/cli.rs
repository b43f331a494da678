use clap::{Args, Parser, Subcommand};
use pwctl::{
    Controller,
    types::{
        config::{AudioConfigRequest, Settings},
        pipewire::{Link, Port},
    },
    utils::{command::Mode, logging},
};
use serde::Serialize;
use std::{error::Error, path::PathBuf};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a file through pw-cat and wait for it to finish
    Play {
        file_path: PathBuf,
        #[clap(flatten)]
        audio: AudioArgs,
    },
    /// Record into a file for a number of seconds
    Record {
        file_path: PathBuf,
        /// Recording length (defaults to the configured length)
        #[clap(short, long)]
        seconds: Option<u64>,
        #[clap(flatten)]
        audio: AudioArgs,
    },
    /// List PipeWire interfaces (pw-cli ls)
    Interfaces {
        /// Only this interface type, e.g. Node, Client, Device
        #[clap(short = 't', long = "type")]
        interface_type: Option<String>,
    },
    /// List output ports grouped by node
    Outputs,
    /// List input ports grouped by node
    Inputs,
    /// List existing links
    Links,
    /// Link two nodes (either order)
    Connect { first: String, second: String },
    /// Unlink two nodes (either order)
    Disconnect { first: String, second: String },
    /// Remove one link between two ports, as printed by `links`
    Unlink { output: String, input: String },
    /// List pw-cat playback or record targets
    Targets {
        #[clap(short, long)]
        record: bool,
    },
    /// PipeWire library versions
    Version,
    /// Show or save the settings file
    Config {
        #[clap(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigActions {
    /// Print the settings in use
    Show,
    /// Write the settings in use to the settings file
    Save,
}

#[derive(Args, Debug, Default)]
struct AudioArgs {
    /// Sample rate, e.g. 44100 or 48000
    #[clap(long)]
    rate: Option<u32>,
    /// Number of channels (1 or 2)
    #[clap(long)]
    channels: Option<u8>,
    /// Sample format (u8, s8, s16, s32, f32, f64)
    #[clap(long)]
    format: Option<String>,
    /// Stream volume between 0.0 and 1.0
    #[clap(long)]
    volume: Option<f32>,
    /// Resampler quality (0-10)
    #[clap(long)]
    quality: Option<u8>,
    /// Node id or name to play to / record from
    #[clap(long)]
    target: Option<String>,
    /// Node latency, e.g. 100ms
    #[clap(long)]
    latency: Option<String>,
    #[clap(long)]
    media_type: Option<String>,
    #[clap(long)]
    media_category: Option<String>,
    #[clap(long)]
    media_role: Option<String>,
    /// Channel map, e.g. stereo or FL,FR
    #[clap(long)]
    channel_map: Option<String>,
}

impl From<AudioArgs> for AudioConfigRequest {
    fn from(args: AudioArgs) -> Self {
        AudioConfigRequest {
            rate: args.rate,
            channels: args.channels,
            format: args.format,
            volume: args.volume,
            quality: args.quality,
            target: args.target,
            latency: args.latency,
            media_type: args.media_type,
            media_category: args.media_category,
            media_role: args.media_role,
            channel_map: args.channel_map,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings = Settings::load_or_default();
    let controller = Controller::system(settings);

    match cli.command {
        Commands::Play { file_path, audio } => {
            let output = controller.play(&file_path, &audio.into()).await?;
            println!("Played {}", file_path.display());
            print_streams(&output.stdout, &output.stderr);
        }
        Commands::Record {
            file_path,
            seconds,
            audio,
        } => {
            let record = controller
                .record(&file_path, &audio.into(), seconds)
                .await?;
            if record.timed_out() {
                println!("Recorded {} until the deadline", file_path.display());
            } else {
                println!(
                    "Recorder stopped early ({}): {}",
                    record
                        .output
                        .code
                        .map_or_else(|| "no exit code".to_string(), |code| code.to_string()),
                    file_path.display()
                );
            }
            print_streams(&record.output.stdout, &record.output.stderr);
        }
        Commands::Interfaces { interface_type } => {
            let interfaces = controller
                .list_interfaces(interface_type.as_deref())
                .await?;
            print_json(&interfaces)?;
        }
        Commands::Outputs => print_json(&controller.list_outputs().await?)?,
        Commands::Inputs => print_json(&controller.list_inputs().await?)?,
        Commands::Links => print_json(&controller.list_links().await?)?,
        Commands::Connect { first, second } => {
            let (a, b) = resolve_pair(&controller, &first, &second).await?;
            let status = controller.connect(&a, &b).await?;
            println!("{} <-> {} : {:?}", first, second, status);
        }
        Commands::Disconnect { first, second } => {
            let (a, b) = resolve_pair(&controller, &first, &second).await?;
            let status = controller.disconnect(&a, &b).await?;
            println!("{} <-> {} : {:?}", first, second, status);
        }
        Commands::Unlink { output, input } => {
            let status = controller
                .disconnect_link(&Link { output, input })
                .await?;
            println!("{:?}", status);
        }
        Commands::Targets { record } => {
            let mode = if record { Mode::Record } else { Mode::Playback };
            print_json(&controller.list_targets(mode).await?)?;
        }
        Commands::Version => {
            for line in controller.version().await? {
                println!("{}", line);
            }
        }
        Commands::Config { action } => match action {
            ConfigActions::Show => print_json(controller.settings())?,
            ConfigActions::Save => {
                controller.settings().save_to_file()?;
                println!("Settings saved");
            }
        },
    }

    Ok(())
}

/// Finds the output port of one node and the input port of the other,
/// trying both orders.
async fn resolve_pair(
    controller: &Controller,
    first: &str,
    second: &str,
) -> Result<(Port, Port), Box<dyn Error>> {
    let outputs = controller.list_outputs().await?;
    let inputs = controller.list_inputs().await?;
    let find = |ports: &[Port], node: &str| ports.iter().find(|port| port.node == node).cloned();

    if let (Some(a), Some(b)) = (find(&outputs[..], first), find(&inputs[..], second)) {
        return Ok((a, b));
    }
    if let (Some(a), Some(b)) = (find(&inputs[..], first), find(&outputs[..], second)) {
        return Ok((a, b));
    }

    Err(format!("No output/input port pair between {} and {}", first, second).into())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_streams(stdout: &str, stderr: &str) {
    if !stdout.trim().is_empty() {
        println!("{}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        eprintln!("{}", stderr.trim_end());
    }
}

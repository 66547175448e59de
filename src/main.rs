// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use clap::{Parser, Subcommand};
use fforge::config::{
    self, FforgeConfig, VALID_FIELDS, is_valid_config_field, set_config_field, unset_config_field,
};
use fforge::{formats, pipeline, storage, web};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start the conversion API server")]
    Serve {
        #[arg(long, help = "Address to bind to", default_value = "127.0.0.1")]
        host: String,
        #[arg(long, help = "Port to listen on", default_value = "8000")]
        port: u16,
    },
    #[command(about = "Convert a local media file")]
    #[command(arg_required_else_help = true)]
    Convert {
        #[arg(help = "Path to the input file")]
        input: PathBuf,
        #[arg(help = "Target format (e.g., mp3, webm)")]
        to: String,
    },
    #[command(about = "List supported input formats and their allowed outputs")]
    Formats,
    #[command(about = "Display current configuration settings")]
    Config {
        #[command(subcommand)]
        config_command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    #[command(about = "Display current configuration settings")]
    Show,
    #[command(about = "Display path to configuration file")]
    Path,
    #[command(about = "Set a configuration field")]
    Set {
        #[arg(help = "Field name to set")]
        field: String,
        #[arg(help = "Value to set")]
        value: String,
    },
    #[command(about = "Unset/clear a configuration field")]
    Unset {
        #[arg(help = "Field name to unset")]
        field: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Serve { host, port }) => {
            let host: IpAddr = host.parse().map_err(|_| format!("Invalid host: {}", host))?;
            let cfg = config::load_config()?;

            if cfg.ffmpeg_path.is_empty() || cfg.ffprobe_path.is_empty() {
                eprintln!(
                    "Warning: ffmpeg_path/ffprobe_path are not configured; conversion requests will fail. Run 'fforge config set ffmpeg_path /path/to/ffmpeg'."
                );
            }

            let boot_logs = storage::ensure_directories(&cfg)?;
            for line in &boot_logs {
                println!("{}", line);
            }
            println!(
                "Starting fforge \x1b[1mAPI\x1b[0m server on http://{}:{}",
                host, port
            );

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                if let Err(e) = web::launch_server(cfg, boot_logs, host, port).await {
                    eprintln!("Error starting web server: {}", e);
                    std::process::exit(1);
                }
            });
        }
        Some(Commands::Convert { input, to }) => {
            let cfg: FforgeConfig = config::load_config()?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                match pipeline::convert_path(&input, &to, &cfg).await {
                    Ok(output) => {
                        println!("Successfully converted to {}", output.display());
                    }
                    Err(e) => {
                        eprintln!("Error converting file: {}", e);
                        if let Some(details) = &e.details {
                            eprintln!("{}", details);
                        }
                        std::process::exit(1);
                    }
                }
            });
        }
        Some(Commands::Formats) => {
            for input in formats::input_formats() {
                let outputs = formats::allowed_outputs(input).unwrap_or(&[]);
                println!("{} -> {}", input, outputs.join(", "));
            }
        }
        Some(Commands::Config { config_command }) => match config_command {
            Some(ConfigCommands::Show) => {
                let cfg: FforgeConfig = config::load_config()?;
                let json_output = serde_json::to_string_pretty(&cfg)?;
                println!("{}", json_output);
            }
            Some(ConfigCommands::Path) => {
                let config_path = confy::get_configuration_file_path("fforge", "config")?;
                println!("{}", config_path.display());
            }
            Some(ConfigCommands::Set { field, value }) => {
                if !is_valid_config_field(&field) {
                    eprintln!(
                        "Error: Unknown field '{}'. Valid fields are: {}",
                        field, VALID_FIELDS
                    );
                    std::process::exit(1);
                }

                let mut cfg: FforgeConfig = config::load_config()?;

                if let Err(e) = set_config_field(&mut cfg, &field, &value) {
                    eprintln!("Error setting field: {}", e);
                    std::process::exit(1);
                }

                config::store_config(&cfg)?;
                println!("Set {} = {}", field, value);
            }
            Some(ConfigCommands::Unset { field }) => {
                if !is_valid_config_field(&field) {
                    eprintln!(
                        "Error: Unknown field '{}'. Valid fields are: {}",
                        field, VALID_FIELDS
                    );
                    std::process::exit(1);
                }

                let mut cfg: FforgeConfig = config::load_config()?;

                if let Err(e) = unset_config_field(&mut cfg, &field) {
                    eprintln!("Error unsetting field: {}", e);
                    std::process::exit(1);
                }

                config::store_config(&cfg)?;
                println!("Unset {}", field);
            }
            None => {}
        },
        None => {}
    }

    Ok(())
}

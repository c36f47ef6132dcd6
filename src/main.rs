use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::error;

use crate::core::app::{App, AppError, AppSettings};

mod assets;
mod controllers;
mod core;
mod render;

/// Textured Blinn-Phong model viewer with a free-fly camera.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OBJ model to display, overrides the settings file
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Base colour texture, overrides the settings file
    #[arg(short, long)]
    texture: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut settings = match &cli.config {
        Some(path) => AppSettings::load(path)?,
        None => AppSettings::default(),
    };

    if let Some(model) = cli.model {
        settings.assets.model = model;
    }
    if let Some(texture) = cli.texture {
        settings.assets.texture = Some(texture);
    }

    let mut app = pollster::block_on(App::new(&settings))?;
    app.run()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

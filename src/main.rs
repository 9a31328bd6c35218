use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use scene_viewer::SceneConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SceneConfig::parse();
    log::debug!("{config:?}");

    match scene_viewer::run(config).context("scene viewer failed") {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

//! `mce` - export rendered frame sequences to per-channel videos.

mod cli;

use std::process::ExitCode;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Parser;

use mce_core::config::{ConfigManager, Settings};
use mce_core::encoder::EncoderLocator;
use mce_core::logging::{init_tracing, LogCallback, LogLevel};
use mce_core::models::{ChannelSpec, LoopSpec, RunSummary};
use mce_core::orchestrator::ChannelRunner;
use mce_core::project::{ProjectLayout, DEFAULT_CHANNELS};

use cli::{Cli, Command, EncodeArgs, SetupArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_verbosity(cli.verbosity));

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Run the command, returning whether it succeeded overall.
fn run(cli: &Cli) -> Result<bool> {
    let config_path = cli.config_path();
    let mut config = ConfigManager::new(&config_path);
    config
        .load_or_create()
        .with_context(|| format!("loading settings from {}", config_path.display()))?;
    config
        .ensure_dirs_exist()
        .context("creating working directories")?;

    match &cli.command {
        Command::Setup(args) => setup(&mut config, args).map(|_| true),
        Command::Render { channels } => {
            let settings = config.settings();
            let specs = channels
                .iter()
                .map(|name| {
                    settings.channel(name).cloned().ok_or_else(|| {
                        anyhow!(
                            "unknown channel '{}' (configured: {})",
                            name,
                            configured_names(settings)
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            render(cli, settings, &specs)
        }
        Command::RenderAll => {
            let settings = config.settings();
            if settings.channels.is_empty() {
                bail!(
                    "no channels configured in {}; run `mce setup --project <name>` first",
                    config_path.display()
                );
            }
            render(cli, settings, &settings.channels)
        }
        Command::Encode(args) => {
            let settings = config.settings();
            let spec = adhoc_channel(settings, args)?;
            render(cli, settings, std::slice::from_ref(&spec))
        }
        Command::LocateEncoder => {
            let locator =
                EncoderLocator::new().with_explicit_path(config.settings().encoder.explicit_path());
            let path = locator.locate()?;
            println!("{}", path.display());
            Ok(true)
        }
    }
}

fn setup(config: &mut ConfigManager, args: &SetupArgs) -> Result<()> {
    if let Some(root) = &args.output_root {
        config.settings_mut().paths.output_root = root.display().to_string();
    }

    let settings = config.settings();
    let layout = ProjectLayout::new(&settings.paths.output_root);
    let fps = args.fps.unwrap_or(settings.encoder.default_fps);
    let quality = args
        .quality
        .map(Into::into)
        .unwrap_or(settings.encoder.default_quality);
    let loop_spec = settings.loop_defaults.loop_spec();

    let created = layout
        .create_dirs(&DEFAULT_CHANNELS)
        .with_context(|| format!("creating directories under {}", layout.root().display()))?;
    for dir in &created {
        println!("created {}", dir.display());
    }

    let defaults = layout.default_channels(&args.project, fps, quality, loop_spec);
    let channels = &mut config.settings_mut().channels;
    channels.retain(|c| !defaults.iter().any(|d| d.name.eq_ignore_ascii_case(&c.name)));
    channels.extend(defaults);

    config.save().context("saving settings")?;
    println!(
        "project '{}' ready in {} (settings: {})",
        args.project,
        layout.root().display(),
        config.path().display()
    );
    for channel in DEFAULT_CHANNELS {
        println!("  {:<8} frames -> {}", channel, layout.frames_dir(channel).display());
    }
    Ok(())
}

fn adhoc_channel(settings: &Settings, args: &EncodeArgs) -> Result<ChannelSpec> {
    let loop_spec = if args.loop_enabled {
        let hold = args.hold_frames.unwrap_or(settings.loop_defaults.hold_frames);
        LoopSpec::looped(hold).map_err(anyhow::Error::msg)?
    } else {
        LoopSpec::disabled()
    };

    Ok(ChannelSpec::new(
        &args.name,
        &args.frames_dir,
        &args.base_name,
        &args.output,
    )
    .with_fps(args.fps.unwrap_or(settings.encoder.default_fps))
    .with_quality(
        args.quality
            .map(Into::into)
            .unwrap_or(settings.encoder.default_quality),
    )
    .with_loop(loop_spec)
    .with_overrides(args.overrides()))
}

fn render(cli: &Cli, settings: &Settings, specs: &[ChannelSpec]) -> Result<bool> {
    let runner = ChannelRunner::new(settings.clone())
        .with_parallel(cli.parallel || settings.staging.parallel)
        .with_log_callback(|channel| {
            let channel = channel.to_string();
            Some(Box::new(move |msg: &str| println!("[{}] {}", channel, msg)) as LogCallback)
        });

    let summary = runner.run_all(specs);
    print_summary(&summary);

    if let Some(path) = &cli.summary {
        summary
            .save_json(path)
            .with_context(|| format!("writing summary to {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    Ok(summary.success())
}

fn print_summary(summary: &RunSummary) {
    println!();
    for result in &summary.channels {
        let status = if result.success { "OK" } else { "FAILED" };
        println!("[{}] {}: {}", status, result.channel_name, result.message);
    }
    println!(
        "{} of {} channel(s) exported",
        summary.succeeded().count(),
        summary.channels.len()
    );
}

fn configured_names(settings: &Settings) -> String {
    if settings.channels.is_empty() {
        return "none".to_string();
    }
    settings
        .channels
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

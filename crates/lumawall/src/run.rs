use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use renderer::{run_preview, PreviewOptions};
use tracing_subscriber::EnvFilter;
use wallconfig::{EffectEntry, WallConfig};

use crate::cli::{Cli, Command, RunArgs};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let (config_path, explicit) = match cli.run.config.clone() {
        Some(path) => (path, true),
        None => (AppPaths::discover()?.config_file(), false),
    };
    tracing::debug!(path = %config_path.display(), explicit, "resolved config path");

    let mut config = load_config(&config_path, explicit)?;
    apply_overrides(&mut config, &cli.run);

    match cli.command {
        Some(Command::Config) => print_config(&config_path, &config),
        None => run_window(config, cli.run),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// An explicit `--config` must exist; the default location may be absent.
fn load_config(path: &Path, explicit: bool) -> Result<WallConfig> {
    let config = if explicit {
        WallConfig::load(path)
    } else {
        WallConfig::load_or_default(path)
    };
    config.with_context(|| format!("failed to load config from {}", path.display()))
}

fn apply_overrides(config: &mut WallConfig, args: &RunArgs) {
    if let Some(scaling) = args.scaling {
        config.scaling = scaling;
    }
    let overrides = [
        (&mut config.effects.blur, args.blur),
        (&mut config.effects.darken, args.darken),
        (&mut config.effects.vignette, args.vignette),
        (&mut config.effects.grayscale, args.grayscale),
        (&mut config.effects.parallax, args.parallax),
    ];
    for (entry, percent) in overrides {
        if let Some(percent) = percent {
            *entry = EffectEntry::from_percent(percent);
        }
    }
    if args.adaptive_brightness {
        config.adaptive_brightness = true;
    }
}

fn print_config(path: &Path, config: &WallConfig) -> Result<()> {
    let state = if path.exists() { "found" } else { "absent, using defaults" };
    println!("# config: {} ({state})", path.display());
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn run_window(config: WallConfig, args: RunArgs) -> Result<()> {
    let images = existing_images(args.images);
    if images.is_empty() {
        tracing::warn!("no images given; the preview will stay black");
    }
    tracing::info!(
        images = images.len(),
        scaling = %config.scaling_mode(),
        width = args.size.width,
        height = args.size.height,
        "starting lumawall preview"
    );

    run_preview(PreviewOptions {
        title: "lumawall".to_string(),
        size: args.size,
        images,
        effects: config.effects_config(),
        scaling: config.scaling_mode(),
        renderer: config.renderer_config(),
        controller: config.controller_config(),
    })
}

fn existing_images(images: Vec<PathBuf>) -> Vec<PathBuf> {
    images
        .into_iter()
        .filter(|path| {
            let exists = path.is_file();
            if !exists {
                tracing::warn!(path = %path.display(), "skipping missing image");
            }
            exists
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use renderer::{EffectSetting, ScalingMode};

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["lumawall"];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap().run
    }

    #[test]
    fn flags_override_config_file_values() {
        let mut config = WallConfig::from_toml_str(
            "scaling = \"stretch\"\n[effects.blur]\nenabled = true\npercent = 80\n[effects.darken]\nenabled = true\npercent = 20",
        )
        .unwrap();
        apply_overrides(
            &mut config,
            &args(&["--blur", "0", "--vignette", "35", "--scaling", "fit"]),
        );

        let effects = config.effects_config();
        assert_eq!(config.scaling_mode(), ScalingMode::Fit);
        assert_eq!(effects.blur, EffectSetting::off());
        assert_eq!(effects.vignette, EffectSetting::new(true, 35));
        assert_eq!(effects.darken, EffectSetting::new(true, 20));
        assert!(!effects.adaptive_brightness);
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(&missing, true).is_err());
        assert_eq!(load_config(&missing, false).unwrap(), WallConfig::default());
    }

    #[test]
    fn missing_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.png");
        std::fs::write(&present, b"").unwrap();
        let kept = existing_images(vec![present.clone(), dir.path().join("gone.png")]);
        assert_eq!(kept, vec![present]);
    }
}

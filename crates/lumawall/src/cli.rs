use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::SurfaceSize;
use wallconfig::Scaling;

#[derive(Parser, Debug)]
#[command(
    name = "lumawall",
    author,
    version,
    about = "Live wallpaper renderer for still images",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Image files to cycle through; Space or Right advances.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<PathBuf>,

    /// Configuration file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_surface_size,
        default_value = "1280x720"
    )]
    pub size: SurfaceSize,

    /// Image scaling: `fill`, `fit`, `stretch`, or `none`.
    #[arg(long, value_name = "MODE", value_parser = parse_scaling)]
    pub scaling: Option<Scaling>,

    /// Blur strength in percent (0 disables).
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub blur: Option<u32>,

    /// Darken strength in percent (0 disables).
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub darken: Option<u32>,

    /// Vignette strength in percent (0 disables).
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub vignette: Option<u32>,

    /// Grayscale strength in percent (0 disables).
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub grayscale: Option<u32>,

    /// Parallax travel in percent (0 disables).
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub parallax: Option<u32>,

    /// Balance dark and bright pictures towards a common mean luminance.
    #[arg(long)]
    pub adaptive_brightness: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved config path and the effective configuration.
    Config,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<SurfaceSize, String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }
    Ok(SurfaceSize::new(width, height))
}

pub fn parse_scaling(value: &str) -> Result<Scaling, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "fill" | "cover" => Ok(Scaling::Fill),
        "fit" | "contain" => Ok(Scaling::Fit),
        "stretch" => Ok(Scaling::Stretch),
        "none" | "native" => Ok(Scaling::None),
        other => Err(format!(
            "unknown scaling mode '{other}'; expected fill, fit, stretch, or none"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_accepts_common_separators() {
        assert_eq!(
            parse_surface_size("1920x1080").unwrap(),
            SurfaceSize::new(1920, 1080)
        );
        assert_eq!(
            parse_surface_size(" 800 X 600 ").unwrap(),
            SurfaceSize::new(800, 600)
        );
        assert!(parse_surface_size("1920").is_err());
        assert!(parse_surface_size("0x1080").is_err());
        assert!(parse_surface_size("widexhigh").is_err());
    }

    #[test]
    fn scaling_accepts_aliases() {
        assert_eq!(parse_scaling("FIT").unwrap(), Scaling::Fit);
        assert_eq!(parse_scaling("cover").unwrap(), Scaling::Fill);
        assert!(parse_scaling("zoom").is_err());
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "lumawall",
            "--blur",
            "40",
            "--scaling",
            "fit",
            "--adaptive-brightness",
            "a.png",
            "b.jpg",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.images.len(), 2);
        assert_eq!(cli.run.blur, Some(40));
        assert_eq!(cli.run.scaling, Some(Scaling::Fit));
        assert_eq!(cli.run.size, SurfaceSize::new(1280, 720));
        assert!(cli.run.adaptive_brightness);
    }

    #[test]
    fn percent_flags_are_range_checked() {
        assert!(Cli::try_parse_from(["lumawall", "--vignette", "101"]).is_err());
    }

    #[test]
    fn config_subcommand_parses() {
        let cli = Cli::try_parse_from(["lumawall", "--config", "/tmp/x.toml", "config"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Config)));
        assert_eq!(cli.run.config, Some(PathBuf::from("/tmp/x.toml")));
    }
}

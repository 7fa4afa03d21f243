use crate::config::toml_config::ScoutConfig;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "coop-scout")]
#[command(about = "Fetch co-op listings, score them against your profile and keep the good ones")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "coop-scout.toml")]
    pub config: String,

    /// Override scoring.min_score
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_score: Option<u8>,

    /// Override output.path
    #[arg(long)]
    pub output_path: Option<String>,

    /// Do not mark qualifying jobs as interested on the portal
    #[arg(long)]
    pub no_favorite: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliArgs {
    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&self, config: &mut ScoutConfig) {
        if let Some(min_score) = self.min_score {
            tracing::info!("🔧 min_score overridden to: {}", min_score);
            config.scoring.min_score = min_score;
        }
        if let Some(path) = &self.output_path {
            tracing::info!("🔧 output path overridden to: {}", path);
            config.output.path = path.clone();
        }
        if self.no_favorite {
            config.output.favorite = false;
        }
    }
}

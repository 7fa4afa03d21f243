use anyhow::Context;
use clap::Parser;
use coop_scout::core::CancelToken;
use coop_scout::utils::{logger, validation::Validate};
use coop_scout::{
    CliArgs, Credentials, LocalStorage, OpenAiModel, PortalClient, Scorer, ScoutConfig,
    ScoutEngine, ScoutError, ScoutPipeline,
};
use std::sync::Arc;

fn exit_with(e: &ScoutError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("📁 Loading configuration from: {}", args.config);
    let mut config = ScoutConfig::from_file(&args.config).unwrap_or_else(|e| {
        let err = match e {
            ScoutError::Io(io) => ScoutError::ConfigError {
                message: format!("cannot read '{}': {}", args.config, io),
            },
            other => other,
        };
        exit_with(&err)
    });
    args.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let credentials = Credentials::from_env().unwrap_or_else(|e| exit_with(&e));

    let portal = Arc::new(
        PortalClient::new(config.portal.clone(), &credentials.portal_cookie)
            .unwrap_or_else(|e| exit_with(&e)),
    );
    let model = OpenAiModel::new(credentials.openai_api_key.clone(), &config.scoring)
        .context("failed to build the language model client")?;
    let scorer = Scorer::new(Arc::new(model), &config.profile, &config.scoring);
    let storage = LocalStorage::new(config.output.path.clone());

    let pipeline = ScoutPipeline::new(storage, config, portal.clone(), scorer, portal);

    // Ctrl-C：完成目前這筆評分後停止
    let cancel = CancelToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupt received, finishing the current listing");
            ctrl_c_token.cancel();
        }
    });

    let engine = ScoutEngine::with_cancel(pipeline, cancel);
    match engine.run().await {
        Ok(summary) => {
            println!("✅ Co-op scout run completed!");
            println!(
                "📊 {} fetched, {} scored, {} unscored, {} qualifying",
                summary.fetched, summary.scored, summary.unscored, summary.qualifying
            );
            if summary.favorite_failures > 0 {
                println!(
                    "⚠️ {} jobs could not be favorited, see the log for ids",
                    summary.favorite_failures
                );
            }
            if summary.cancelled {
                println!("🛑 Run was interrupted; results cover the listings scored so far");
            }
            println!("📁 Output saved to: {}", summary.output_path);
            Ok(())
        }
        Err(e) => exit_with(&e),
    }
}

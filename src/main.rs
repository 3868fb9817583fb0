use clap::Parser;
use classi_rank::utils::{logger, validation::Validate};
use classi_rank::{build_engine, AppConfig, AppState, ServerArgs};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();

    // 載入 TOML 配置 (檔案不存在時使用預設值)
    let mut config = match AppConfig::from_file_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file is valid TOML format");
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(args.verbose, &config.logging.level);
    } else {
        logger::init_compact_logger(args.verbose, &config.logging.level);
    }

    tracing::info!("Starting classi-rank server");
    tracing::debug!("Effective config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let engine = build_engine(&config).await?;
    let listener = TcpListener::bind(config.bind_addr()?).await?;

    classi_rank::api::serve(listener, AppState::new(engine)).await?;
    Ok(())
}

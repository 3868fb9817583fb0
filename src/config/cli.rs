use crate::config::toml_config::{AppConfig, StorageBackend, DEFAULT_CONFIG_PATH};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Memory,
    File,
}

impl From<BackendArg> for StorageBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => StorageBackend::Memory,
            BackendArg::File => StorageBackend::File,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "classi-rank")]
#[command(about = "Pairwise course ranking server")]
pub struct ServerArgs {
    /// Path to TOML configuration file (optional)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override server.bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Override storage.backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Override storage.data_dir
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Log as JSON instead of compact text
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ServerArgs {
    /// 命令列參數覆蓋 TOML 設定
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend.into();
        }
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
            // 指定資料目錄即代表使用檔案儲存
            if self.backend.is_none() {
                config.storage.backend = StorageBackend::File;
            }
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let args = ServerArgs::parse_from([
            "classi-rank",
            "--bind",
            "0.0.0.0:9000",
            "--data-dir",
            "/tmp/rank",
            "--json-logs",
        ]);
        let mut config = AppConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, "/tmp/rank");
        assert!(config.json_logs());
    }

    #[test]
    fn test_explicit_memory_backend_wins_over_data_dir() {
        let args = ServerArgs::parse_from([
            "classi-rank",
            "--backend",
            "memory",
            "--data-dir",
            "/tmp/rank",
        ]);
        let mut config = AppConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }
}

//! Runtime configuration: command-line flags, each with an environment fallback.

use clap::builder::BoolishValueParser;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Personal finance tracker backend
#[derive(Parser, Debug, Clone)]
#[command(name = "fintrack-server", version, about)]
pub struct AppConfig {
    /// Postgres connection string; SQLite is used when absent or unreachable
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// SQLite database file (defaults to <data-dir>/transactions.db)
    #[arg(long, value_name = "FILE", env = "DB_FILE")]
    pub db_file: Option<PathBuf>,

    /// Directory for the CSV snapshot, backups and failed-save dumps
    #[arg(long, value_name = "DIR", env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Shared secret that elevates a session; open mode when unset
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    pub admin_secret: Option<String>,

    /// Allow an empty save to clear stored transactions
    #[arg(long, env = "ALLOW_EMPTY_SAVE", value_parser = BoolishValueParser::new())]
    pub allow_empty_save: bool,

    /// Periodically back up the SQLite database
    #[arg(long, env = "ENABLE_BACKUPS", value_parser = BoolishValueParser::new())]
    pub enable_backups: bool,

    #[arg(long, env = "BACKUP_INTERVAL_SECS", default_value_t = 3600)]
    pub backup_interval_secs: u64,

    /// Copy the SQLite database into an empty Postgres table at startup
    #[arg(long = "migrate-from-sqlite", env = "MIGRATE_SQLITE_TO_PG", value_parser = BoolishValueParser::new())]
    pub migrate_from_sqlite: bool,

    /// CSV read by the importer (defaults to the snapshot file)
    #[arg(long = "import-file", value_name = "FILE", env = "IMPORT_CSV")]
    pub import_file: Option<PathBuf>,

    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 43_200)]
    pub session_ttl_secs: u64,

    #[arg(long = "bind", env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Directory served as the browser frontend
    #[arg(long, value_name = "DIR", env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    /// SQLite-only configuration rooted at `data_dir`
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: None,
            db_file: None,
            data_dir: data_dir.into(),
            admin_secret: None,
            allow_empty_save: false,
            enable_backups: false,
            backup_interval_secs: 3600,
            migrate_from_sqlite: false,
            import_file: None,
            session_ttl_secs: 43_200,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: None,
        }
    }

    pub fn db_file(&self) -> PathBuf {
        self.db_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("transactions.db"))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("transactions.csv")
    }

    pub fn import_file(&self) -> PathBuf {
        self.import_file.clone().unwrap_or_else(|| self.snapshot_path())
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    pub fn failed_saves_dir(&self) -> PathBuf {
        self.data_dir.join("failed-saves")
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs.max(1))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_derive_paths_from_data_dir() {
        let config = AppConfig::try_parse_from(["fintrack-server", "--data-dir", "/srv/fin"]).unwrap();

        assert_eq!(config.db_file(), PathBuf::from("/srv/fin/transactions.db"));
        assert_eq!(config.import_file(), PathBuf::from("/srv/fin/transactions.csv"));
        assert_eq!(config.backups_dir(), PathBuf::from("/srv/fin/backups"));
        assert_eq!(config.failed_saves_dir(), PathBuf::from("/srv/fin/failed-saves"));
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert!(!config.allow_empty_save);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::try_parse_from([
            "fintrack-server",
            "--db-file",
            "/tmp/other.db",
            "--import-file",
            "/tmp/seed.csv",
            "--allow-empty-save",
            "--bind",
            "0.0.0.0:8080",
        ])
        .unwrap();

        assert_eq!(config.db_file(), PathBuf::from("/tmp/other.db"));
        assert_eq!(config.import_file(), PathBuf::from("/tmp/seed.csv"));
        assert!(config.allow_empty_save);
        assert_eq!(config.bind_addr.port(), 8080);
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

use crate::resource::dispatcher::DEFAULT_ERROR_PAGES;

/// Lowest port the server agrees to bind.
pub const MIN_PORT: u16 = 1024;
/// Upper bound on the worker pool.
pub const MAX_WORKERS: u16 = 16;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_ROOT: &str = "www/html";
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Command line.
#[derive(Debug, Clone, Parser)]
#[command(name = "filehttpd", about = "Serve and modify files over HTTP")]
pub struct Args {
    /// Port to listen on (at least 1024)
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    pub port: u16,

    /// Maximum number of connections handled at once (1 to 16)
    #[arg(value_parser = clap::value_parser!(u16).range(1..=16))]
    pub workers: u16,

    /// Document root
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// YAML file with additional settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Optional settings read from `--config`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub root: Option<PathBuf>,
    pub error_pages: Option<PathBuf>,
    pub shutdown_grace_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub document_root: PathBuf,
    /// Error-page directory, relative to the document root
    pub error_pages: PathBuf,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Resolves the final configuration.
    ///
    /// Precedence: command line, then `FILEHTTPD_HOST` / `FILEHTTPD_ROOT`,
    /// then the YAML file, then built-in defaults.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(args, file, |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        args: &Args,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        if args.port < MIN_PORT {
            anyhow::bail!("Port number should be greater or equal to {MIN_PORT}");
        }
        if args.workers == 0 || args.workers > MAX_WORKERS {
            anyhow::bail!("Number of workers should be between 1 and {MAX_WORKERS}");
        }

        let host = env("FILEHTTPD_HOST")
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let document_root = args
            .root
            .clone()
            .or_else(|| env("FILEHTTPD_ROOT").map(PathBuf::from))
            .or(file.root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

        Ok(Self {
            host,
            port: args.port,
            workers: usize::from(args.workers),
            document_root,
            error_pages: file
                .error_pages
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_PAGES)),
            shutdown_grace: file
                .shutdown_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

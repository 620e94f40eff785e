//! Configuration management for the resize proxy.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `RESIZE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Run Modes
//!
//! | Arguments                               | Mode                     |
//! |-----------------------------------------|--------------------------|
//! | `--server`, or no `--url`               | HTTP server              |
//! | `--url` with positive `-w` and `-h`     | One-shot resize          |
//! | anything else                           | Usage, exit code 1       |
//!
//! The single-dash spellings `-url`, `-server`, `-format`, `-width` and
//! `-height` are accepted as aliases for their double-dash forms. Because
//! `-h` is the height, help is only available as `--help`.
//!
//! # Environment Variables
//!
//! - `RESIZE_HOST` - Server bind address (default: 0.0.0.0)
//! - `RESIZE_PORT` - Server port (default: 8080)
//! - `RESIZE_CACHE_DIR` - Variant cache directory (default: ./cache)
//! - `RESIZE_MEMORY_CACHE_SIZE` - Decoded originals kept in memory (default: 10)
//! - `RESIZE_FETCH_TIMEOUT` - Source download timeout in seconds (default: 30)
//! - `RESIZE_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `RESIZE_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};

use crate::error::ResizeError;
use crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::resize::{OutputFormat, ResizeRequest, DEFAULT_ORIGINAL_CACHE_CAPACITY};
use crate::server::parse_source_url;
use crate::storage::DEFAULT_CACHE_DIR;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default output format token.
pub const DEFAULT_FORMAT: &str = "jpg";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Single-dash long flags accepted for compatibility.
const SINGLE_DASH_FLAGS: &[&str] = &["url", "server", "format", "width", "height", "help"];

// =============================================================================
// CLI Arguments
// =============================================================================

/// Resize Proxy - on-demand image resizing with a persistent variant cache.
///
/// Resizes a remote image once (`--url` with `-w` and `-h`) or serves
/// resize requests over HTTP (`--server`).
#[derive(Parser, Debug, Clone)]
#[command(name = "resize-proxy")]
#[command(author, version, about, long_about = None, disable_help_flag = true)]
pub struct Config {
    // =========================================================================
    // One-shot Resize
    // =========================================================================
    /// URL of the image to resize.
    #[arg(long, default_value = "")]
    pub url: String,

    /// Output format (jpg, png, webp).
    #[arg(short = 'f', long, default_value = DEFAULT_FORMAT)]
    pub format: String,

    /// Desired width.
    #[arg(short = 'w', long, default_value_t = 0)]
    pub width: u32,

    /// Desired height.
    #[arg(short = 'h', long, default_value_t = 0)]
    pub height: u32,

    /// Run as HTTP server.
    #[arg(long, default_value_t = false)]
    pub server: bool,

    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "RESIZE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RESIZE_PORT")]
    pub port: u16,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "RESIZE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "RESIZE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Directory holding resized variants.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "RESIZE_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Maximum number of decoded source images kept in memory.
    #[arg(long, default_value_t = DEFAULT_ORIGINAL_CACHE_CAPACITY, env = "RESIZE_MEMORY_CACHE_SIZE")]
    pub memory_cache_size: usize,

    /// Timeout for downloading a source image, in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "RESIZE_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

/// What the binary should do for a given configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Run the HTTP server until killed
    Serve,
    /// Resize one image and exit
    OneShot(OneShotRequest),
    /// Print usage and exit with status 1
    Usage,
}

/// Raw one-shot arguments. The format token is validated when the request
/// is built so an unknown format fails like any other pipeline error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShotRequest {
    pub url: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
}

impl OneShotRequest {
    /// Validate into a resize request.
    pub fn to_request(&self) -> Result<ResizeRequest, ResizeError> {
        let url = parse_source_url(&self.url)?;
        let format: OutputFormat = self.format.parse()?;
        ResizeRequest::new(url, format, self.width, self.height)
    }
}

impl Config {
    /// Parse configuration from an argument list, accepting single-dash
    /// long flags.
    pub fn parse_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(normalize_args(args))
    }

    /// Like [`Config::parse_args`] but returns parse errors.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Write the usage text to `out`.
    pub fn write_usage(out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", Self::command().render_help())
    }

    /// Decide the run mode.
    pub fn run_mode(&self) -> RunMode {
        if self.server || self.url.is_empty() {
            RunMode::Serve
        } else if self.width > 0 && self.height > 0 {
            RunMode::OneShot(OneShotRequest {
                url: self.url.clone(),
                format: self.format.clone(),
                width: self.width,
                height: self.height,
            })
        } else {
            RunMode::Usage
        }
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err("cache_dir must not be empty".to_string());
        }

        if self.memory_cache_size == 0 {
            return Err("memory_cache_size must be greater than 0".to_string());
        }

        if self.fetch_timeout == 0 {
            return Err("fetch_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Rewrite `-url`, `-server`, ... to `--url`, `--server`, ...
///
/// Also handles the `-url=value` form. The first argument (program name)
/// and anything after `--` are left untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;

    for (index, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if index == 0 || passthrough {
            out.push(arg);
            continue;
        }

        let rewritten = arg.to_str().and_then(|s| {
            if s == "--" {
                return None;
            }
            let flag = s.strip_prefix('-')?;
            if flag.starts_with('-') {
                return None;
            }
            let name = flag.split('=').next().unwrap_or(flag);
            SINGLE_DASH_FLAGS
                .contains(&name)
                .then(|| OsString::from(format!("-{}", s)))
        });

        if arg == "--" {
            passthrough = true;
        }
        out.push(rewritten.unwrap_or(arg));
    }

    out
}

// =============================================================================
// Tests
// =============================================================================

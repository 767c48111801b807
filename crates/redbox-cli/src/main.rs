// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! redbox - resolve JavaScript stack traces to original sources.
//!
//! Reads an error (message line followed by the stack) from a file or stdin
//! and prints either the parsed call sites or the resolved frames with code
//! context.

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use redbox_cli_config::{
	load_config_with_cli, CliOverrides, LogFormat, LoggingConfig, RedboxConfig,
};
use redbox_frames::{parse, FileFetcher, Fetcher, FrameEngine, HttpFetcher, SuppressionRules};
use redbox_frames_core::CapturedError;

use crate::render::{render_raw, render_resolved, NO_ACTIONABLE_FRAMES};

#[derive(Parser, Debug)]
#[command(name = "redbox", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long, global = true)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the call sites found in a stack trace
	Parse {
		/// File holding the error text; stdin when omitted
		file: Option<PathBuf>,

		/// Print frames as JSON
		#[arg(long)]
		json: bool,
	},
	/// Resolve a stack trace to original source positions
	Resolve(ResolveArgs),
}

#[derive(ClapArgs, Debug)]
struct ResolveArgs {
	/// File holding the error text; stdin when omitted
	file: Option<PathBuf>,

	/// URL of a bundle whose text is supplied with --bundle-file
	#[arg(long, requires = "bundle_file")]
	bundle: Option<String>,

	/// Local copy of the bundle named by --bundle
	#[arg(long, requires = "bundle")]
	bundle_file: Option<PathBuf>,

	/// Treat frames as original positions inside this bundle
	#[arg(long, value_name = "URL")]
	unmap: Option<String>,

	/// Lines of context on each side of a frame
	#[arg(long, value_name = "N")]
	context: Option<usize>,

	/// Read bundles and maps from this build directory
	#[arg(long, conflicts_with = "base_url")]
	root: Option<PathBuf>,

	/// Fetch relative bundle URLs against this origin
	#[arg(long, value_name = "URL")]
	base_url: Option<String>,

	/// Print frames as JSON
	#[arg(long)]
	json: bool,
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		let mut overrides = CliOverrides {
			log_level: args.log_level.clone(),
			log_format: args.json_logs.then(|| "json".to_string()),
			config_file: args.config.clone(),
			..Default::default()
		};
		if let Command::Resolve(resolve) = &args.command {
			overrides.context_size = resolve.context;
			overrides.base_url = resolve.base_url.clone();
			overrides.root_dir = resolve.root.clone();
		}
		overrides
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let level = logging.level.as_str();
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(format!(
			"warn,redbox={level},redbox_cli={level},redbox_frames={level},redbox_frames_symbolicate={level},redbox_common_http={level}"
		))
	});

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().pretty().with_writer(std::io::stderr))
				.init();
		}
	}
}

async fn read_input(file: Option<&PathBuf>) -> Result<String> {
	match file {
		Some(path) => tokio::fs::read_to_string(path)
			.await
			.with_context(|| format!("failed to read {}", path.display())),
		None => {
			let mut text = String::new();
			tokio::io::stdin()
				.read_to_string(&mut text)
				.await
				.context("failed to read stdin")?;
			Ok(text)
		}
	}
}

/// Split error text into its message line and the full stack.
fn captured_error(text: &str) -> CapturedError {
	let message = text.lines().next().unwrap_or_default().trim_end();
	CapturedError::new(message, text)
}

fn build_fetcher(config: &RedboxConfig) -> Result<Arc<dyn Fetcher>> {
	if let Some(root) = &config.fetch.root_dir {
		debug!(root = %root.display(), "reading bundles from disk");
		return Ok(Arc::new(FileFetcher::new(root.clone())));
	}

	let retry = &config.retry;
	let mut fetcher = HttpFetcher::with_timeout(config.fetch.timeout)
		.context("failed to build HTTP client")?
		.retry_config(redbox_common_http::RetryConfig {
			max_attempts: retry.max_attempts,
			base_delay: retry.base_delay,
			max_delay: retry.max_delay,
			backoff_factor: retry.backoff_factor,
			jitter: retry.jitter,
		});
	if let Some(base_url) = &config.fetch.base_url {
		let base_url = Url::parse(base_url).context("invalid base URL")?;
		debug!(%base_url, "fetching bundles over HTTP");
		fetcher = fetcher.base_url(base_url);
	}
	Ok(Arc::new(fetcher))
}

async fn build_engine(config: &RedboxConfig, args: &ResolveArgs) -> Result<FrameEngine> {
	let mut builder = FrameEngine::builder(build_fetcher(config)?)
		.context_size(config.resolve.context_size)
		.suppression(SuppressionRules {
			dependency_marker: config.resolve.dependency_marker.clone(),
			instrumentation_marker: config.resolve.instrumentation_marker.clone(),
		});

	if let (Some(url), Some(path)) = (&args.bundle, &args.bundle_file) {
		let text = tokio::fs::read_to_string(path)
			.await
			.with_context(|| format!("failed to read bundle {}", path.display()))?;
		builder = builder.bundle(url.clone(), text);
	}

	Ok(builder.build())
}

async fn run_parse(file: Option<&PathBuf>, json: bool) -> Result<()> {
	let text = read_input(file).await?;
	let frames = parse(&text);
	debug!(frames = frames.len(), "parsed input");

	if json {
		println!("{}", serde_json::to_string_pretty(&frames)?);
	} else {
		print!("{}", render_raw(&frames));
	}
	Ok(())
}

async fn run_resolve(config: &RedboxConfig, args: &ResolveArgs) -> Result<()> {
	let text = read_input(args.file.as_ref()).await?;
	let mut error = captured_error(&text);
	if let Some(bundle_url) = &args.unmap {
		error = error.with_unmap_source(bundle_url.clone());
	}

	let engine = build_engine(config, args).await?;
	let frames = engine
		.get_stack_frames(&error, false, config.resolve.context_size)
		.await
		.context("failed to resolve stack frames")?;

	match (frames, args.json) {
		(Some(frames), true) => println!("{}", serde_json::to_string_pretty(&frames)?),
		(Some(frames), false) => print!("{}", render_resolved(&error.message, &frames)),
		(None, true) => println!("null"),
		(None, false) => println!("{NO_ACTIONABLE_FRAMES}"),
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config =
		load_config_with_cli(CliOverrides::from(&args)).context("failed to load configuration")?;

	init_tracing(&config.logging);

	info!(version = env!("CARGO_PKG_VERSION"), "starting redbox");

	match &args.command {
		Command::Parse { file, json } => run_parse(file.as_ref(), *json).await,
		Command::Resolve(resolve) => run_resolve(&config, resolve).await,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_resolve_args_map_to_overrides() {
		let args = Args::try_parse_from([
			"redbox",
			"resolve",
			"error.txt",
			"--context",
			"5",
			"--base-url",
			"http://localhost:3000/",
			"--log-level",
			"debug",
		])
		.unwrap();

		let overrides = CliOverrides::from(&args);
		assert_eq!(overrides.context_size, Some(5));
		assert_eq!(overrides.base_url.as_deref(), Some("http://localhost:3000/"));
		assert_eq!(overrides.log_level.as_deref(), Some("debug"));
		assert!(overrides.root_dir.is_none());
	}

	#[test]
	fn test_root_conflicts_with_base_url() {
		let result = Args::try_parse_from([
			"redbox",
			"resolve",
			"--root",
			"build",
			"--base-url",
			"http://localhost:3000/",
		]);
		assert!(result.is_err());
	}

	#[test]
	fn test_bundle_requires_bundle_file() {
		assert!(Args::try_parse_from(["redbox", "resolve", "--bundle", "/static/js/bundle.js"]).is_err());
		assert!(Args::try_parse_from([
			"redbox",
			"resolve",
			"--bundle",
			"/static/js/bundle.js",
			"--bundle-file",
			"build/static/js/bundle.js",
		])
		.is_ok());
	}

	#[test]
	fn test_json_logs_sets_format() {
		let args = Args::try_parse_from(["redbox", "--json-logs", "parse"]).unwrap();
		let overrides = CliOverrides::from(&args);
		assert_eq!(overrides.log_format.as_deref(), Some("json"));
		assert!(overrides.context_size.is_none());
	}

	#[test]
	fn test_captured_error_takes_first_line_as_message() {
		let error = captured_error("TypeError: x is null\n    at f (bundle.js:1:2)\n");
		assert_eq!(error.message, "TypeError: x is null");
		assert!(error.stack_text().contains("bundle.js:1:2"));

		assert_eq!(captured_error("").message, "");
	}
}

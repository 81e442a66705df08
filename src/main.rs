//! Zero-shot classifier — HTTP service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI flags
//!   3. Load settings
//!   4. Resolve effective log level (CLI > RUST_LOG > settings) and init logger
//!   5. Build the classifier context (labels, then engine) — fatal on error
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Serve HTTP until shutdown

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use zeroshot_classifier::config;
use zeroshot_classifier::error::AppError;
use zeroshot_classifier::http;
use zeroshot_classifier::logger;
use zeroshot_classifier::service::ClassifierContext;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args()?;

    let mut config = config::load(args.config_path.as_deref())?;
    if let Some(path) = args.labels_path {
        config.labels_path = path;
    }

    logger::init(&config.server, args.log_level.as_deref())?;
    let effective_log_level = logger::effective_level(&config.server, args.log_level.as_deref());

    info!(
        bind = %config.server.bind,
        labels_path = %config.labels_path.display(),
        engine = %config.engine.provider,
        configured_log_level = %config.server.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    // Model loading is slow and blocking; keep it off the async workers.
    let ctx = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || ClassifierContext::initialize(&config))
            .await
            .map_err(|e| AppError::Startup(format!("initialisation task failed: {e}")))??
    };

    info!(num_labels = ctx.labels().len(), "classifier ready — starting http");

    let shutdown = CancellationToken::new();

    // Ctrl-C handler — cancels the token so the server drains and exits.
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    http::serve(&config.server.bind, Arc::new(ctx), shutdown).await
}

struct CliArgs {
    log_level: Option<String>,
    config_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
}

fn parse_cli_args() -> Result<CliArgs, AppError> {
    let mut verbosity = 0u8;
    let mut explicit_level = None;
    let mut config_path = None;
    let mut labels_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: zeroshot-classifier [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Settings file (default: config/default.toml)");
                println!("  -l, --labels <PATH>        Label file (default: classifiers.config)");
                println!("      --log-level <LEVEL>    error | warn | info | debug | trace");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                println!();
                println!("The default engine is \"onnx\", which needs a build with `--features onnx`.");
                println!("Without it, set `provider = \"uniform\"` under [engine] for a smoke run.");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| AppError::Config("-f/--config requires a path argument".into()))?;
                config_path = Some(PathBuf::from(path));
            }
            "-l" | "--labels" => {
                let path = iter
                    .next()
                    .ok_or_else(|| AppError::Config("-l/--labels requires a path argument".into()))?;
                labels_path = Some(config::expand_home(&path));
            }
            "--log-level" => {
                let level = iter
                    .next()
                    .ok_or_else(|| AppError::Config("--log-level requires a value".into()))?;
                logger::parse_level(&level)?;
                explicit_level = Some(level);
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            other => {
                return Err(AppError::Config(format!("unrecognised argument '{other}' (see --help)")));
            }
        }
    }

    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug
    //   -vvvv+  → trace
    let verbosity_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    Ok(CliArgs {
        log_level: explicit_level.or(verbosity_level.map(str::to_string)),
        config_path,
        labels_path,
    })
}

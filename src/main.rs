//! kasten-audit: Kasten K10 backup compliance report for a Kubernetes cluster

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use kasten_audit_core::{ActionOrder, AuditConfig};
use kasten_audit_report::Auditor;
use kasten_rs::{ConnectOptions, KastenClient};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

/// kasten-audit: check Kasten K10 health, profiles and per-namespace RPO
#[derive(Parser, Debug)]
#[command(name = "kasten-audit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Namespace Kasten is installed in (default: kasten-io)
    #[arg(short, long, env = "KASTEN_NAMESPACE")]
    namespace: Option<String>,

    /// Helm release name of Kasten (default: k10)
    #[arg(short, long, env = "KASTEN_RELEASE")]
    release: Option<String>,

    /// Path to kubeconfig file (default: in-cluster, then ~/.kube/config)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(short, long)]
    context: Option<String>,

    /// Read timeout for each API request, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Namespaces whose backup actions are fetched concurrently (default: 4)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Order backup actions before looking for the last successful one
    /// (newest-first or as-listed)
    #[arg(long)]
    action_order: Option<ActionOrder>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Log file path (default: stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Logging settings, built once and handed to the audit run
#[derive(Debug, Clone)]
struct LogConfig {
    debug: bool,
    format: LogFormat,
    file: Option<PathBuf>,
}

impl LogConfig {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            debug: cli.debug,
            format: cli.log_format,
            file: cli.log_file.clone(),
        }
    }

    fn filter(&self) -> Result<EnvFilter> {
        self.filter_from(&std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default())
    }

    /// `RUST_LOG` style directives over a WARN (or DEBUG) default, with
    /// quieter HTTP/TLS crates in debug mode
    fn filter_from(&self, directives: &str) -> Result<EnvFilter> {
        let level = if self.debug { LevelFilter::DEBUG } else { LevelFilter::WARN };
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .parse_lossy(directives);

        if !self.debug {
            return Ok(filter);
        }
        Ok(filter
            .add_directive("h2=info".parse()?)
            .add_directive("hyper=info".parse()?)
            .add_directive("hyper_util=info".parse()?)
            .add_directive("tower=info".parse()?)
            .add_directive("rustls=info".parse()?))
    }

    fn writer(&self) -> Result<BoxMakeWriter> {
        Ok(match &self.file {
            Some(path) => BoxMakeWriter::new(File::create(path)?),
            None => BoxMakeWriter::new(std::io::stderr),
        })
    }

    /// Build the subscriber without installing it globally
    fn subscriber(&self) -> Result<impl tracing::Subscriber + Send + Sync + 'static> {
        let writer = self.writer()?;
        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(self.file.is_none())
                .with_target(false)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .boxed(),
        };

        Ok(tracing_subscriber::registry().with(layer).with(self.filter()?))
    }
}

/// Turn CLI flags (and their env fallbacks) into connection and audit settings
fn resolve(cli: Cli) -> (ConnectOptions, AuditConfig) {
    let connect = ConnectOptions {
        kubeconfig: cli.kubeconfig,
        context: cli.context,
        timeout: cli.timeout.map(Duration::from_secs),
    };
    let config = AuditConfig::resolve(cli.namespace, cli.release, cli.concurrency, cli.action_order);
    (connect, config)
}

async fn run(connect: ConnectOptions, config: AuditConfig) -> Result<()> {
    tracing::info!(
        namespace = %config.namespace,
        release = %config.release,
        action_order = %config.action_order,
        "Starting kasten-audit"
    );

    let (client, source) = KastenClient::connect(&connect).await?;
    let auditor = Auditor::new(client, config);

    let mut stdout = std::io::stdout().lock();
    let summary = auditor.run(&mut stdout, source).await?;

    tracing::info!(?summary, "Audit finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize error handling
    color_eyre::install()?;

    // Install crypto provider (needed for rustls)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let logging = LogConfig::from_cli(&cli);
    let subscriber = logging.subscriber()?;

    let (connect, config) = resolve(cli);
    run(connect, config).with_subscriber(subscriber).await
}

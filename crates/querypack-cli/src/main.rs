//! querypack CLI
//!
//! The `qpack` command builds query packages and retrieves evaluation content.
//!
//! ## Commands
//!
//! - `pack`: Assemble a question, files and references into an archive
//! - `inspect`: Decode an archive and print its package details
//! - `publish`: Put an archive into a local content store
//! - `fetch`: Fetch raw content by identifier, with retries
//! - `result`: Fetch a justification and print the parsed evaluation result

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use content_gateway::{
    ContentSink, ContentSource, FetchOptions, FsContentStore, GatewayConfig, HttpGateway,
    RetryingFetcher,
};
use querypack_core::{
    EvaluationResult, ExternalRef, JuryParameters, LogFormat, PackageAssembler, PackageReader,
    PackageRequest, PrimaryDocument, ResultParser, SupportingFile,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "qpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build query packages and retrieve evaluation results", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "QPACK_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a query package archive
    Pack {
        /// Question put to the jury
        #[arg(short, long)]
        query: String,

        /// Outcome label (repeat for each outcome, in order)
        #[arg(short = 'l', long = "outcome")]
        outcomes: Vec<String>,

        /// Supporting file to bundle: PATH or PATH=DESCRIPTION
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// External reference: CID=NAME or CID=NAME=DESCRIPTION
        #[arg(short, long = "ref")]
        refs: Vec<String>,

        /// Support hash (pure external reference)
        #[arg(long = "support")]
        support: Vec<String>,

        /// JSON file with jury parameters (NUMBER_OF_OUTCOMES, AI_NODES, ITERATIONS)
        #[arg(long)]
        jury: Option<PathBuf>,

        /// Where to write the archive
        #[arg(short, long)]
        output: PathBuf,

        /// Also publish the archive into this local content store
        #[arg(long, env = "QPACK_STORE")]
        store: Option<PathBuf>,
    },

    /// Print the package details of an archive as JSON
    Inspect {
        /// Archive path
        path: PathBuf,
    },

    /// Put an archive into a local content store and print its identifier
    Publish {
        /// Archive path
        path: PathBuf,

        /// Content store directory
        #[arg(long, env = "QPACK_STORE")]
        store: PathBuf,
    },

    /// Fetch raw content by identifier
    Fetch {
        /// Content identifier (a comma-joined list with --query-package)
        id: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Only dereference the first identifier of a comma-joined list
        #[arg(long)]
        query_package: bool,

        /// Write the content here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a justification and print the parsed evaluation result as JSON
    Result {
        /// Justification identifier
        id: String,

        /// Outcome label to show when the result carries none (repeatable)
        #[arg(short = 'l', long = "outcome")]
        outcomes: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Where content is fetched from, and how hard to try.
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Gateway base URL (defaults to QPACK_GATEWAY_URL or https://ipfs.io)
    #[arg(long, conflicts_with = "store")]
    gateway: Option<String>,

    /// Read from a local content store instead of a gateway
    #[arg(long)]
    store: Option<PathBuf>,

    /// Total fetch attempts
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Fixed delay between attempts, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    backoff_ms: u64,
}

impl SourceArgs {
    fn open(&self) -> Result<Arc<dyn ContentSource>> {
        if let Some(dir) = &self.store {
            let store = FsContentStore::new(dir)
                .with_context(|| format!("Failed to open content store {}", dir.display()))?;
            return Ok(Arc::new(store));
        }

        let mut config = GatewayConfig::from_env();
        if let Some(url) = &self.gateway {
            config.gateway_url = url.clone();
        }
        let gateway = HttpGateway::new(config).context("Failed to build gateway client")?;
        Ok(Arc::new(gateway))
    }

    fn options(&self, query_package: bool) -> FetchOptions {
        FetchOptions {
            max_retries: self.retries,
            backoff_ms: self.backoff_ms,
            is_query_package: query_package,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    querypack_core::init_tracing(format, level);

    match cli.command {
        Commands::Pack {
            query,
            outcomes,
            files,
            refs,
            support,
            jury,
            output,
            store,
        } => {
            let request = build_request(query, outcomes, &files, &refs, support, jury.as_deref())?;
            cmd_pack(request, &output, store.as_deref()).await
        }
        Commands::Inspect { path } => cmd_inspect(&path),
        Commands::Publish { path, store } => cmd_publish(&path, &store).await,
        Commands::Fetch {
            id,
            source,
            query_package,
            output,
        } => cmd_fetch(&id, &source, query_package, output.as_deref()).await,
        Commands::Result {
            id,
            outcomes,
            source,
        } => cmd_result(&id, &outcomes, &source).await,
    }
}

fn build_request(
    query: String,
    outcomes: Vec<String>,
    files: &[String],
    refs: &[String],
    support: Vec<String>,
    jury: Option<&Path>,
) -> Result<PackageRequest> {
    let mut request = PackageRequest::new(PrimaryDocument::new(query).with_outcomes(outcomes));

    for arg in files {
        let (path, description) = match arg.split_once('=') {
            Some((path, description)) => (path, description),
            None => (arg.as_str(), ""),
        };
        let path = Path::new(path);
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?;
        request = request.with_file(SupportingFile::new(name, bytes, description));
    }

    for arg in refs {
        request = request.with_external_ref(parse_ref(arg)?);
    }

    for hash in support {
        request = request.with_support(hash);
    }

    if let Some(path) = jury {
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read jury file {}", path.display()))?;
        let params: JuryParameters =
            serde_json::from_slice(&raw).context("Failed to parse jury parameters as JSON")?;
        request = request.with_jury(params);
    }

    Ok(request)
}

/// `CID=NAME` or `CID=NAME=DESCRIPTION`
fn parse_ref(arg: &str) -> Result<ExternalRef> {
    let mut parts = arg.splitn(3, '=');
    let cid = parts.next().unwrap_or_default();
    let Some(name) = parts.next() else {
        bail!("Invalid --ref {arg:?}: expected CID=NAME[=DESCRIPTION]");
    };
    let description = parts.next().unwrap_or_default();
    Ok(ExternalRef::new(cid, name, description))
}

async fn cmd_pack(request: PackageRequest, output: &Path, store: Option<&Path>) -> Result<()> {
    let archive = PackageAssembler::default()
        .build_archive(request)
        .context("Failed to assemble package")?;

    write_atomic(output, &archive.bytes)?;
    info!(digest = %archive.digest, bytes = archive.bytes.len(), "package written");

    println!("Package:  {}", output.display());
    println!("Digest:   {}", archive.digest);
    println!("Entries:  {}", archive.manifest.additional.len() + 1);

    if let Some(dir) = store {
        let id = publish_bytes(dir, output, &archive.bytes).await?;
        println!("Published: {}", id);
    }
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let details = PackageReader::default()
        .read_archive(&bytes)
        .with_context(|| format!("Failed to read package {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}

async fn cmd_publish(path: &Path, store: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    PackageReader::default()
        .read_archive(&bytes)
        .with_context(|| format!("Refusing to publish invalid package {}", path.display()))?;
    let id = publish_bytes(store, path, &bytes).await?;
    println!("{}", id);
    Ok(())
}

async fn publish_bytes(store: &Path, path: &Path, bytes: &[u8]) -> Result<String> {
    let store = FsContentStore::new(store)
        .with_context(|| format!("Failed to open content store {}", store.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("package");
    let id = store
        .put(name, bytes)
        .await
        .context("Failed to store package")?;
    info!(id = %id, "package published");
    Ok(id)
}

async fn cmd_fetch(
    id: &str,
    source: &SourceArgs,
    query_package: bool,
    output: Option<&Path>,
) -> Result<()> {
    let fetcher = RetryingFetcher::new(source.open()?);
    let bytes = fetcher
        .fetch(id, &source.options(query_package))
        .await
        .with_context(|| format!("Failed to fetch {id}"))?;

    match output {
        Some(path) => {
            write_atomic(path, &bytes)?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => std::io::stdout()
            .write_all(&bytes)
            .context("Failed to write to stdout")?,
    }
    Ok(())
}

async fn cmd_result(id: &str, outcomes: &[String], source: &SourceArgs) -> Result<()> {
    let fetcher = RetryingFetcher::new(source.open()?);
    let bytes = fetcher
        .fetch(id, &source.options(false))
        .await
        .with_context(|| format!("Failed to fetch justification {id}"))?;
    let result = labelled_result(&bytes, outcomes);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Parse a justification; labels carried by the content override `outcomes`.
fn labelled_result(bytes: &[u8], outcomes: &[String]) -> EvaluationResult {
    let mut result = ResultParser::new().parse(bytes);
    result.outcome_labels = result.labels_or(outcomes);
    result
}

/// Write via a temp file in the destination directory, then rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

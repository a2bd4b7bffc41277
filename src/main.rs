//! haul - batched file operations from the command line.
//!
//! Usage:
//!   haul ls [PATH]                     List a directory
//!   haul copy SRC... DEST              Copy entries, renaming on conflict
//!   haul mv SRC... DEST                Move entries, renaming on conflict
//!   haul rm PATH...                    Delete entries
//!   haul compress SRC... [--name N]    Bundle entries into an archive
//!   haul extract ARCHIVE [--to DIR]    Unpack an archive
//!   haul --help                        Show help

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use tracing_subscriber::EnvFilter;

use haul_core::{ArchiveFormat, EngineConfig, FileEntry};
use haul_ops::{
    Engine, FileSystem, LocalFileSystem, OperationKind, OperationRequest, OperationResult,
    OperationUpdate,
};

#[derive(Parser)]
#[command(
    name = "haul",
    version,
    about = "Batched file operations with conflict resolution",
    long_about = "haul copies, moves, deletes, creates, renames, compresses and extracts \
                  entries. Name conflicts are resolved by numbering (\"a (1).txt\"), \
                  progress is reported per entry and Ctrl-C cancels between entries."
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show metadata and text statistics for an entry
    Info { path: PathBuf },

    /// Copy entries into a directory
    Copy {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },

    /// Move entries into a directory
    Mv {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },

    /// Delete entries
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Move to the trash instead of deleting permanently
        #[arg(long)]
        trash: bool,
    },

    /// Create an empty directory
    Mkdir { path: PathBuf },

    /// Create an empty file
    Touch { path: PathBuf },

    /// Rename an entry within its directory
    Rename { path: PathBuf, new_name: String },

    /// Bundle entries into an archive next to the first one
    Compress {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Archive base name (required for several entries)
        #[arg(short, long)]
        name: Option<String>,

        /// Archive format (overrides the configuration)
        #[arg(short, long)]
        format: Option<FormatArg>,
    },

    /// Unpack an archive
    Extract {
        archive: PathBuf,

        /// Destination directory (defaults to the archive's directory)
        #[arg(long)]
        to: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Zip,
    TarGz,
}

impl From<FormatArg> for ArchiveFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Zip => ArchiveFormat::Zip,
            FormatArg::TarGz => ArchiveFormat::TarGz,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "Loaded configuration");
    let fs = LocalFileSystem {
        use_trash: matches!(cli.command, Command::Rm { trash: true, .. }),
    };

    let request = match cli.command {
        Command::Ls { path } => {
            run_ls(&fs, &path, cli.json)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Info { path } => {
            run_info(&fs, &path, cli.json)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Copy {
            sources,
            destination,
        } => OperationRequest::copy(entries(&fs, &sources)?, directory(&fs, &destination)?),
        Command::Mv {
            sources,
            destination,
        } => OperationRequest::cut(entries(&fs, &sources)?, directory(&fs, &destination)?),
        Command::Rm { paths, .. } => {
            let sources = entries(&fs, &paths)?;
            let parent = parent_of(&sources[0].path)?;
            OperationRequest::delete(sources, FileEntry::directory(parent))
        }
        Command::Mkdir { path } => create(&path, true)?,
        Command::Touch { path } => create(&path, false)?,
        Command::Rename { path, new_name } => {
            OperationRequest::rename(entry(&fs, &path)?, new_name)
        }
        Command::Compress {
            sources,
            name,
            format,
        } => {
            if let Some(format) = format {
                config.archive_format = format.into();
            }
            let sources = entries(&fs, &sources)?;
            let destination = FileEntry::directory(parent_of(&sources[0].path)?);
            OperationRequest::compress(sources, destination, name)
        }
        Command::Extract { archive, to } => {
            let archive = entry(&fs, &archive)?;
            let destination = match to {
                Some(dir) => directory(&fs, &dir)?,
                None => FileEntry::directory(parent_of(&archive.path)?),
            };
            OperationRequest::extract(archive, destination)
        }
    };

    let engine = Engine::new(Arc::new(fs), config);
    let result = run_request(&engine, request, cli.json).await?;

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Log to stderr; `-v` forces debug, otherwise `RUST_LOG` or warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read a TOML configuration, validated through the builder.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let parsed: EngineConfig = toml::from_str(&text).wrap_err("Invalid configuration")?;

    EngineConfig::builder()
        .archive_format(parsed.archive_format)
        .channel_size(parsed.channel_size)
        .strict_names(parsed.strict_names)
        .staging_prefix(parsed.staging_prefix)
        .build()
        .wrap_err("Invalid configuration")
}

/// Submit a request, report progress to stderr and print the result.
async fn run_request(
    engine: &Engine,
    request: OperationRequest,
    json: bool,
) -> Result<OperationResult> {
    let kind = request.kind();
    let mut handle = engine.submit(request);

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current entry...");
            cancel.cancel();
        }
    });

    let result = loop {
        match handle.recv().await {
            Some(OperationUpdate::Progress(progress)) => {
                if let Some(name) = progress.current_entry.as_deref().filter(|_| !json) {
                    eprintln!("[{}/{}] {}", progress.processed, progress.total, name);
                }
            }
            Some(OperationUpdate::Complete(result)) => break result,
            None => bail!("Operation ended without a result"),
        }
    };

    print_result(kind, &result, json)?;
    Ok(result)
}

fn print_result(kind: OperationKind, result: &OperationResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("{}", result.summary(kind));
    for path in result.succeeded() {
        println!("  {}", path.display());
    }
    for failed in result.failed() {
        println!("  failed: {}", failed.error);
    }
    Ok(())
}

/// List a directory, directories first.
fn run_ls(fs: &LocalFileSystem, path: &Path, json: bool) -> Result<()> {
    let path = absolute(path)?;
    let mut listing = fs.list(&path)?;
    listing.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for entry in &listing {
        if entry.is_dir {
            println!("{:>10}  {}/", "-", entry.name);
        } else {
            println!("{:>10}  {}", format_size(entry.size), entry.name);
        }
    }
    Ok(())
}

fn run_info(fs: &LocalFileSystem, path: &Path, json: bool) -> Result<()> {
    let properties = fs.properties(&absolute(path)?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&properties)?);
        return Ok(());
    }

    let entry = &properties.entry;
    let perms = entry.permissions;
    println!(" Path:        {}", entry.path.display());
    println!(" Type:        {}", if entry.is_dir { "directory" } else { "file" });
    println!(" Size:        {}", format_size(entry.size));
    println!(
        " Permissions: {}{}{}",
        if perms.readable { 'r' } else { '-' },
        if perms.writable { 'w' } else { '-' },
        if perms.executable { 'x' } else { '-' }
    );
    if let (Some(lines), Some(words), Some(chars)) =
        (properties.lines, properties.words, properties.chars)
    {
        println!(" Text:        {lines} lines, {words} words, {chars} characters");
    }
    Ok(())
}

fn create(path: &Path, is_directory: bool) -> Result<OperationRequest> {
    let path = absolute(path)?;
    let name = path
        .file_name()
        .ok_or_else(|| eyre!("{} has no name", path.display()))?
        .to_string_lossy()
        .into_owned();
    let parent = parent_of(&path)?;
    Ok(OperationRequest::create_entry(
        FileEntry::directory(parent),
        name,
        is_directory,
    ))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).wrap_err_with(|| format!("Invalid path {}", path.display()))
}

fn parent_of(path: &Path) -> Result<PathBuf> {
    path.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| eyre!("{} has no parent directory", path.display()))
}

/// Metadata for `path`; missing entries are left for the engine to report.
fn entry(fs: &LocalFileSystem, path: &Path) -> Result<FileEntry> {
    let path = absolute(path)?;
    Ok(fs.metadata(&path).unwrap_or_else(|_| FileEntry::file(&path)))
}

fn entries(fs: &LocalFileSystem, paths: &[PathBuf]) -> Result<Vec<FileEntry>> {
    paths.iter().map(|path| entry(fs, path)).collect()
}

fn directory(fs: &LocalFileSystem, path: &Path) -> Result<FileEntry> {
    let path = absolute(path)?;
    Ok(fs
        .metadata(&path)
        .unwrap_or_else(|_| FileEntry::directory(&path)))
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

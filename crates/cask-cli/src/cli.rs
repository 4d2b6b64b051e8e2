use std::net::SocketAddr;
use std::path::PathBuf;

use cask_types::DigestAlgorithm;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cask",
    about = "Content-hashing object store over HTTP",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML config file; flags override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List configured buckets
    Buckets,
    /// Store a local file under bucket/key
    Put(PutArgs),
    /// Write a stored object to stdout
    Cat(CatArgs),
    /// Check a stored object against a digest
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub http_addr: Option<SocketAddr>,
    #[arg(long)]
    pub fs_root: Option<PathBuf>,
    #[arg(long)]
    pub provider_dir: Option<PathBuf>,
    /// sha1 or blake3
    #[arg(long)]
    pub digest: Option<DigestAlgorithm>,
}

#[derive(Args)]
pub struct PutArgs {
    pub bucket: String,
    pub key: String,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct CatArgs {
    pub bucket: String,
    pub key: String,
    /// Inclusive byte range, START-END
    #[arg(long, value_parser = parse_range)]
    pub range: Option<(u64, u64)>,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub bucket: String,
    pub key: String,
    /// Expected digest, hex
    pub digest: String,
    /// Algorithm of the expected digest; defaults to the configured one
    #[arg(long)]
    pub algorithm: Option<DigestAlgorithm>,
}

fn parse_range(s: &str) -> Result<(u64, u64), String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got {s:?}"))?;
    let start: u64 = start.parse().map_err(|_| format!("bad range start {start:?}"))?;
    let end: u64 = end.parse().map_err(|_| format!("bad range end {end:?}"))?;
    if end < start {
        return Err(format!("range end {end} is before start {start}"));
    }
    Ok((start, end))
}

use anyhow::{bail, Context};
use cask_crypto::ContentHasher;
use cask_provider::{DiskProvider, Provider};
use cask_server::{CaskServer, ServerConfig};
use cask_store::stream::{copy_hashed, CopyLimits};
use cask_store::{CreatedObject, DiskFileSystem, FileSystem};
use cask_types::{Bucket, Digest};
use colored::Colorize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Buckets => cmd_buckets(&config).await,
        Command::Put(args) => cmd_put(&config, args).await,
        Command::Cat(args) => {
            let mut stdout = tokio::io::stdout();
            cat(&config, &args, &mut stdout).await
        }
        Command::Verify(args) => cmd_verify(&config, args).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    match &cli.config {
        Some(path) => Ok(ServerConfig::load(path)?),
        None => Ok(ServerConfig::default()),
    }
}

async fn resolve(config: &ServerConfig, bucket: &str) -> anyhow::Result<Bucket> {
    let provider = DiskProvider::new(&config.provider_dir)?;
    Ok(provider.resolve(bucket).await?)
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<DiskFileSystem> {
    DiskFileSystem::open(&config.fs_root, config.digest)
        .await
        .with_context(|| format!("cannot open store at {}", config.fs_root.display()))
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(addr) = args.http_addr {
        config.bind_addr = addr;
    }
    if let Some(root) = args.fs_root {
        config.fs_root = root;
    }
    if let Some(dir) = args.provider_dir {
        config.provider_dir = dir;
    }
    if let Some(digest) = args.digest {
        config.digest = digest;
    }
    CaskServer::open(config).await?.serve().await?;
    Ok(())
}

async fn cmd_buckets(config: &ServerConfig) -> anyhow::Result<()> {
    let provider = DiskProvider::new(&config.provider_dir)?;
    let buckets = provider.list().await?;
    if buckets.is_empty() {
        println!("No buckets in {}.", config.provider_dir.display());
        return Ok(());
    }
    for bucket in &buckets {
        let mut flags = Vec::new();
        if bucket.policy.read_only {
            flags.push("read-only".to_string());
        }
        if let Some(limit) = bucket.policy.max_object_size {
            flags.push(format!("max {limit} bytes"));
        }
        if let Some(owner) = &bucket.policy.owner {
            flags.push(owner.email.clone());
        }
        if flags.is_empty() {
            println!("{}", bucket.name.as_str().bold());
        } else {
            println!("{}  {}", bucket.name.as_str().bold(), flags.join(", ").dimmed());
        }
    }
    Ok(())
}

async fn put(config: &ServerConfig, args: &PutArgs) -> anyhow::Result<CreatedObject> {
    let bucket = resolve(config, &args.bucket).await?;
    let fs = open_store(config).await?;
    let mut file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let len = file.metadata().await?.len();
    Ok(fs.create(&bucket, &args.key, &mut file, Some(len)).await?)
}

async fn cmd_put(config: &ServerConfig, args: PutArgs) -> anyhow::Result<()> {
    let created = put(config, &args).await?;
    println!(
        "{} Stored {}/{} ({} bytes)",
        "✓".green().bold(),
        args.bucket.bold(),
        args.key,
        created.size()
    );
    println!("  {}: {}", created.hash().algorithm(), created.hash().to_hex().yellow());
    Ok(())
}

async fn cat<W>(config: &ServerConfig, args: &CatArgs, out: &mut W) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bucket = resolve(config, &args.bucket).await?;
    let object = open_store(config).await?.open(&bucket, &args.key).await?;
    let size = object.size();
    let range = match args.range {
        Some((start, end)) => start..end.saturating_add(1).min(size),
        None => 0..size,
    };
    let mut reader = object.read_range(range).await?;
    tokio::io::copy(&mut reader, out).await?;
    out.flush().await?;
    Ok(())
}

/// Re-hash a stored object with the expected digest's algorithm and
/// return `(expected, actual)`.
async fn verify(config: &ServerConfig, args: &VerifyArgs) -> anyhow::Result<(Digest, Digest)> {
    let algorithm = args.algorithm.unwrap_or(config.digest);
    let bucket = resolve(config, &args.bucket).await?;
    let expected = Digest::from_hex(algorithm, args.digest.trim())
        .with_context(|| format!("not a {algorithm} digest: {}", args.digest))?;
    let object = open_store(config).await?.open(&bucket, &args.key).await?;

    let mut reader = object.into_reader();
    let mut hasher = ContentHasher::new(algorithm);
    copy_hashed(&mut reader, &mut tokio::io::sink(), &mut hasher, CopyLimits::default()).await?;
    Ok((expected, hasher.finalize()))
}

async fn cmd_verify(config: &ServerConfig, args: VerifyArgs) -> anyhow::Result<()> {
    let (expected, actual) = verify(config, &args).await?;
    if expected != actual {
        println!("{} {}/{} does not match", "✗".red().bold(), args.bucket.bold(), args.key);
        println!("  expected: {}:{}", expected.algorithm(), expected.to_hex().yellow());
        println!("  actual:   {}:{}", actual.algorithm(), actual.to_hex().yellow());
        bail!("{} digest mismatch", actual.algorithm());
    }
    println!(
        "{} {}/{} matches {}:{}",
        "✓".green().bold(),
        args.bucket.bold(),
        args.key,
        actual.algorithm(),
        actual.short_hex()
    );
    Ok(())
}

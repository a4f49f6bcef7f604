use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vref_core::manifest::ChunkManifest;
use vref_core::options::{ReaderOptions, StorageOptions};
use vref_core::path::{classify, protocol_of, PathClass};
use vref_core::progress::Progress;
use vref_core::resolve::{OpenHandle, Resolver};
use vref_core::store::JsonRefStore;
use vref_core::writer::write_arrays_with_progress;

#[derive(Parser)]
#[command(name = "vref", version, about = "Virtual chunk references for archival array files")]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. "info", "vref_core=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::Args, Clone, Default)]
struct StorageArgs {
    /// JSON file holding a storage-options object
    #[arg(long)]
    storage_options: Option<PathBuf>,
    /// Single storage option as KEY=VALUE (repeatable, wins over the file)
    #[arg(long = "storage-option", value_name = "KEY=VALUE")]
    storage_option: Vec<String>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print access class and protocol of each path
    Classify { paths: Vec<String> },
    /// Summarize a chunk manifest
    Inspect { manifest: PathBuf },
    /// Write virtual references for one or more manifests into a reference file
    WriteRefs {
        /// Group the arrays are written under
        #[arg(long, default_value = "")]
        group: String,
        /// Reference file to create or update
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = false)]
        progress: bool,
        /// Manifests as NAME=PATH; a bare PATH uses its file stem as name
        #[arg(required = true)]
        arrays: Vec<String>,
    },
    /// Check that every referenced byte range lies inside its file.
    /// Relative local chunk paths are taken relative to the manifest's directory.
    Check {
        manifest: PathBuf,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Copy a byte range of a (possibly remote) file to stdout
    Read {
        path: String,
        #[arg(long)]
        offset: u64,
        #[arg(long)]
        length: u64,
        /// Print hex instead of raw bytes
        #[arg(long, default_value_t = false)]
        hex: bool,
        #[command(flatten)]
        storage: StorageArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    match cli.cmd {
        Cmd::Classify { paths } => classify_paths(&paths),
        Cmd::Inspect { manifest } => inspect(&manifest)?,
        Cmd::WriteRefs { group, output, progress, arrays } => {
            write_refs(&group, &output, progress, &arrays)?
        }
        Cmd::Check { manifest, storage } => check(&manifest, &reader_options(&storage)?)?,
        Cmd::Read { path, offset, length, hex, storage } => {
            read(&path, offset, length, hex, &reader_options(&storage)?)?
        }
    }
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn reader_options(args: &StorageArgs) -> Result<ReaderOptions> {
    let mut opts = StorageOptions::new();
    if let Some(p) = &args.storage_options {
        let v: Value = serde_json::from_reader(
            File::open(p).with_context(|| format!("open {}", p.display()))?,
        )
        .with_context(|| format!("parse {}", p.display()))?;
        match v {
            Value::Object(m) => opts = m,
            _ => bail!("{}: storage options must be a JSON object", p.display()),
        }
    }
    for kv in &args.storage_option {
        let (k, v) = kv.split_once('=').ok_or_else(|| anyhow!("expected KEY=VALUE, got {kv:?}"))?;
        // JSON literals (true, 42, {"a":1}) keep their type, anything else is a string
        let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.to_string()));
        opts.insert(k.trim().to_string(), value);
    }
    Ok(ReaderOptions::with_storage_options(opts))
}

fn load_manifest(path: &Path) -> Result<ChunkManifest> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    ChunkManifest::from_json(&bytes).with_context(|| format!("load manifest {}", path.display()))
}

fn classify_paths(paths: &[String]) {
    for p in paths {
        println!("{}\t{}\t{}", classify(p), protocol_of(p), p);
    }
}

fn inspect(path: &Path) -> Result<()> {
    let m = load_manifest(path)?;
    let present = m.present_count();
    println!("shape: {:?}", m.shape());
    println!("chunks: {} (present {}, absent {})", m.len(), present, m.len() - present);
    println!("bytes: {}", m.nbytes());
    let mut files: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, c) in m.entries() {
        *files.entry(c.path).or_default() += 1;
    }
    for (f, n) in files {
        println!("  {} [{}] {} chunk(s)", f, classify(f), n);
    }
    Ok(())
}

fn parse_array_arg(arg: &str) -> Result<(String, PathBuf)> {
    if let Some((name, path)) = arg.split_once('=') {
        if name.is_empty() {
            bail!("empty array name in {arg:?}");
        }
        return Ok((name.to_string(), PathBuf::from(path)));
    }
    let path = PathBuf::from(arg);
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("cannot derive array name from {arg:?}"))?
        .to_string();
    Ok((name, path))
}

fn write_refs(group: &str, output: &Path, show_progress: bool, arrays: &[String]) -> Result<()> {
    let mut loaded = Vec::with_capacity(arrays.len());
    for a in arrays {
        let (name, path) = parse_array_arg(a)?;
        loaded.push((name, load_manifest(&path)?));
    }

    let mut store = JsonRefStore::open(output)
        .with_context(|| format!("open reference file {}", output.display()))?;
    let prog = Progress::new(show_progress);
    prog.set_stage("Writing");
    prog.start();
    let res = write_arrays_with_progress(
        &mut store,
        group,
        loaded.iter().map(|(n, m)| (n.as_str(), m)),
        &prog,
    );
    prog.stop();
    let report = res.context("write virtual references")?;
    store.commit().with_context(|| format!("commit {}", output.display()))?;

    info!(written = report.written, skipped = report.skipped, "reference file updated");
    eprintln!(
        "Wrote {} reference(s) ({} absent chunk(s) skipped, {} bytes) to {}",
        report.written,
        report.skipped,
        report.bytes_referenced,
        output.display()
    );
    Ok(())
}

/// Chunk path as seen from the current directory: relative local paths are
/// joined onto `base`, everything else is returned unchanged.
fn locate(base: &Path, chunk_path: &str) -> String {
    let local = classify(chunk_path) == PathClass::Local && protocol_of(chunk_path) == "file";
    if local && Path::new(chunk_path).is_relative() {
        base.join(chunk_path).to_string_lossy().into_owned()
    } else {
        chunk_path.to_string()
    }
}

fn check(path: &Path, opts: &ReaderOptions) -> Result<()> {
    let m = load_manifest(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let resolver = Resolver::new();
    let mut handles: BTreeMap<&str, OpenHandle> = BTreeMap::new();
    let (mut ok, mut bad) = (0u64, 0u64);
    for (coord, c) in m.entries() {
        if !handles.contains_key(c.path) {
            let located = locate(base, c.path);
            let h = resolver.resolve(&located, opts).with_context(|| format!("open {located}"))?;
            handles.insert(c.path, h);
        }
        let size = handles[c.path].size();
        match c.offset.checked_add(c.length) {
            Some(end) if end <= size => ok += 1,
            _ => {
                bad += 1;
                warn!(
                    ?coord,
                    path = c.path,
                    offset = c.offset,
                    length = c.length,
                    size,
                    "range past end of file"
                );
                eprintln!("{:?}: {} exceeds file size {}", coord, c, size);
            }
        }
    }
    for (_, h) in handles {
        h.close()?;
    }
    eprintln!("Chunks ok={}, bad={}", ok, bad);
    if bad == 0 {
        println!("OK");
    } else {
        println!("BAD");
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push(LUT[(b >> 4) as usize] as char);
        s.push(LUT[(b & 0xF) as usize] as char);
    }
    s
}

fn read(path: &str, offset: u64, length: u64, as_hex: bool, opts: &ReaderOptions) -> Result<()> {
    let mut h = Resolver::new().resolve(path, opts)?;
    let bytes = h.read_range(offset, length)?;
    h.close()?;
    let mut out = std::io::stdout().lock();
    if as_hex {
        writeln!(out, "{}", hex(&bytes))?;
    } else {
        out.write_all(&bytes)?;
    }
    out.flush()?;
    Ok(())
}

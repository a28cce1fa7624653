use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use saimin::{IpcFormat, Reader, ReaderOptions};

/// Fetch the alignments overlapping a region of an indexed BAM file as Arrow IPC
#[derive(Parser)]
#[clap(version)]
struct Args {
    /// Input BAM path (indexed)
    #[clap(required = true)]
    bam: PathBuf,

    /// Reference sequence name
    #[clap(required = true)]
    chrom: String,

    /// 0-based start of the region (inclusive)
    start: u32,

    /// 0-based end of the region (exclusive)
    stop: u32,

    /// Output path [default: stdout]
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Index path [default: <BAM>.bai, then <BAM without .bam>.bai]
    #[clap(short, long)]
    index: Option<PathBuf>,

    /// Write the Arrow IPC stream format instead of the file format
    #[clap(long)]
    stream: bool,

    /// Skip CRC32 verification of BGZF blocks
    #[clap(long)]
    no_verify: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.start > args.stop {
        bail!("start ({}) must not exceed stop ({})", args.start, args.stop);
    }

    let mut options = ReaderOptions::builder()
        .verify_checksums(!args.no_verify)
        .ipc_format(if args.stream {
            IpcFormat::Stream
        } else {
            IpcFormat::File
        });
    if let Some(index) = &args.index {
        options = options.index_path(index);
    }

    let reader = Reader::open_with(&args.bam, options.build())
        .with_context(|| format!("failed to open {}", args.bam.display()))?;
    let bytes = reader
        .fetch(&args.chrom, args.start, args.stop)
        .with_context(|| format!("failed to fetch {}:{}-{}", args.chrom, args.start, args.stop))?;
    reader.close();

    match &args.output {
        Some(path) => fs::write(path, &bytes)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    info!("Wrote {} bytes of Arrow IPC", bytes.len());
    Ok(())
}

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use skifte::{start, Bucket, MapContext, Mapper, ReduceContext, Reducer, Stage};
use tracing::info;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
struct Args {
    /// Input directory, read recursively; each file is one record
    #[arg(long)]
    input: String,
    /// Worker thread count; 0 means one per CPU
    #[arg(long, default_value_t = 0)]
    workers: usize,
    /// Print progress snapshots as JSON lines while the job runs
    #[arg(long)]
    progress: bool,
}

struct CharMapper;

impl Mapper for CharMapper {
    type InKey = PathBuf;
    type InValue = String;
    type Key = char;
    type Value = u64;

    fn map(&self, _path: &PathBuf, text: &String, ctx: &mut MapContext<'_, char, u64>) {
        for ch in text.chars().filter(|ch| !ch.is_whitespace()) {
            ctx.emit(ch, 1);
        }
    }
}

struct CharReducer;

impl Reducer for CharReducer {
    type Key = char;
    type Value = u64;
    type OutKey = char;
    type OutValue = u64;

    fn reduce(&self, bucket: &Bucket<char, u64>, ctx: &mut ReduceContext<'_, char, u64>) {
        ctx.emit(bucket[0].0, bucket.iter().map(|(_, n)| n).sum());
    }
}

fn read_input(root: &str) -> Result<Vec<(PathBuf, String)>> {
    let mut records = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_path_buf();
        let text =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        records.push((path, text));
    }
    Ok(records)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let workers = if args.workers == 0 {
        num_cpus::get()
    } else {
        args.workers
    };
    let records = read_input(&args.input)?;
    info!(files = records.len(), workers, "starting character count");

    let job = start(CharMapper, CharReducer, records, Vec::new(), workers)?;
    if args.progress {
        loop {
            let state = job.state();
            println!("{}", serde_json::to_string(&state)?);
            if state.stage == Stage::Reduce && state.percentage >= 100.0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    let mut output = job.close();
    output.sort_unstable();
    for (ch, count) in output {
        println!("{ch:?}\t{count}");
    }
    Ok(())
}

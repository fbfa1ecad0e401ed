use anyhow::{Context, Result};
use clap::Parser;
use pullreduce::{Emitter, JobConfig, MapReduce, Values};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
struct Args {
    /// Input files or directories
    #[arg(required = true)]
    input: Vec<PathBuf>,
    /// Output directory for part-NNNNN.tsv files (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Maximum concurrent map tasks [env: MR_NUM_MAPPERS]
    #[arg(long)]
    mappers: Option<usize>,
    /// Number of partitions / reduce tasks [env: MR_NUM_REDUCERS]
    #[arg(long)]
    reducers: Option<usize>,
    /// Print run statistics as JSON to stderr
    #[arg(long)]
    stats: bool,
}

fn list_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    inputs
        .iter()
        .flat_map(WalkDir::new)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

struct WordcountMapper {
    word_re: Regex,
}

impl WordcountMapper {
    fn new() -> Result<Self> {
        Ok(Self { word_re: Regex::new(r"[A-Za-z0-9_']+")? })
    }

    fn map_file(&self, path: &Path, emit: &mut Emitter<'_>) {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                error!("read {}: {}", path.display(), e);
                return;
            }
        };
        for line in content.lines() {
            for cap in self.word_re.find_iter(line) {
                emit.emit(cap.as_str().to_lowercase(), "1");
            }
        }
    }
}

enum Sink {
    Stdout(Mutex<io::Stdout>),
    // one writer per partition, so reduce tasks never contend
    Parts(Vec<Mutex<BufWriter<File>>>),
}

impl Sink {
    fn open(output: Option<&Path>, partitions: usize) -> Result<Self> {
        let Some(dir) = output else { return Ok(Sink::Stdout(Mutex::new(io::stdout()))) };
        fs::create_dir_all(dir).with_context(|| format!("create_dir_all {}", dir.display()))?;
        let writers = (0..partitions)
            .map(|r| {
                let path = dir.join(format!("part-{r:05}.tsv"));
                let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
                Ok(Mutex::new(BufWriter::new(file)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Sink::Parts(writers))
    }

    fn write_line(&self, partition: usize, line: &str) {
        let res = match self {
            Sink::Stdout(out) => writeln!(out.lock().unwrap_or_else(|e| e.into_inner()), "{line}"),
            Sink::Parts(writers) => writeln!(writers[partition].lock().unwrap_or_else(|e| e.into_inner()), "{line}"),
        };
        if let Err(e) = res {
            error!("write partition {partition}: {e}");
        }
    }

    fn flush(self) -> Result<()> {
        match self {
            Sink::Stdout(out) => out.into_inner().unwrap_or_else(|e| e.into_inner()).flush()?,
            Sink::Parts(writers) => {
                for w in writers {
                    w.into_inner().unwrap_or_else(|e| e.into_inner()).flush()?;
                }
            }
        }
        Ok(())
    }
}

fn sum_values(key: &[u8], values: &mut Values<'_>) -> u64 {
    values
        .group(key)
        .filter_map(|v| std::str::from_utf8(v).ok()?.parse::<u64>().ok())
        .sum()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut config = JobConfig::from_env()?;
    if let Some(n) = args.mappers { config.num_mappers = n; }
    if let Some(n) = args.reducers { config.num_reducers = n; }

    let files = list_files(&args.input);
    info!(files = files.len(), "discovered input files");

    let mapper = WordcountMapper::new()?;
    let sink = Sink::open(args.output.as_deref(), config.num_reducers)?;
    let job = MapReduce::new(
        |path: &PathBuf, emit: &mut Emitter<'_>| mapper.map_file(path, emit),
        |key: &[u8], values: &mut Values<'_>, partition: usize| {
            let sum = sum_values(key, values);
            sink.write_line(partition, &format!("{}\t{}", String::from_utf8_lossy(key), sum));
        },
    )
    .config(config);
    let stats = job.run(&files)?;
    drop(job);
    sink.flush()?;

    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

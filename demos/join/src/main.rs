use anyhow::Result;
use clap::Parser;
use pullreduce::{default_pipeline, Emitter, JobConfig, Values};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Search entries as JSONL: {"query":..., "page_id":..., "position":...}
    #[arg(long, num_args = 1..)]
    searches: Vec<PathBuf>,
    /// Pages as JSONL: {"page_id":..., "body":...}
    #[arg(long, num_args = 1..)]
    pages: Vec<PathBuf>,
    /// Maximum concurrent map tasks [env: MR_NUM_MAPPERS]
    #[arg(long)]
    mappers: Option<usize>,
    /// Number of partitions [env: MR_NUM_REDUCERS]
    #[arg(long)]
    reducers: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side { Searches, Pages }

#[derive(Serialize, Deserialize, Clone, Debug)]
struct SearchEntry { query: String, page_id: String, position: u8 }

#[derive(Serialize, Deserialize, Clone, Debug)]
struct Page { page_id: String, body: String }

#[derive(Serialize, Deserialize, Clone, Debug)]
enum JoinVal {
    Search { query: String, position: u8 },
    PageBody(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct Joined { query: String, page_id: String, position: u8, body: String }

fn map_input((side, path): &(Side, PathBuf), emit: &mut Emitter<'_>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => { error!("read {}: {}", path.display(), e); return; }
    };
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let parsed = match side {
            Side::Searches => serde_json::from_str::<SearchEntry>(line)
                .map(|s| (s.page_id, JoinVal::Search { query: s.query, position: s.position })),
            Side::Pages => serde_json::from_str::<Page>(line).map(|p| (p.page_id, JoinVal::PageBody(p.body))),
        };
        match parsed.and_then(|(key, val)| Ok((key, serde_json::to_vec(&val)?))) {
            Ok((key, val)) => emit.emit(key, val),
            Err(e) => warn!("skip bad line in {}: {}", path.display(), e),
        }
    }
}

/// Pulls the whole group, then pairs every search with the page body.
fn join_group(key: &[u8], values: &mut Values<'_>) -> Vec<Joined> {
    let page_id = String::from_utf8_lossy(key).into_owned();
    let mut body: Option<String> = None;
    let mut searches: Vec<(String, u8)> = Vec::new();
    while let Some(raw) = values.next_value(key) {
        match serde_json::from_slice::<JoinVal>(raw) {
            Ok(JoinVal::PageBody(b)) => { body.get_or_insert(b); }
            Ok(JoinVal::Search { query, position }) => searches.push((query, position)),
            Err(e) => error!("corrupt value for {page_id}: {e}"),
        }
    }
    let Some(body) = body else { return Vec::new() };
    let mut out: Vec<Joined> = searches
        .into_iter()
        .map(|(query, position)| Joined { query, page_id: page_id.clone(), position, body: body.clone() })
        .collect();
    out.sort_by(|a, b| (a.position, &a.query).cmp(&(b.position, &b.query)));
    out
}

/// Writes one JSON line per row; failures are logged and the row dropped.
fn write_rows<W: Write>(out: &mut W, rows: &[Joined]) -> usize {
    let mut written = 0;
    for row in rows {
        let res = serde_json::to_string(row)
            .map_err(io::Error::from)
            .and_then(|line| writeln!(out, "{line}"));
        match res {
            Ok(()) => written += 1,
            Err(e) => error!("write joined row for {}: {e}", row.page_id),
        }
    }
    written
}

// RUST_LOG when it parses, info otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();
    let mut config = JobConfig::from_env()?;
    if let Some(n) = args.mappers { config.num_mappers = n; }
    if let Some(n) = args.reducers { config.num_reducers = n; }
    let inputs: Vec<(Side, PathBuf)> = args
        .searches
        .into_iter()
        .map(|p| (Side::Searches, p))
        .chain(args.pages.into_iter().map(|p| (Side::Pages, p)))
        .collect();

    default_pipeline(map_input, |key: &[u8], values: &mut Values<'_>, _partition: usize| {
        let rows = join_group(key, values);
        write_rows(&mut io::stdout().lock(), &rows);
    })
    .config(config)
    .run(&inputs)?;
    Ok(())
}

//! `linkdex bench`: exercises both stores end to end on synthetic data.
//!
//! Phases: build a link graph, walk it with one thread per shard, index one
//! document per link, assign in-degree based scores, and run a search.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::{Duration as StdDuration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use linkdex_core::{partition, Document, Edge, Graph, IdRange, Link, Query, StoreConfig};
use linkdex_graph::open_graph;
use linkdex_index::open_indexer;

const SEARCH_TERMS: &[&str] = &[
    "architecture",
    "crawler",
    "frontier",
    "ranking",
    "scheduling",
    "partitioning",
    "replication",
    "caching",
    "latency",
    "throughput",
    "pagination",
    "concurrency",
];

const BODY_FRAGMENTS: &[&str] = &[
    "The fetcher follows outgoing links and records every page it retrieves.",
    "Link analysis assigns each page a score from the structure of the graph.",
    "Workers claim disjoint ranges of the identifier space and walk them in parallel.",
    "Stale edges are pruned after a page is crawled again and its links change.",
    "Search results are ordered by score first and textual relevance second.",
];

#[derive(clap::Args)]
pub struct BenchArgs {
    /// Number of links to create
    #[arg(long, default_value_t = 1_000)]
    links: u32,

    /// Outgoing edges per link
    #[arg(long, default_value_t = 4)]
    fanout: u32,

    /// Number of shards walked in parallel
    #[arg(long, default_value = "4")]
    shards: NonZeroU32,

    /// Store configuration file (TOML); all stores in memory when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct ShardWalk {
    links: u64,
    edges: u64,
}

fn page_url(i: u32) -> String {
    format!("https://bench.linkdex.test/page/{i}")
}

fn page_content(i: u32) -> String {
    let i = i as usize;
    format!(
        "{} {} {}",
        SEARCH_TERMS[i % SEARCH_TERMS.len()],
        SEARCH_TERMS[(i * 7 + 3) % SEARCH_TERMS.len()],
        BODY_FRAGMENTS[i % BODY_FRAGMENTS.len()],
    )
}

fn millis(d: StdDuration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

/// Walk every link and edge in one shard of the id space.
fn walk_shard(graph: &dyn Graph, range: IdRange, before: DateTime<Utc>) -> Result<ShardWalk> {
    let mut walk = ShardWalk::default();

    let mut links = graph.links(range.from, range.to, before)?;
    for _ in links.by_ref() {
        walk.links += 1;
    }
    if let Some(e) = links.error() {
        bail!("link walk of shard [{range}) failed: {e}");
    }
    links.close()?;

    let mut edges = graph.edges(range.from, range.to, before)?;
    for _ in edges.by_ref() {
        walk.edges += 1;
    }
    if let Some(e) = edges.error() {
        bail!("edge walk of shard [{range}) failed: {e}");
    }
    edges.close()?;

    Ok(walk)
}

pub fn run(args: &BenchArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let graph = open_graph(&config.graph).context("failed to open graph store")?;
    let indexer = open_indexer(&config.index).context("failed to open content index")?;

    // --- Build ---
    let start = Instant::now();
    let mut ids = Vec::with_capacity(args.links as usize);
    for i in 0..args.links {
        let link = graph.upsert_link(&Link::new(page_url(i), Utc::now()))?;
        ids.push(link.id);
    }

    // Small graphs map several k onto the same target; count each edge once.
    let mut edge_ids: HashSet<Uuid> = HashSet::new();
    let mut in_degree: HashMap<Uuid, u32> = HashMap::new();
    let n = ids.len();
    for (i, src) in ids.iter().enumerate() {
        for k in 1..=args.fanout as usize {
            let dst = ids[(i + k * 31) % n];
            let edge = graph.upsert_edge(&Edge::new(*src, dst))?;
            if edge_ids.insert(edge.id) {
                *in_degree.entry(edge.dst).or_default() += 1;
            }
        }
    }
    let edge_count = edge_ids.len() as u64;
    let build_time = start.elapsed();
    info!(links = n, edges = edge_count, "built synthetic graph");

    // --- Walk ---
    let cutoff = Utc::now() + Duration::seconds(1);
    let start = Instant::now();
    let graph_ref: &dyn Graph = graph.as_ref();
    let walks = std::thread::scope(|s| {
        let handles: Vec<_> = partition::ranges(args.shards)
            .into_iter()
            .map(|range| s.spawn(move || walk_shard(graph_ref, range, cutoff)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("shard walker panicked"))?)
            .collect::<Result<Vec<_>>>()
    })?;
    let walk_time = start.elapsed();

    let walked_links: u64 = walks.iter().map(|w| w.links).sum();
    let walked_edges: u64 = walks.iter().map(|w| w.edges).sum();
    if walked_links != n as u64 || walked_edges != edge_count {
        bail!(
            "shard walk saw {walked_links} links and {walked_edges} edges, \
             expected {n} and {edge_count}"
        );
    }
    info!(shards = walks.len(), walked_links, walked_edges, "walked shards");

    // --- Index ---
    let start = Instant::now();
    for (i, id) in (0..args.links).zip(&ids) {
        indexer.index(&Document::new(
            *id,
            page_url(i),
            format!("Page {i}"),
            page_content(i),
        ))?;
    }
    let index_time = start.elapsed();

    // --- Score ---
    let start = Instant::now();
    let total_in = edge_count.max(1) as f64;
    for id in &ids {
        let degree = in_degree.get(id).copied().unwrap_or(0);
        indexer.update_score(*id, f64::from(degree) / total_in)?;
    }
    let score_time = start.elapsed();

    // --- Search ---
    let term = SEARCH_TERMS[0];
    let start = Instant::now();
    let mut results = indexer.search(&Query::matching(term))?;
    let total = results.total_count();
    let top = results.next();
    let yielded = u64::from(top.is_some()) + results.by_ref().count() as u64;
    if let Some(e) = results.error() {
        bail!("search for {term:?} failed: {e}");
    }
    results.close()?;
    let search_time = start.elapsed();

    println!("linkdex bench");
    println!("=============");
    println!("graph backend: {:?}", config.graph.backend);
    println!(
        "links: {n}  edges: {edge_count}  ({:.1} ms)",
        millis(build_time)
    );
    println!(
        "shards: {}  walked links: {walked_links}  walked edges: {walked_edges}  ({:.1} ms)",
        walks.len(),
        millis(walk_time)
    );
    println!("indexed documents: {n}  ({:.1} ms)", millis(index_time));
    println!("scored documents: {n}  ({:.1} ms)", millis(score_time));
    println!(
        "search {term:?}: total {total}  yielded {yielded}  ({:.1} ms)",
        millis(search_time)
    );
    if let Some(doc) = top {
        println!("top hit: {}  (page rank {:.4})", doc.url, doc.page_rank);
    }

    Ok(())
}

//! # CLI Module
//!
//! Command-line interface for the photo catalogue.
//!
//! ## Usage
//! ```bash
//! # Add one photo
//! photo-catalog add ~/Pictures/drill.jpg --name "Cordless drill" --tag garage
//!
//! # Import a folder
//! photo-catalog index ~/Pictures/inventory --tag imported
//!
//! # Which item is this?
//! photo-catalog search ~/Downloads/mystery.jpg --limit 5
//!
//! # Only close matches, as JSON
//! photo-catalog find ~/Downloads/mystery.jpg --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_catalog::config::CatalogConfig;
use photo_catalog::core::catalog::{
    CatalogItem, CatalogStore, NewItem, SqliteCatalog, TAG_SUGGESTION_LIMIT,
};
use photo_catalog::core::extractor::{Extraction, FingerprintExtractor};
use photo_catalog::core::fingerprint::{Fingerprint, FingerprintKind};
use photo_catalog::core::indexer::{prepare_file, IndexResult, Indexer};
use photo_catalog::core::ranking::{RankMetric, RankedItem, Ranker, SearchMode};
use photo_catalog::core::scorer::{Comparison, Scorer};
use photo_catalog::error::{CatalogError, Result};
use photo_catalog::events::{Event, EventChannel, IndexEvent, ScanEvent};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;
use uuid::Uuid;

/// Photo Catalog - find your things by name, tag or a photo of them
#[derive(Parser, Debug)]
#[command(name = "photo-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalogue database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the fingerprint of a photo
    Fingerprint {
        image: PathBuf,

        #[command(flatten)]
        fingerprint: FingerprintArgs,

        /// Save the sampled grid as PNG
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Compare two photos
    Compare {
        first: PathBuf,
        second: PathBuf,

        #[command(flatten)]
        fingerprint: FingerprintArgs,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Add a photo to the catalogue
    Add {
        image: PathBuf,

        /// Item name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Where the full-size photo lives
        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Import every photo in one or more folders
    Index {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Tag to attach to every imported item (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        include_hidden: bool,

        /// Do not store capture thumbnails
        #[arg(long)]
        no_thumbnails: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Rank the whole catalogue by similarity to a photo
    Search {
        image: PathBuf,

        /// Show at most this many results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// List only the catalogue items similar to a photo
    Find {
        image: PathBuf,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// List items, optionally filtered by text
    List {
        /// Case-insensitive text matched against name, description and tags
        query: Option<String>,
    },

    /// Suggest tag names
    Tags {
        #[arg(default_value = "")]
        query: String,

        #[arg(short, long, default_value_t = TAG_SUGGESTION_LIMIT)]
        limit: usize,
    },

    /// Replace the tags of an item
    Tag {
        id: Uuid,
        tags: Vec<String>,
    },

    /// Remove an item
    Remove { id: Uuid },
}

#[derive(Args, Debug, Clone, Copy)]
struct FingerprintArgs {
    /// Fingerprint algorithm
    #[arg(short, long)]
    kind: Option<Kind>,

    /// Grid size (8-128)
    #[arg(short, long)]
    size: Option<u32>,

    /// Fingerprint the photo as-is, without the capture letterbox
    #[arg(long)]
    raw: bool,
}

#[derive(Args, Debug, Clone, Copy)]
struct ThresholdArgs {
    /// Euclidean distance below which HSV-mean fingerprints are similar
    #[arg(long)]
    threshold: Option<f64>,

    /// Share of dHash bits that may differ (0-1)
    #[arg(long)]
    hamming_ratio: Option<f64>,

    /// Distance used to order HSV-mean results
    #[arg(long)]
    metric: Option<Metric>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// Difference Hash - brightness gradients (default)
    Dhash,
    /// HSV mean - legacy hue/saturation vector
    Hsv,
}

impl From<Kind> for FingerprintKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Dhash => FingerprintKind::DHash,
            Kind::Hsv => FingerprintKind::HsvMean,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Metric {
    Manhattan,
    Euclidean,
}

impl From<Metric> for RankMetric {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Manhattan => RankMetric::Manhattan,
            Metric::Euclidean => RankMetric::Euclidean,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (ids or values only)
    Minimal,
}

/// Settings and terminal shared by every command
struct Context {
    config: CatalogConfig,
    output: OutputFormat,
    term: Term,
}

impl Context {
    fn open_catalog(&self) -> Result<SqliteCatalog> {
        Ok(SqliteCatalog::open(&self.config.database_path())?)
    }

    fn extractor(&self) -> Result<Box<dyn FingerprintExtractor>> {
        Ok(self.config.fingerprint_config().build()?)
    }

    fn line(&self, text: impl AsRef<str>) {
        self.term.write_line(text.as_ref()).ok();
    }

    fn apply_fingerprint(&mut self, args: FingerprintArgs) {
        if let Some(kind) = args.kind {
            self.config.fingerprint.kind = kind.into();
            // fall back to the new kind's default size
            self.config.fingerprint.size = None;
        }
        if let Some(size) = args.size {
            self.config.fingerprint.size = Some(size);
        }
    }

    fn apply_thresholds(&mut self, args: ThresholdArgs) -> Result<()> {
        if let Some(threshold) = args.threshold {
            self.config.thresholds.euclidean = threshold;
        }
        if let Some(ratio) = args.hamming_ratio {
            self.config.thresholds.hamming_ratio = ratio;
        }
        if let Some(metric) = args.metric {
            self.config.metric = metric.into();
        }
        self.config.validate()
    }

    /// Fingerprint a photo file the way a capture would be fingerprinted
    fn fingerprint_file(&self, path: &Path, raw: bool) -> Result<Extraction> {
        let extractor = self.extractor()?;
        if raw {
            return Ok(extractor.extract_file(path)?);
        }
        Ok(prepare_file(path, extractor.as_ref(), &self.config.capture)?.extraction)
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CatalogConfig::load_or_default(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }

    let mut ctx = Context {
        config,
        output: cli.output,
        term: Term::stderr(),
    };

    match cli.command {
        Commands::Fingerprint {
            image,
            fingerprint,
            preview,
        } => {
            ctx.apply_fingerprint(fingerprint);
            run_fingerprint(&ctx, &image, fingerprint.raw, preview.as_deref())
        }
        Commands::Compare {
            first,
            second,
            fingerprint,
            thresholds,
        } => {
            ctx.apply_fingerprint(fingerprint);
            ctx.apply_thresholds(thresholds)?;
            run_compare(&ctx, &first, &second, fingerprint.raw)
        }
        Commands::Add {
            image,
            name,
            description,
            tags,
            photo_url,
        } => run_add(&ctx, &image, name, description, tags, photo_url),
        Commands::Index {
            paths,
            tags,
            include_hidden,
            no_thumbnails,
            verbose,
        } => run_index(&ctx, paths, tags, include_hidden, !no_thumbnails, verbose),
        Commands::Search {
            image,
            limit,
            thresholds,
        } => {
            ctx.apply_thresholds(thresholds)?;
            run_search(&ctx, &image, SearchMode::RankAll, Some(limit))
        }
        Commands::Find { image, thresholds } => {
            ctx.apply_thresholds(thresholds)?;
            run_search(&ctx, &image, SearchMode::ThresholdGated, None)
        }
        Commands::List { query } => run_list(&ctx, query.as_deref()),
        Commands::Tags { query, limit } => run_tags(&ctx, &query, limit),
        Commands::Tag { id, tags } => run_tag(&ctx, id, tags),
        Commands::Remove { id } => run_remove(&ctx, id),
    }
}

fn run_fingerprint(ctx: &Context, image: &Path, raw: bool, preview: Option<&Path>) -> Result<()> {
    let extraction = ctx.fingerprint_file(image, raw)?;
    let fingerprint = &extraction.fingerprint;

    if let Some(path) = preview {
        extraction.preview.save(path)?;
    }

    let signed_bits = match fingerprint {
        Fingerprint::DHash(bits) => bits.as_i64(),
        Fingerprint::HsvMean(_) => None,
    };

    match ctx.output {
        OutputFormat::Pretty => {
            ctx.line(format!(
                "{} {}",
                style(fingerprint.kind()).bold().cyan(),
                style(format!("({} values)", fingerprint.len())).dim()
            ));
            println!("{}", fingerprint.encode());
            if let Some(bits) = signed_bits {
                ctx.line(format!("{} {}", style("signed 64-bit:").dim(), bits));
            }
            if let Some(path) = preview {
                ctx.line(format!("{} {}", style("preview:").dim(), display_path(path)));
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "path": image,
            "fingerprint": fingerprint,
            "length": fingerprint.len(),
            "signed_bits": signed_bits,
        }))?,
        OutputFormat::Minimal => println!("{}", fingerprint.encode()),
    }
    Ok(())
}

fn run_compare(ctx: &Context, first: &Path, second: &Path, raw: bool) -> Result<()> {
    let a = ctx.fingerprint_file(first, raw)?.fingerprint;
    let b = ctx.fingerprint_file(second, raw)?.fingerprint;

    let comparison = Scorer::new(ctx.config.thresholds).compare(&a, &b)?;

    match ctx.output {
        OutputFormat::Pretty => {
            let verdict = if comparison.is_similar() {
                style("Similar").green().bold()
            } else {
                style("Different").yellow().bold()
            };
            ctx.line(format!("{} {}", verdict, style(a.kind()).dim()));
            for (label, value) in comparison_lines(&comparison) {
                ctx.line(format!("  {:<12} {}", label, style(value).cyan()));
            }
        }
        OutputFormat::Json => print_json(&comparison)?,
        OutputFormat::Minimal => println!("{}", comparison.is_similar()),
    }
    Ok(())
}

fn comparison_lines(comparison: &Comparison) -> Vec<(&'static str, String)> {
    match comparison {
        Comparison::Vector(r) => vec![
            ("euclidean", format!("{:.4}", r.euclidean)),
            ("cosine", format!("{:.4}", r.cosine)),
            ("manhattan", format!("{:.4}", r.manhattan)),
        ],
        Comparison::Hamming(r) => vec![
            ("hamming", format!("{} / {} bits", r.distance, r.bit_count)),
            ("similarity", format!("{:.1}%", r.similarity_percent)),
        ],
    }
}

fn run_add(
    ctx: &Context,
    image: &Path,
    name: Option<String>,
    description: String,
    tags: Vec<String>,
    photo_url: Option<String>,
) -> Result<()> {
    let extractor = ctx.extractor()?;
    let ready = prepare_file(image, extractor.as_ref(), &ctx.config.capture)?;

    let name = name.unwrap_or_else(|| {
        image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let mut new_item = NewItem::new(name, ready.fingerprint)
        .description(description)
        .thumbnail(ready.thumbnail)
        .tags(tags);
    if let Some(url) = photo_url {
        new_item = new_item.photo_url(url);
    }

    let catalog = ctx.open_catalog()?;
    let item = catalog.add(new_item)?;

    match ctx.output {
        OutputFormat::Pretty => {
            ctx.line(format!("{} Added {}", style("✓").green().bold(), style(&item.name).bold()));
            ctx.line(format!("  {} {}", style("id").dim(), item.id));
            ctx.line(format!("  {} {}", style("fingerprint").dim(), item.fingerprint.encode()));
        }
        OutputFormat::Json => print_json(&ItemView::from(&item))?,
        OutputFormat::Minimal => println!("{}", item.id),
    }
    Ok(())
}

fn run_index(
    ctx: &Context,
    paths: Vec<PathBuf>,
    tags: Vec<String>,
    include_hidden: bool,
    store_thumbnails: bool,
    verbose: bool,
) -> Result<()> {
    let catalog = ctx.open_catalog()?;

    let mut scan_config = ctx.config.scan.clone();
    scan_config.include_hidden |= include_hidden;

    let indexer = Indexer::builder()
        .paths(paths)
        .fingerprint(ctx.config.fingerprint_config())
        .capture(ctx.config.capture)
        .scan_config(scan_config)
        .tags(tags)
        .store_thumbnails(store_thumbnails)
        .build();

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(ctx.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("█▓░"));
        }
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_message(format!("Scanning ({} found)", p.photos_found));
                }
                Event::Index(IndexEvent::Started { total_photos }) => {
                    pb.set_length(total_photos as u64);
                    pb.set_message("Fingerprinting");
                }
                Event::Index(IndexEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(
                            p.current_path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Index(IndexEvent::Error { path, message }) if verbose => {
                    pb.println(format!("{} {}: {}", style("!").yellow(), display_path(&path), message));
                }
                Event::Index(IndexEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let result = indexer.run_with_events(&catalog, &sender);

    drop(sender);
    event_thread.join().ok();

    let result = result?;
    match ctx.output {
        OutputFormat::Pretty => print_index_pretty(ctx, &result, verbose),
        OutputFormat::Json => print_json(&serde_json::json!({
            "total_photos": result.total_photos,
            "indexed": result.items.len(),
            "errors": result.errors,
            "duration_ms": result.duration_ms,
            "items": result.items.iter().map(ItemView::from).collect::<Vec<_>>(),
        }))?,
        OutputFormat::Minimal => {
            for item in &result.items {
                println!("{}", item.id);
            }
        }
    }
    Ok(())
}

fn print_index_pretty(ctx: &Context, result: &IndexResult, verbose: bool) {
    ctx.line(format!("{} Import complete", style("✓").green().bold()));
    ctx.line(format!(
        "  {} of {} photos added in {:.1}s",
        style(result.items.len()).cyan(),
        result.total_photos,
        result.duration_ms as f64 / 1000.0
    ));

    if !result.errors.is_empty() {
        ctx.line(format!(
            "  {} photos skipped",
            style(result.errors.len()).yellow()
        ));
        if verbose {
            for error in &result.errors {
                ctx.line(format!("    {}", style(error).dim()));
            }
        }
    }
}

fn run_search(ctx: &Context, image: &Path, mode: SearchMode, limit: Option<usize>) -> Result<()> {
    let query = ctx.fingerprint_file(image, false)?.fingerprint;

    let catalog = ctx.open_catalog()?;
    let snapshot = catalog.list()?;

    let ranker = Ranker::new(ctx.config.rank_config(mode));
    let mut ranked = ranker.rank(&query, &snapshot)?;
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    match ctx.output {
        OutputFormat::Pretty => print_ranked_pretty(ctx, &ranked, snapshot.len()),
        OutputFormat::Json => {
            print_json(&ranked.iter().map(HitView::from).collect::<Vec<_>>())?
        }
        OutputFormat::Minimal => {
            for hit in &ranked {
                println!("{}", hit.item.id);
            }
        }
    }
    Ok(())
}

fn print_ranked_pretty(ctx: &Context, ranked: &[RankedItem<'_, CatalogItem>], total: usize) {
    if ranked.is_empty() {
        ctx.line(format!(
            "{} No matching items among {} in the catalogue",
            style("○").dim(),
            total
        ));
        return;
    }

    for (i, hit) in ranked.iter().enumerate() {
        let match_type = if hit.match_type.is_match() {
            style(hit.match_type.to_string()).green()
        } else {
            style(hit.match_type.to_string()).dim()
        };
        ctx.line(format!(
            "{:>3}. {} {} {} {}",
            i + 1,
            style(format!("{:5.1}%", hit.match_percentage)).cyan(),
            style(&hit.item.name).bold(),
            match_type,
            style(format!("d={:.3}", hit.distance)).dim()
        ));
        if !hit.item.tags.is_empty() {
            ctx.line(format!("       {}", style(hit.item.tags.join(", ")).dim()));
        }
    }
}

fn run_list(ctx: &Context, query: Option<&str>) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let items = match query {
        Some(text) => catalog.search_text(text)?,
        None => catalog.list()?,
    };

    match ctx.output {
        OutputFormat::Pretty => {
            if items.is_empty() {
                ctx.line(format!("{} No items", style("○").dim()));
            }
            for item in &items {
                print_item_pretty(ctx, item);
            }
        }
        OutputFormat::Json => print_json(&items.iter().map(ItemView::from).collect::<Vec<_>>())?,
        OutputFormat::Minimal => {
            for item in &items {
                println!("{}", item.id);
            }
        }
    }
    Ok(())
}

fn print_item_pretty(ctx: &Context, item: &CatalogItem) {
    ctx.line(format!("{} {}", style(&item.name).bold(), style(item.id).dim()));
    if !item.description.is_empty() {
        ctx.line(format!("  {}", item.description));
    }
    if !item.tags.is_empty() {
        ctx.line(format!("  {}", style(item.tags.join(", ")).cyan()));
    }
}

fn run_tags(ctx: &Context, query: &str, limit: usize) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let tags = catalog.tags_matching(query, limit)?;

    match ctx.output {
        OutputFormat::Json => print_json(&tags)?,
        OutputFormat::Pretty | OutputFormat::Minimal => {
            for tag in &tags {
                println!("{}", tag);
            }
        }
    }
    Ok(())
}

fn run_tag(ctx: &Context, id: Uuid, tags: Vec<String>) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let item = catalog.update_tags(id, &tags)?;

    match ctx.output {
        OutputFormat::Pretty => print_item_pretty(ctx, &item),
        OutputFormat::Json => print_json(&ItemView::from(&item))?,
        OutputFormat::Minimal => println!("{}", item.tags.join(",")),
    }
    Ok(())
}

fn run_remove(ctx: &Context, id: Uuid) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    catalog.remove(id)?;

    if matches!(ctx.output, OutputFormat::Pretty) {
        ctx.line(format!("{} Removed {}", style("✓").green().bold(), id));
    }
    Ok(())
}

/// An item without its thumbnail, for JSON output
#[derive(Serialize)]
struct ItemView<'a> {
    id: Uuid,
    name: &'a str,
    description: &'a str,
    photo_url: Option<&'a str>,
    tags: &'a [String],
    fingerprint: &'a Fingerprint,
    created_at: String,
}

impl<'a> From<&'a CatalogItem> for ItemView<'a> {
    fn from(item: &'a CatalogItem) -> Self {
        Self {
            id: item.id,
            name: &item.name,
            description: &item.description,
            photo_url: item.photo_url.as_deref(),
            tags: &item.tags,
            fingerprint: &item.fingerprint,
            created_at: item.created_at.to_rfc3339(),
        }
    }
}

/// A ranked item for JSON output
#[derive(Serialize)]
struct HitView<'a> {
    #[serde(flatten)]
    item: ItemView<'a>,
    distance: f64,
    match_percentage: f64,
    match_type: String,
    similarity: &'a Comparison,
}

impl<'a> From<&'a RankedItem<'a, CatalogItem>> for HitView<'a> {
    fn from(hit: &'a RankedItem<'a, CatalogItem>) -> Self {
        Self {
            item: ItemView::from(hit.item),
            distance: hit.distance,
            match_percentage: hit.match_percentage,
            match_type: format!("{:?}", hit.match_type),
            similarity: &hit.similarity,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CatalogError::Config(format!("cannot render JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

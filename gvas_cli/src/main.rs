use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use xxhash_rust::xxh3::xxh3_64;

use gvas_core::format::{DEFAULT_SECTION, FIELD_LEN, MAGIC};
use gvas_core::{count_or_zero, read_f32_le, read_save, Catalog, Matcher, MarkerKey, SaveFile};
use gvas_search::{matcher_by_name, ExactMatcher, ReanchorMatcher, REANCHOR};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "gvas",
    about = "Inspect GVAS save files and read item counters stored after 16-byte marker keys",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins if set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SearchOpts {
    /// Search strategy: reanchor | exact
    #[arg(long = "search", default_value = REANCHOR)]
    strategy: String,
}

#[derive(Args)]
struct SectionOpts {
    /// ASCII section marker key searches start from (default: catalog's, else "Resources")
    #[arg(long, conflicts_with = "no_section")]
    section: Option<String>,
    /// Search the whole save instead of starting at a section marker
    #[arg(long)]
    no_section: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read item counters from a save file
    Count {
        /// GVAS save file
        save: PathBuf,
        /// Item catalog (TOML: optional `section`, `[items] name = "<32 hex digits>"`)
        #[arg(short, long, env = "GVAS_CATALOG")]
        catalog: Option<PathBuf>,
        /// Item name from the catalog (repeatable)
        #[arg(short, long = "item")]
        items: Vec<String>,
        /// Read every item in the catalog
        #[arg(long, conflicts_with = "items")]
        all: bool,
        /// Raw marker key instead of a catalog item
        #[arg(short, long, conflicts_with_all = ["items", "all"])]
        key: Option<MarkerKey>,
        #[command(flatten)]
        section: SectionOpts,
        #[command(flatten)]
        search: SearchOpts,
    },
    /// Print header status, size, fingerprint, and section offset
    Inspect {
        /// GVAS save file
        save: PathBuf,
        /// Section marker to report
        #[arg(long, default_value = DEFAULT_SECTION)]
        section: String,
        #[command(flatten)]
        search: SearchOpts,
    },
    /// List every offset where a marker occurs
    Find {
        /// GVAS save file
        save: PathBuf,
        /// Marker key (32 hex digits or dashed 8-4-4-4-12 form)
        #[arg(short, long, required_unless_present = "text", conflicts_with = "text")]
        key: Option<MarkerKey>,
        /// ASCII marker instead of a key
        #[arg(short, long)]
        text: Option<String>,
        /// Stop after this many hits
        #[arg(short, long, default_value_t = 64)]
        limit: usize,
        #[command(flatten)]
        search: SearchOpts,
    },
    /// Dump a byte range, as a hex listing or raw to a file
    Dump {
        /// GVAS save file
        save: PathBuf,
        /// First byte to dump
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Number of bytes (default: to end of file)
        #[arg(long)]
        len: Option<usize>,
        /// Write raw bytes here instead of printing a hex dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build a marker key and print its halves and bytes
    Key {
        /// Key as 32 hex digits
        #[arg(required_unless_present_any = ["high", "label"], conflicts_with_all = ["high", "label"])]
        hex: Option<MarkerKey>,
        /// High 64 bits (decimal or 0x-prefixed hex)
        #[arg(long, requires = "low", value_parser = parse_u64, conflicts_with = "label")]
        high: Option<u64>,
        /// Low 64 bits (decimal or 0x-prefixed hex)
        #[arg(long, requires = "high", value_parser = parse_u64)]
        low: Option<u64>,
        /// Fold a text label into a key
        #[arg(long)]
        label: Option<String>,
    },
    /// Time repeated key lookups with every search strategy
    Bench {
        /// GVAS save file
        save: PathBuf,
        /// Marker key (32 hex digits or dashed 8-4-4-4-12 form)
        #[arg(short, long)]
        key: MarkerKey,
        /// Lookups per strategy (1 to 1000000)
        #[arg(
            short,
            long,
            default_value_t = 1000,
            value_parser = clap::value_parser!(u64).range(1..=MAX_BENCH_LOOKUPS)
        )]
        count: u64,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Upper bound for `bench --count`; latencies are kept in memory.
const MAX_BENCH_LOOKUPS: u64 = 1_000_000;


fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid u64 {:?}: {}", s, e))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn load(path: &Path) -> anyhow::Result<Vec<u8>> {
    read_save(path).context("upload failed")
}

fn hex_dump(out: &mut impl Write, bytes: &[u8], base: usize) -> io::Result<()> {
    for (i, chunk) in bytes.chunks(16).enumerate() {
        write!(out, "  {:08x}  ", base + i * 16)?;
        for b in chunk {
            write!(out, "{:02x} ", b)?;
        }
        // padding
        for _ in chunk.len()..16 {
            write!(out, "   ")?;
        }
        write!(out, "  |")?;
        for b in chunk {
            if b.is_ascii_graphic() || *b == b' ' {
                write!(out, "{}", *b as char)?;
            } else {
                write!(out, ".")?;
            }
        }
        writeln!(out, "|")?;
    }
    Ok(())
}

/// Where key searches start: an explicit section, the catalog's, the default,
/// or nowhere with `--no-section`.
fn resolve_section(opts: &SectionOpts, catalog: Option<&Catalog>) -> Option<String> {
    if opts.no_section {
        return None;
    }
    opts.section
        .clone()
        .or_else(|| catalog.and_then(|c| c.section()).map(str::to_string))
        .or_else(|| Some(DEFAULT_SECTION.to_string()))
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_count(
    save_path: PathBuf,
    catalog_path: Option<PathBuf>,
    items: Vec<String>,
    all: bool,
    key: Option<MarkerKey>,
    section_opts: SectionOpts,
    strategy: &str,
) -> anyhow::Result<()> {
    let matcher = matcher_by_name(strategy)?;

    let catalog = match &catalog_path {
        Some(path) => Some(
            Catalog::load(path).with_context(|| format!("loading catalog {:?}", path))?,
        ),
        None => None,
    };

    // (display name, key) pairs to look up
    let targets: Vec<(String, MarkerKey)> = if let Some(key) = key {
        vec![(key.to_string(), key)]
    } else {
        let catalog = catalog
            .as_ref()
            .context("no catalog given; pass --catalog or set GVAS_CATALOG, or use --key")?;
        if all || items.is_empty() {
            catalog.iter().map(|(n, k)| (n.to_string(), *k)).collect()
        } else {
            items
                .iter()
                .map(|name| {
                    catalog
                        .get(name)
                        .map(|k| (name.clone(), *k))
                        .with_context(|| format!("item {:?} is not in the catalog", name))
                })
                .collect::<anyhow::Result<_>>()?
        }
    };
    if targets.is_empty() {
        anyhow::bail!("catalog has no items");
    }

    let data = load(&save_path)?;
    let save = SaveFile::new(&data)?;

    let from = match resolve_section(&section_opts, catalog.as_ref()) {
        Some(name) => save
            .find_section(matcher.as_ref(), &name)
            .with_context(|| format!("section marker {:?} not in {:?}", name, save_path))?,
        None => 0,
    };
    info!(matcher = matcher.name(), from, items = targets.len(), "reading counts");

    let width = targets.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    for (name, key) in &targets {
        let result = save.read_count(matcher.as_ref(), key, from);
        if let Err(e) = &result {
            if e.is_not_found() {
                warn!(item = %name, key = %key, "marker not present; reporting 0");
            }
        }
        let count = count_or_zero(result).with_context(|| format!("reading {}", name))?;
        println!("  {:<width$} : {}", name, count, width = width);
    }
    Ok(())
}

fn run_inspect(save_path: PathBuf, section: &str, strategy: &str) -> anyhow::Result<()> {
    let matcher = matcher_by_name(strategy)?;
    let data = load(&save_path)?;

    println!("=== GVAS save: {:?} ===", save_path);
    println!();
    println!("  size           : {} ({} bytes)", human_bytes(data.len() as u64), data.len());
    println!("  xxh3-64        : {:016x}", xxh3_64(&data));

    let save = match SaveFile::new(&data) {
        Ok(save) => save,
        Err(e) => {
            let head = &data[..data.len().min(MAGIC.len())];
            println!("  magic          : INVALID (found {:02x?})", head);
            return Err(e.into());
        }
    };
    println!("  magic          : ok ({})", String::from_utf8_lossy(MAGIC));

    match save.locate(matcher.as_ref(), section.as_bytes(), 0)? {
        Some(pos) => println!("  section        : {:?} at offset {} (0x{:x})", section, pos, pos),
        None => println!("  section        : {:?} not found", section),
    }
    Ok(())
}

fn run_find(
    save_path: PathBuf,
    key: Option<MarkerKey>,
    text: Option<String>,
    limit: usize,
    strategy: &str,
) -> anyhow::Result<()> {
    let matcher = matcher_by_name(strategy)?;
    let data = load(&save_path)?;
    let save = SaveFile::new(&data)?;

    let (label, needle): (String, Vec<u8>) = match (key, text) {
        (Some(key), _) => (key.to_string(), key.as_bytes().to_vec()),
        (None, Some(text)) => (format!("{:?}", text), text.into_bytes()),
        (None, None) => anyhow::bail!("either --key or --text is required"),
    };
    if needle.is_empty() {
        anyhow::bail!("marker must not be empty");
    }

    let t0 = Instant::now();
    let mut shown = Vec::with_capacity(limit.min(64));
    let mut total = 0usize;
    for pos in save.hits(matcher.as_ref(), &needle)? {
        if total < limit {
            shown.push(pos);
        }
        total += 1;
    }
    let elapsed = t0.elapsed();
    debug!(hits = total, ?elapsed, "scan complete");

    println!(
        "--- {} ({} hit{}, {} search, {:.3}ms) ---",
        label,
        total,
        if total == 1 { "" } else { "s" },
        matcher.name(),
        elapsed.as_secs_f64() * 1000.0
    );
    for pos in shown {
        let end = pos + needle.len();
        match read_f32_le(&data, end) {
            Ok(v) => println!("  {:>10}  0x{:08x}  next f32 = {}", pos, pos, v),
            Err(_) => println!(
                "  {:>10}  0x{:08x}  next f32 = <{} of {} bytes>",
                pos,
                pos,
                data.len() - end,
                FIELD_LEN
            ),
        }
    }
    if total > limit {
        println!("  ... ({} more not shown)", total - limit);
    }
    Ok(())
}

fn run_dump(
    save_path: PathBuf,
    offset: usize,
    len: Option<usize>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let data = load(&save_path)?;
    if offset > data.len() {
        anyhow::bail!("offset {} is beyond file size {}", offset, data.len());
    }
    let end = match len {
        Some(len) => offset.saturating_add(len).min(data.len()),
        None => data.len(),
    };
    let bytes = &data[offset..end];

    match output {
        Some(path) => {
            std::fs::write(&path, bytes)
                .with_context(|| format!("writing dump to {:?}", path))?;
            eprintln!("  wrote {} to {:?}", human_bytes(bytes.len() as u64), path);
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "--- {:?} [{}..{}) ---", save_path, offset, end)?;
            hex_dump(&mut out, bytes, offset)?;
        }
    }
    Ok(())
}

fn run_key(
    hex: Option<MarkerKey>,
    high: Option<u64>,
    low: Option<u64>,
    label: Option<String>,
) -> anyhow::Result<()> {
    let key = match (hex, high, low, label) {
        (Some(key), ..) => key,
        (None, Some(high), Some(low), _) => MarkerKey::from_halves(high, low),
        (None, _, _, Some(label)) => MarkerKey::from_label(&label),
        _ => anyhow::bail!("pass a hex key, --high with --low, or --label"),
    };
    let (high, low) = key.halves();
    println!("  key   : {}", key);
    println!("  high  : 0x{:016x} ({})", high, high as i64);
    println!("  low   : 0x{:016x} ({})", low, low as i64);
    println!("  bytes : {:02x?}", key.as_bytes());
    Ok(())
}

fn run_bench(save_path: PathBuf, key: MarkerKey, count: u64) -> anyhow::Result<()> {
    let data = load(&save_path)?;
    let save = SaveFile::new(&data)?;

    let strategies: [&dyn Matcher; 2] = [&ReanchorMatcher, &ExactMatcher];

    eprintln!(
        "benchmarking {} lookups of {} over {}...",
        count,
        key,
        human_bytes(data.len() as u64)
    );

    println!();
    println!("=== Marker Lookup Benchmark ===");
    for matcher in strategies {
        let mut latencies_us: Vec<u64> = Vec::with_capacity(count as usize);
        let mut last = None;
        let t0 = Instant::now();
        for _ in 0..count {
            let t = Instant::now();
            last = save.locate(matcher, key.as_bytes(), 0)?;
            latencies_us.push(t.elapsed().as_micros() as u64);
        }
        let elapsed = t0.elapsed();
        latencies_us.sort_unstable();

        let p50 = latencies_us[latencies_us.len() / 2];
        let p95 = latencies_us[(latencies_us.len() as f64 * 0.95) as usize];
        let p99 = latencies_us[(latencies_us.len() as f64 * 0.99) as usize];
        let min = latencies_us[0];
        let max = latencies_us[latencies_us.len() - 1];

        println!();
        println!("  strategy    : {}", matcher.name());
        println!(
            "  match       : {}",
            last.map_or_else(|| "not found".to_string(), |p| format!("offset {}", p))
        );
        println!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
        println!(
            "  throughput  : {}/s",
            human_bytes((data.len() as f64 * count as f64 / elapsed.as_secs_f64()) as u64)
        );
        println!("  latency:");
        println!("    min  : {} µs", min);
        println!("    p50  : {} µs", p50);
        println!("    p95  : {} µs", p95);
        println!("    p99  : {} µs", p99);
        println!("    max  : {} µs", max);
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Count {
            save,
            catalog,
            items,
            all,
            key,
            section,
            search,
        } => run_count(save, catalog, items, all, key, section, &search.strategy),
        Commands::Inspect {
            save,
            section,
            search,
        } => run_inspect(save, &section, &search.strategy),
        Commands::Find {
            save,
            key,
            text,
            limit,
            search,
        } => run_find(save, key, text, limit, &search.strategy),
        Commands::Dump {
            save,
            offset,
            len,
            output,
        } => run_dump(save, offset, len, output),
        Commands::Key {
            hex,
            high,
            low,
            label,
        } => run_key(hex, high, low, label),
        Commands::Bench { save, key, count } => run_bench(save, key, count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_u64_accepts_decimal_and_hex() {
        assert_eq!(parse_u64("42").unwrap(), 42);
        assert_eq!(parse_u64("0xFFFF_FFFF_FFFF_FFFF").unwrap(), u64::MAX);
        assert_eq!(parse_u64("1_000").unwrap(), 1000);
        assert!(parse_u64("-1").is_err());
        assert!(parse_u64("0xzz").is_err());
    }

    #[test]
    fn section_resolution_order() {
        let mut catalog = Catalog::new();
        let plain = SectionOpts {
            section: None,
            no_section: false,
        };
        assert_eq!(resolve_section(&plain, None).as_deref(), Some(DEFAULT_SECTION));
        catalog.set_section(Some("Inventory".into()));
        assert_eq!(
            resolve_section(&plain, Some(&catalog)).as_deref(),
            Some("Inventory")
        );
        let explicit = SectionOpts {
            section: Some("Stats".into()),
            no_section: false,
        };
        assert_eq!(
            resolve_section(&explicit, Some(&catalog)).as_deref(),
            Some("Stats")
        );
        let none = SectionOpts {
            section: None,
            no_section: true,
        };
        assert_eq!(resolve_section(&none, Some(&catalog)), None);
    }

    #[test]
    fn hex_dump_pads_short_rows() {
        let mut out = Vec::new();
        hex_dump(&mut out, b"GVAS\x00", 0x10).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("  00000010  47 56 41 53 00 "));
        assert!(text.trim_end().ends_with("|GVAS.|"));
    }

    #[test]
    fn bench_count_is_bounded() {
        let parse = |count: &str| {
            Cli::try_parse_from([
                "gvas",
                "bench",
                "s.sav",
                "--key",
                "00112233445566778899aabbccddeeff",
                "--count",
                count,
            ])
        };
        assert!(parse("0").is_err());
        assert!(parse("1000001").is_err());
        assert!(parse("-3").is_err());
        match parse("5").unwrap().command {
            Commands::Bench { count, .. } => assert_eq!(count, 5),
            _ => panic!("expected bench"),
        }
        match parse("1000000").unwrap().command {
            Commands::Bench { count, .. } => assert_eq!(count, MAX_BENCH_LOOKUPS),
            _ => panic!("expected bench"),
        }
    }
}

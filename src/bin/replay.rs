//! Replay - Rebuild top of book from an ITCH 5.0 capture.
//!
//! Reads a BinaryFILE capture (or an unframed record stream with `--raw`),
//! optionally writes one CSV row per book update and prints a summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use itch_lob::{
    ByteSource, Feed, FeedConfig, FeedStats, FramedSource, Locate, Quote, QuoteUpdate,
    ReaderSource,
};

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Rebuild top of book from an ITCH 5.0 capture")]
struct Args {
    /// Capture file
    path: PathBuf,

    /// Records are not preceded by a 2-byte length
    #[arg(long)]
    raw: bool,

    /// JSON feed configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only report this stock locate
    #[arg(long)]
    locate: Option<Locate>,

    /// Write top-of-book updates as CSV ("-" for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<u64>,
}

/// One CSV row per book update
#[derive(Serialize)]
struct QuoteRow {
    time: Option<NaiveTime>,
    locate: Locate,
    bid_price: Option<Decimal>,
    bid_quantity: i64,
    ask_price: Option<Decimal>,
    ask_quantity: i64,
}

impl From<QuoteUpdate> for QuoteRow {
    fn from(update: QuoteUpdate) -> Self {
        let seconds = update.timestamp / 1_000_000_000;
        let nanos = update.timestamp % 1_000_000_000;
        Self {
            time: NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, nanos as u32),
            locate: update.locate,
            bid_price: live_price(&update.bid),
            bid_quantity: update.bid.quantity,
            ask_price: live_price(&update.ask),
            ask_quantity: update.ask.quantity,
        }
    }
}

fn live_price(quote: &Quote) -> Option<Decimal> {
    quote.is_live().then(|| quote.price.to_decimal())
}

type CsvSink = csv::Writer<Box<dyn Write>>;

fn open_output(path: &Path) -> Result<CsvSink> {
    let sink: Box<dyn Write> = if path == Path::new("-") {
        Box::new(io::stdout().lock())
    } else {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Box::new(BufWriter::new(file))
    };
    Ok(csv::Writer::from_writer(sink))
}

fn replay<S: ByteSource>(
    feed: &mut Feed<S>,
    args: &Args,
    mut output: Option<&mut CsvSink>,
) -> Result<()> {
    loop {
        if args.limit.is_some_and(|limit| feed.stats().messages >= limit) {
            info!(limit = ?args.limit, "record limit reached");
            break;
        }

        match feed.poll() {
            Ok(true) => {
                let Some(update) = feed.last_quote() else {
                    continue;
                };
                if args.locate.is_some_and(|locate| locate != update.locate) {
                    continue;
                }
                if let Some(writer) = output.as_mut() {
                    writer.serialize(QuoteRow::from(update))?;
                }
            }
            Ok(false) => {}
            Err(e) if e.is_closed() => break,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Feed stopped after {} records", feed.stats().messages)
                })
            }
        }
    }

    if let Some(writer) = output {
        writer.flush()?;
    }
    Ok(())
}

fn print_summary<S: ByteSource>(feed: &Feed<S>, args: &Args, elapsed: f64) {
    let stats: &FeedStats = feed.stats();

    println!("\n=== Replay Summary ===");
    println!("Records:      {}", stats.messages);
    println!("Book updates: {}", stats.book_updates);
    println!("Discarded:    {}", stats.discarded);
    println!("Throughput:   {:.2} records/sec", stats.messages as f64 / elapsed);
    println!("----------------------");
    for (kind, count) in stats.by_type() {
        println!("  {} {:<32} {:>12}", kind as u8 as char, format!("{:?}", kind), count);
    }

    let mut books: Vec<_> = feed
        .books()
        .filter(|(locate, _)| args.locate.map_or(true, |l| l == *locate))
        .collect();
    books.sort_unstable_by_key(|(locate, _)| *locate);

    println!("----------------------");
    println!("{:>6} {:>14} {:>10} {:>14} {:>10} {:>10}", "locate", "bid", "qty", "ask", "qty", "orders");
    for (locate, book) in books {
        let (bid, ask) = (book.best_bid(), book.best_ask());
        println!(
            "{:>6} {:>14} {:>10} {:>14} {:>10} {:>10}",
            locate,
            bid.price,
            bid.quantity,
            ask.price,
            ask.quantity,
            book.order_count()
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FeedConfig::from_json_file(path)?,
        None => FeedConfig::default(),
    };
    let source = ReaderSource::open(&args.path)
        .with_context(|| format!("Failed to open capture {}", args.path.display()))?;
    let mut output = args.output.as_deref().map(open_output).transpose()?;

    info!(path = %args.path.display(), raw = args.raw, "replaying");
    let started = Instant::now();

    if args.raw {
        let mut feed = Feed::new(source, config);
        replay(&mut feed, &args, output.as_mut())?;
        print_summary(&feed, &args, started.elapsed().as_secs_f64());
    } else {
        let mut feed = Feed::new(FramedSource::new(source), config);
        replay(&mut feed, &args, output.as_mut())?;
        print_summary(&feed, &args, started.elapsed().as_secs_f64());
    }

    Ok(())
}

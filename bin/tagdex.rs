use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tagdex::{IndexConfig, IndexManager, QueryOperation};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "tagdex")]
#[command(about = "Tag-based document index with bitmap set algebra", long_about = None)]
struct Args {
    /// Delimited data file to index
    #[arg(env = "TAGDEX_DATA_FILE", default_value = "data.csv")]
    data_file: PathBuf,

    /// Status file tracking the last ingested byte offset
    #[arg(long, env = "TAGDEX_STATUS_FILE", default_value = "index_status.txt")]
    status_file: PathBuf,

    /// Directory the index checkpoint is loaded from and saved to
    #[arg(long, env = "TAGDEX_INDEX_DIR", default_value = "index_data")]
    index_dir: PathBuf,

    /// Field delimiter (single ASCII character)
    #[arg(long, env = "TAGDEX_DELIMITER", default_value = "|")]
    delimiter: char,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    info!("Starting tagdex v{}", tagdex::VERSION);
    info!("  Data file: {}", args.data_file.display());
    info!("  Status file: {}", args.status_file.display());
    info!("  Index directory: {}", args.index_dir.display());

    let config = IndexConfig::new(&args.data_file)
        .with_status_path(&args.status_file)
        .with_delimiter(args.delimiter as u8);
    let manager = IndexManager::new(config);

    match manager.load(&args.index_dir) {
        Ok(()) => info!(
            "Checkpoint restored: {} documents, {} tags",
            manager.doc_count(),
            manager.tag_count()
        ),
        Err(e) => info!("No usable checkpoint ({e}), building from data file"),
    }

    match manager.load_incremental(true) {
        Ok(summary) => info!(
            "Ingestion complete: {} records applied, {} malformed lines skipped",
            summary.records, summary.malformed
        ),
        Err(e) => warn!("Ingestion failed: {e}"),
    }

    repl(&manager)?;

    manager.save(&args.index_dir)?;
    Ok(())
}

/// Read commands from stdin until `quit` or end of input.
///
/// Commands:
///   tagsfor <doc_id>               print the document's tags
///   query <tag>... <AND|OR|XOR|ANDNOT>   run a set-algebra query
///   quit                           save the checkpoint and exit
fn repl(manager: &IndexManager) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // end of input behaves like quit
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => {}
            ["quit"] => break,
            ["tagsfor", doc] => {
                let tags = manager.tags_for(doc);
                if tags.is_empty() {
                    println!("no tags found for '{doc}'");
                } else {
                    println!("{}", tags.join(", "));
                }
            }
            ["query", rest @ ..] if rest.len() >= 2 => {
                let Some((op_token, tags)) = rest.split_last() else {
                    continue;
                };
                let Some(op) = QueryOperation::parse(op_token) else {
                    println!("unknown operation '{op_token}', use AND, OR, XOR or ANDNOT");
                    continue;
                };
                let docs = manager.query(tags, op);
                if docs.is_empty() {
                    println!("no documents matched");
                } else {
                    for doc in docs {
                        println!("{doc}");
                    }
                }
            }
            ["query", ..] => {
                println!("usage: query <tag>... <AND|OR|XOR|ANDNOT>");
            }
            _ => {
                println!("commands: tagsfor <doc_id> | query <tag>... <AND|OR|XOR|ANDNOT> | quit");
            }
        }
    }

    Ok(())
}

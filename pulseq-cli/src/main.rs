use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::{error, info, LevelFilter};
use pulseq_cli::{inspect_blocks, BlockSelection, SequenceSummary};
use pulseq_core::{text::MAX_LINE_SIZE, LoadConfig, SequenceLoader};

#[derive(Parser, Debug)]
#[command(
    name = "pulseq-inspect",
    version = env!("CARGO_PKG_VERSION"),
    about = "Load a Pulseq external sequence and inspect its blocks",
    long_about = None,
)]
struct Cli {
    /// Файл .seq или каталог (external.seq либо shapes/events/blocks.seq)
    path: PathBuf,
    /// Номер блока (с 0); можно указать несколько раз
    #[arg(short, long)]
    block: Vec<usize>,
    /// Показать все блоки
    #[arg(short, long, conflicts_with = "block")]
    all: bool,
    /// Распаковать формы и применить ограничители
    #[arg(short, long)]
    decode: bool,
    /// Вывод в JSON
    #[arg(long)]
    json: bool,
    /// Максимальная длина строки файла
    #[arg(long, default_value_t = MAX_LINE_SIZE)]
    max_line_len: usize,
    /// Не предупреждать о несовпадении номеров блоков
    #[arg(long)]
    no_index_warning: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
    /// Подробный вывод (-v: debug, -vv: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        return LevelFilter::Error;
    }

    match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(&cli))
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let config = LoadConfig {
        max_line_len: cli.max_line_len,
        warn_on_block_index_mismatch: !cli.no_index_warning,
        ..Default::default()
    };

    let seq = match SequenceLoader::new(config).load(&cli.path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load {:?}: {e}", cli.path);
            std::process::exit(1);
        }
    };

    let summary = match SequenceSummary::from_sequence(&seq) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let selection = if cli.all {
        BlockSelection::All
    } else if cli.block.is_empty() {
        BlockSelection::None
    } else {
        BlockSelection::Indices(cli.block.clone())
    };

    let reports = match inspect_blocks(&seq, &selection, cli.decode) {
        Ok(r) => r,
        Err(e) => {
            error!("Block inspection failed: {e}");
            std::process::exit(1);
        }
    };

    if cli.json {
        let out = serde_json::json!({
            "summary": summary,
            "blocks": reports,
        });
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("{summary}");
    for report in &reports {
        println!("{report}");
    }

    let clamped: usize = reports
        .iter()
        .filter_map(|r| r.clamped.map(|c| c.total()))
        .sum();
    if clamped > 0 {
        info!("{clamped} samples were clamped to hardware limits");
    }
}

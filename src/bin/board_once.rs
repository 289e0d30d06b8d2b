use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use matchday_board::config::BoardConfig;
use matchday_board::engine::Engine;
use matchday_board::match_fetch::{DataSource, FileFeedSource, HttpFeedSource};
use matchday_board::slots::discover_slots;
use matchday_board::state::SlotBoard;

fn main() -> Result<()> {
    let cfg = BoardConfig::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let slots_path = parse_path_arg("--slots").unwrap_or_else(|| cfg.slots_path.clone());
    let slots = discover_slots(&slots_path)
        .with_context(|| format!("unable to load slots from {}", slots_path.display()))?;

    let mut source: Box<dyn DataSource> = match parse_path_arg("--file") {
        Some(path) => Box::new(FileFeedSource::new(path)),
        None => Box::new(HttpFeedSource::new(cfg.feed_url.clone(), cfg.request_timeout)),
    };

    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &cfg);
    let now = Utc::now();
    let report = engine
        .boot(source.as_mut(), &mut board, now)
        .context("no slots to fill")?;

    println!("{}", board.page_title());
    if let Some(err) = board.error.as_deref() {
        println!("{err}");
    }
    for view in &board.slots {
        let status = view
            .status
            .as_ref()
            .map(|s| s.text.as_str())
            .unwrap_or("Match not found");
        match view.record.as_ref() {
            Some(record) => println!(
                "[{}] {} vs {} | {} | {} | {}",
                view.slot_id,
                record.home,
                record.away,
                status,
                record.score_line(cfg.display_offset),
                record.competition_display_name()
            ),
            None => println!("[{}] {}", view.slot_id, status),
        }
    }

    let report = report?;
    println!(
        "Assigned {}/{} slots ({} by fallback), {} live",
        report.assigned,
        board.slots.len(),
        report.fallbacks,
        report.live_count
    );
    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

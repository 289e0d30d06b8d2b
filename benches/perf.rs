use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::{TimeZone, Utc};
use serde_json::json;

use matchday_board::match_fetch::parse_feed_json;
use matchday_board::matcher::Matcher;
use matchday_board::state::{Slot, SlotHints};
use matchday_board::status::record_status;

const TEAMS: [&str; 12] = [
    "Arsenal",
    "Chelsea",
    "Liverpool",
    "Everton",
    "Real Madrid",
    "Barcelona",
    "Bayern",
    "Dortmund",
    "Inter",
    "Milan",
    "Lyon",
    "Nice",
];

fn feed_json(count: usize) -> String {
    let matches = (0..count)
        .map(|idx| {
            json!({
                "id": 1000 + idx,
                "home": format!("{} {idx}", TEAMS[idx % TEAMS.len()]),
                "away": format!("{} {idx}", TEAMS[(idx + 1) % TEAMS.len()]),
                "utcDate": "2026-06-11T18:00:00Z",
                "isLive": idx % 7 == 0,
                "isFinished": idx % 5 == 0,
                "homeScore": idx % 4,
                "awayScore": idx % 3,
                "currentTime": 30 + idx % 60,
                "competitionCode": "PL",
                "isToday": idx % 2 == 0,
                "isTomorrow": idx % 2 == 1,
            })
        })
        .collect::<Vec<_>>();
    json!({ "success": true, "matches": matches }).to_string()
}

fn bench_feed_parse(c: &mut Criterion) {
    let raw = feed_json(200);
    c.bench_function("feed_parse_200", |b| {
        b.iter(|| {
            let records = parse_feed_json(black_box(&raw)).unwrap();
            black_box(records.len());
        })
    });
}

fn bench_assign(c: &mut Criterion) {
    let records = parse_feed_json(&feed_json(200)).unwrap();
    let slots = (0..24)
        .map(|idx| {
            let slot = Slot::api(format!("s{idx}"));
            if idx % 3 == 0 {
                return slot;
            }
            slot.with_hints(SlotHints {
                match_id: (idx % 2 == 0).then(|| (1000 + idx * 5).to_string()),
                home: Some(TEAMS[idx % TEAMS.len()].to_string()),
                away: Some(TEAMS[(idx + 1) % TEAMS.len()].to_string()),
            })
        })
        .collect::<Vec<_>>();
    let matcher = Matcher::new();
    c.bench_function("assign_24_slots_200_records", |b| {
        b.iter(|| {
            let out = matcher.assign(black_box(&slots), black_box(&records));
            black_box(out.len());
        })
    });
}

fn bench_status(c: &mut Criterion) {
    let records = parse_feed_json(&feed_json(200)).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 6, 11, 12, 0, 0).unwrap();
    c.bench_function("status_200_records", |b| {
        b.iter(|| {
            for record in &records {
                black_box(record_status(black_box(now), record));
            }
        })
    });
}

criterion_group!(benches, bench_feed_parse, bench_assign, bench_status);
criterion_main!(benches);

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use matchday_board::config::BoardConfig;
use matchday_board::engine::Engine;
use matchday_board::match_fetch::{CycleError, DataSource, FetchError};
use matchday_board::slots::parse_slots_json;
use matchday_board::state::{CustomWindow, Slot, SlotBoard, SlotHints, StatusKind};

/// Hands out canned responses in order; an empty script answers with an empty batch.
#[derive(Default)]
struct ScriptedSource {
    script: VecDeque<Result<Value, FetchError>>,
    calls: usize,
}

impl ScriptedSource {
    fn new(script: Vec<Result<Value, FetchError>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
        }
    }
}

impl DataSource for ScriptedSource {
    fn fetch_matches(&mut self) -> Result<Value, FetchError> {
        self.calls += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "success": true, "matches": [] })))
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 11, 15, 0, 0).unwrap()
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn batch(matches: Vec<Value>) -> Result<Value, FetchError> {
    Ok(json!({ "success": true, "matches": matches }))
}

fn fixture(id: &str, home: &str, away: &str, live: bool) -> Value {
    let (home_score, away_score) = if live { (json!(1), json!(0)) } else { (Value::Null, Value::Null) };
    json!({
        "id": id,
        "home": home,
        "away": away,
        "utcDate": "2026-06-11T14:00:00Z",
        "isLive": live,
        "isToday": true,
        "homeScore": home_score,
        "awayScore": away_score,
    })
}

fn server_error() -> Result<Value, FetchError> {
    Err(FetchError::Status {
        status: 500,
        reason: "Internal Server Error".to_string(),
    })
}

fn named(id: &str, home: &str, away: &str) -> Slot {
    Slot::api(id).with_hints(SlotHints {
        match_id: None,
        home: Some(home.to_string()),
        away: Some(away.to_string()),
    })
}

#[test]
fn server_error_schedules_one_retry_and_keeps_interval() {
    let slots = vec![Slot::api("a")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![server_error()]);

    let result = engine.boot(&mut source, &mut board, now()).expect("slots exist");
    assert!(matches!(result, Err(CycleError::Fetch(FetchError::Status { status: 500, .. }))));
    assert_eq!(board.error.as_deref(), Some("Error: HTTP 500 - Internal Server Error"));
    assert_eq!(engine.error(), Some("Error: HTTP 500 - Internal Server Error"));

    let retry = engine.controller().retry_timer().expect("retry armed");
    assert_eq!(engine.scheduler().due_at(retry), Some(secs(30)));
    assert_eq!(engine.polling().current_interval, secs(30));
    assert!(!engine.polling().is_cycle_in_flight);
    let fetch = engine.controller().fetch_timer().expect("fetch timer");
    assert_eq!(engine.scheduler().interval_of(fetch), Some(secs(30)));

    // Regular fetch and retry coincide at 30s: only one request goes out.
    let report = engine
        .run_due(secs(30), now(), &mut source, &mut board)
        .expect("cycle due")
        .expect("recovers");
    assert_eq!(source.calls, 2);
    assert_eq!(report.assigned, 0);
    assert_eq!(board.error, None);
    assert_eq!(engine.error(), None);
    assert!(engine.controller().retry_timer().is_none());
}

#[test]
fn repeated_failures_never_stack_retries() {
    let slots = vec![Slot::api("a")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![server_error(), server_error()]);

    let _ = engine.boot(&mut source, &mut board, now());
    let first = engine.controller().retry_timer();
    let _ = engine.reconcile(&mut source, &mut board, now());
    assert_eq!(engine.controller().retry_timer(), first);
    // fetch + tick + one retry
    assert_eq!(engine.scheduler().len(), 3);
}

#[test]
fn going_live_retargets_once() {
    let slots = vec![named("a", "Arsenal", "Chelsea"), named("b", "Lyon", "Nice")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let quiet = batch(vec![
        fixture("1", "Arsenal", "Chelsea", false),
        fixture("2", "Lyon", "Nice", false),
    ]);
    let live = || {
        batch(vec![
            fixture("1", "Arsenal", "Chelsea", true),
            fixture("2", "Lyon", "Nice", true),
        ])
    };
    let mut source = ScriptedSource::new(vec![quiet, live(), live()]);

    let report = engine.boot(&mut source, &mut board, now()).unwrap().unwrap();
    assert_eq!(report.retargeted, None);
    assert_eq!(report.live_count, 0);
    let old_timer = engine.controller().fetch_timer().unwrap();

    let report = engine.run_due(secs(30), now(), &mut source, &mut board).unwrap().unwrap();
    assert_eq!(report.live_count, 2);
    assert_eq!(report.retargeted, Some(secs(10)));
    assert!(!engine.scheduler().is_active(old_timer));
    let new_timer = engine.controller().fetch_timer().unwrap();
    assert_eq!(engine.scheduler().interval_of(new_timer), Some(secs(10)));
    assert_eq!(engine.scheduler().due_at(new_timer), Some(secs(40)));
    assert_eq!(engine.polling().last_known_live_count, 2);
    assert_eq!(board.page_title(), "🔴 Live Matches (2/2)");

    let report = engine.run_due(secs(40), now(), &mut source, &mut board).unwrap().unwrap();
    assert_eq!(report.retargeted, None);
    assert_eq!(engine.controller().retargets(), 1);
    assert_eq!(engine.controller().fetch_timer(), Some(new_timer));
}

#[test]
fn live_fixture_outside_every_slot_does_not_speed_up_polling() {
    let slots = vec![named("a", "Arsenal", "Chelsea")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![batch(vec![
        fixture("1", "Arsenal", "Chelsea", false),
        fixture("2", "Lyon", "Nice", true),
    ])]);

    let report = engine.boot(&mut source, &mut board, now()).unwrap().unwrap();
    assert_eq!(report.live_count, 0);
    assert_eq!(report.batch_live, 1);
    assert_eq!(engine.polling().current_interval, secs(30));
    assert_eq!(board.page_title(), "🔴 Live Matches (1/2)");
}

#[test]
fn tick_is_idempotent() {
    let slots = vec![named("a", "Arsenal", "Chelsea")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![batch(vec![fixture("1", "Arsenal", "Chelsea", true)])]);
    engine.boot(&mut source, &mut board, now()).unwrap().unwrap();

    engine.tick(&mut board, now());
    let changes = board.changes;
    engine.tick(&mut board, now());
    engine.tick(&mut board, now());
    assert_eq!(board.changes, changes);
    let status = board.slot("a").and_then(|v| v.status.clone()).unwrap();
    assert_eq!(status.kind, StatusKind::Live);
}

#[test]
fn numbered_and_explicit_ids_never_share_a_card() {
    let slots = parse_slots_json(r#"[{"id": "2"}, {}]"#).unwrap();
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![batch(vec![
        fixture("1", "Arsenal", "Chelsea", false),
        fixture("2", "Lyon", "Nice", false),
    ])]);
    engine.boot(&mut source, &mut board, now()).unwrap().unwrap();

    let ids: Vec<&str> = board.slots.iter().map(|v| v.slot_id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3"]);
    let records: Vec<Option<&str>> = board
        .slots
        .iter()
        .map(|v| v.record.as_ref().map(|r| r.id.as_str()))
        .collect();
    assert_eq!(records, vec![Some("1"), Some("2")]);

    let changes = board.changes;
    engine.tick(&mut board, now());
    engine.tick(&mut board, now());
    assert_eq!(board.changes, changes);
}

#[test]
fn countdown_moves_with_the_tick() {
    let slots = vec![named("a", "Real", "Barca")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![batch(vec![json!({
        "id": "9",
        "home": "Real Madrid",
        "away": "Barcelona",
        "utcDate": "2026-06-11T16:01:05Z",
    })])]);
    engine.boot(&mut source, &mut board, now()).unwrap().unwrap();
    assert_eq!(board.slot("a").unwrap().status.as_ref().unwrap().text, "1h 1m 5s");

    engine.advance(secs(5), now() + chrono::Duration::seconds(5), &mut board);
    assert_eq!(board.slot("a").unwrap().status.as_ref().unwrap().text, "1h 1m 0s");

    let later = Utc.with_ymd_and_hms(2026, 6, 11, 16, 2, 0).unwrap();
    let statuses = engine.statuses(later);
    assert_eq!(statuses[0].1.kind, StatusKind::Starting);
    assert_eq!(statuses[0].1.text, "Starting...");
}

#[test]
fn surplus_slots_are_marked_not_found_and_left_alone_by_ticks() {
    let slots = vec![Slot::api("1"), Slot::api("2"), Slot::api("3")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![batch(vec![
        fixture("10", "Arsenal", "Chelsea", false),
        fixture("11", "Lyon", "Nice", false),
    ])]);

    let report = engine.boot(&mut source, &mut board, now()).unwrap().unwrap();
    assert_eq!(report.assigned, 2);
    assert_eq!(report.fallbacks, 2);
    assert_eq!(report.not_found, 1);
    assert!(board.slot("3").unwrap().not_found);
    assert_eq!(board.page_title(), "All Matches Today (2)");

    engine.tick(&mut board, now() + chrono::Duration::seconds(1));
    assert!(board.slot("3").unwrap().not_found);
    assert!(engine.assigned_record("3").is_none());
    assert_eq!(engine.assigned_record("1").map(|r| r.id.as_str()), Some("10"));
}

#[test]
fn assigned_slot_keeps_its_fixture_across_cycles() {
    let slots = vec![Slot::api("a"), Slot::api("b")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let first = batch(vec![
        fixture("10", "Arsenal", "Chelsea", false),
        fixture("11", "Lyon", "Nice", false),
    ]);
    // Same fixtures, different order, and the second one is now live.
    let second = batch(vec![
        fixture("11", "Lyon", "Nice", true),
        fixture("10", "Arsenal", "Chelsea", false),
    ]);
    let mut source = ScriptedSource::new(vec![first, second]);

    engine.boot(&mut source, &mut board, now()).unwrap().unwrap();
    assert_eq!(engine.slot("a").unwrap().assigned_match_id.as_deref(), Some("10"));

    let report = engine.reconcile(&mut source, &mut board, now()).unwrap().unwrap();
    assert_eq!(report.fallbacks, 0);
    assert_eq!(engine.slot("a").unwrap().assigned_match_id.as_deref(), Some("10"));
    assert_eq!(engine.slot("b").unwrap().assigned_match_id.as_deref(), Some("11"));
}

#[test]
fn custom_slots_use_their_window_and_take_no_records() {
    let window = CustomWindow {
        start: Utc.with_ymd_and_hms(2026, 6, 11, 14, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 6, 11, 16, 0, 0).unwrap(),
    };
    let slots = vec![Slot::custom("gala", Some(window)), Slot::custom("bare", None), Slot::api("api")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![batch(vec![fixture("1", "Arsenal", "Chelsea", false)])]);

    let report = engine.boot(&mut source, &mut board, now()).unwrap().unwrap();
    assert_eq!(report.assigned, 1);
    assert_eq!(engine.assigned_record("api").map(|r| r.id.as_str()), Some("1"));
    assert!(engine.slot("gala").unwrap().assigned_match_id.is_none());

    let gala = board.slot("gala").unwrap().status.clone().unwrap();
    assert_eq!(gala.kind, StatusKind::Live);
    assert_eq!(gala.text, "● LIVE");
    let bare = board.slot("bare").unwrap().status.clone().unwrap();
    assert_eq!(bare.kind, StatusKind::Unknown);
    assert_eq!(bare.text, "Custom Match");

    let after = Utc.with_ymd_and_hms(2026, 6, 11, 16, 0, 1).unwrap();
    engine.tick(&mut board, after);
    assert_eq!(board.slot("gala").unwrap().status.as_ref().unwrap().text, "Full Time");
}

#[test]
fn overlapping_cycle_is_skipped() {
    let slots = vec![Slot::api("a")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::default();

    // `start` hands back the guard for the opening fetch.
    assert!(engine.start(&mut board, now()));
    assert!(engine.polling().is_cycle_in_flight);
    assert!(engine.reconcile(&mut source, &mut board, now()).unwrap().is_none());
    assert!(!engine.advance(secs(30), now(), &mut board));
    assert_eq!(source.calls, 0);

    engine
        .finish_cycle(batch(vec![fixture("1", "A", "B", false)]), &mut board, now())
        .unwrap();
    assert!(!engine.polling().is_cycle_in_flight);
    assert!(engine.reconcile(&mut source, &mut board, now()).unwrap().is_some());
    assert_eq!(source.calls, 1);
}

#[test]
fn rejected_payload_surfaces_feed_message() {
    let slots = vec![Slot::api("a")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![Ok(json!({ "success": false, "error": "Rate limited" }))]);

    let result = engine.boot(&mut source, &mut board, now()).unwrap();
    assert!(result.is_err());
    assert_eq!(board.error.as_deref(), Some("Error: Rate limited"));
    assert!(engine.controller().retry_timer().is_some());
}

#[test]
fn shutdown_cancels_everything() {
    let slots = vec![Slot::api("a")];
    let mut board = SlotBoard::new(&slots);
    let mut engine = Engine::new(slots, &BoardConfig::default());
    let mut source = ScriptedSource::new(vec![server_error()]);
    let _ = engine.boot(&mut source, &mut board, now());
    assert!(!engine.scheduler().is_empty());

    engine.shutdown();
    assert!(engine.scheduler().is_empty());
    assert!(engine.controller().is_stopped());
    assert!(engine.run_due(secs(3600), now(), &mut source, &mut board).is_none());
    assert!(engine.reconcile(&mut source, &mut board, now()).unwrap().is_none());
    assert_eq!(source.calls, 1);
}

#[test]
fn no_slots_means_idle() {
    let mut board = SlotBoard::default();
    let mut engine = Engine::new(Vec::new(), &BoardConfig::default());
    let mut source = ScriptedSource::default();
    assert!(engine.boot(&mut source, &mut board, now()).is_none());
    assert!(engine.scheduler().is_empty());
    assert_eq!(source.calls, 0);
    assert!(board.logs.iter().any(|l| l.contains("No match slots")));
}

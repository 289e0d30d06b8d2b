use std::fs;
use std::path::PathBuf;

use chrono::{FixedOffset, TimeZone, Utc};

use matchday_board::match_fetch::{CycleError, PayloadError, parse_feed_json};
use matchday_board::slots::{DiscoveryError, discover_slots, parse_slots_json};
use matchday_board::state::SlotKind;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture file should be readable")
}

fn ist() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).unwrap()
}

#[test]
fn parses_feed_fixture_and_drops_id_less_records() {
    let records = parse_feed_json(&read_fixture("matches.json")).expect("fixture should parse");
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["5001", "5002", "5003", "5004"]);

    let live = &records[0];
    assert_eq!(live.home, "Arsenal FC");
    assert_eq!(live.away, "Chelsea FC");
    assert!(live.is_live);
    assert_eq!(live.current_minute, Some(54));
    assert_eq!(live.utc_kickoff, Some(Utc.with_ymd_and_hms(2026, 6, 11, 14, 0, 0).unwrap()));
    assert_eq!(live.competition_display_name(), "PREMIER LEAGUE");
    assert_eq!(live.round_label(), "Matchday 38");
    assert_eq!(live.score_line(ist()), "2-1 54'");
}

#[test]
fn zone_less_kickoff_reads_as_utc() {
    let records = parse_feed_json(&read_fixture("matches.json")).unwrap();
    let clasico = &records[1];
    assert_eq!(clasico.utc_kickoff, Some(Utc.with_ymd_and_hms(2026, 6, 11, 19, 0, 0).unwrap()));
    assert_eq!(clasico.home_score, None);
    // 19:00 UTC is 00:30 IST.
    assert_eq!(clasico.score_line(ist()), "12:30 AM");
    assert_eq!(clasico.round_label(), "Primera Division");
    assert_eq!(clasico.status_label(), "UPCOMING");
}

#[test]
fn ill_typed_fields_read_as_absent() {
    let records = parse_feed_json(&read_fixture("matches.json")).unwrap();
    let friendly = &records[2];
    assert_eq!(friendly.utc_kickoff, None);
    assert!(!friendly.is_live);
    assert!(friendly.is_finished);
    assert_eq!(friendly.home_score, Some(3));
    assert_eq!(friendly.score_line(ist()), "3 - 3");
    assert_eq!(friendly.competition_display_name(), "XYZ");
    assert_eq!(friendly.status_label(), "Finished");
}

#[test]
fn feed_without_success_flag_is_rejected() {
    let err = parse_feed_json(r#"{"success": false, "error": "Rate limited"}"#).unwrap_err();
    assert!(matches!(err, CycleError::Payload(PayloadError::Rejected(ref msg)) if msg == "Rate limited"));
    assert_eq!(err.to_string(), "Rate limited");

    let err = parse_feed_json(r#"{"success": true, "matches": {}}"#).unwrap_err();
    assert_eq!(err.to_string(), "Invalid JSON response");
}

#[test]
fn garbage_body_is_a_decode_error() {
    let err = parse_feed_json("<html>502 Bad Gateway</html>").unwrap_err();
    assert!(matches!(err, CycleError::Fetch(_)));
}

#[test]
fn empty_batch_is_fine() {
    let records = parse_feed_json(r#"{"success": true, "matches": []}"#).unwrap();
    assert!(records.is_empty());
}

#[test]
fn slot_fixture_discovery() {
    let slots = discover_slots(&fixture_path("slots.json")).expect("slots should load");
    assert_eq!(slots.len(), 5);
    assert_eq!(slots[0].hints.home.as_deref(), Some("Arsenal"));
    assert_eq!(slots[1].hints.match_id.as_deref(), Some("5004"));

    let gala = &slots[2];
    assert_eq!(gala.kind, SlotKind::Custom);
    let window = gala.custom_window.expect("gala has a window");
    assert_eq!(window.end, Utc.with_ymd_and_hms(2026, 6, 11, 20, 0, 0).unwrap());

    // Start without end: over as soon as it starts.
    let no_end = slots[3].custom_window.expect("window from start");
    assert_eq!(slots[3].slot_id, "4");
    assert!(no_end.end < no_end.start);

    assert_eq!(slots[4].slot_id, "5");
    assert_eq!(slots[4].kind, SlotKind::Api);
}

#[test]
fn malformed_slot_file_is_a_parse_error() {
    assert!(matches!(parse_slots_json("{not json"), Err(DiscoveryError::Parse(_))));
    assert!(matches!(parse_slots_json("null"), Err(DiscoveryError::NoSlots)));
}

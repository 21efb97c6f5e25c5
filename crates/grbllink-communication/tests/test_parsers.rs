use grbllink_communication::firmware::grbl::response_parser::{is_terminal_line, ResponseOutcome};
use grbllink_communication::firmware::grbl::settings::{
    parse_setting_line, parse_settings, UNKNOWN_SETTING,
};
use grbllink_communication::firmware::grbl::status_parser::{
    GrblStatus, Overrides, Position, StatusParser,
};
use proptest::prelude::*;

#[test]
fn test_frame_from_firmware() {
    let status = StatusParser::parse(
        "<Idle|MPos:1.000,2.000,3.000|WPos:0.500,0.500,0.500|Bf:15,128|FS:500.0,0.0|Ov:100,100,100|Pn:XYZ>",
    )
    .unwrap();

    assert_eq!(status.state, "Idle");
    assert_eq!(status.machine_pos, Position::new(1.0, 2.0, 3.0));
    assert_eq!(status.work_pos, Position::new(0.5, 0.5, 0.5));
    assert_eq!(status.buffer.planner, 15);
    assert_eq!(status.buffer.rx, 128);
    assert_eq!(status.feed_rate, 500.0);
    assert_eq!(status.spindle_speed, 0.0);
    assert_eq!(status.overrides, Overrides::default());
    assert_eq!(status.input_pins, "XYZ");
}

#[test]
fn test_settings_listing() {
    let settings = parse_settings("$0=10\n$100=250.000\n$1234=3\nok\n");

    assert_eq!(settings.len(), 3);
    assert_eq!(settings[0].description, "Step pulse time (microseconds)");
    assert_eq!(settings[1].description, "X-axis steps per millimeter");
    assert_eq!(settings[2].description, UNKNOWN_SETTING);
}

#[test]
fn test_setting_serializes_flat() {
    let settings = parse_settings("$24=25.000\n");
    let json = serde_json::to_value(&settings[0]).unwrap();

    assert_eq!(json["id"], 24);
    assert_eq!(json["value"], 25.0);
    assert_eq!(json["description"], "Homing locate feed rate (mm/min)");
}

#[test]
fn test_outcome_display() {
    assert_eq!(ResponseOutcome::Ok.to_string(), "ok");
    assert_eq!(
        ResponseOutcome::Error(2).to_string(),
        "error:2 - Bad number format"
    );
    assert_eq!(ResponseOutcome::Timeout.to_string(), "timeout");
}

proptest! {
    #[test]
    fn status_parse_never_panics(line in ".*") {
        let status = StatusParser::parse_or_unknown(&line);
        if !line.starts_with('<') {
            prop_assert_eq!(status, GrblStatus::default());
        }
    }

    #[test]
    fn status_segments_are_independent(
        x in -1000.0f64..1000.0,
        planner in 0i32..64,
        junk in "[a-z]{0,8}",
    ) {
        let line = format!("<Run|{}|MPos:{:.3},0,0|Bf:{},7>", junk, x, planner);
        let status = StatusParser::parse(&line).unwrap();

        prop_assert_eq!(status.state, "Run");
        prop_assert!((status.machine_pos.x - x).abs() < 1e-3);
        prop_assert_eq!(status.buffer.planner, planner);
        prop_assert_eq!(status.work_pos, Position::default());
    }

    #[test]
    fn settings_parse_never_panics(text in "(\\$?[0-9=.a-zA-Z]{0,12}\n){0,8}") {
        for setting in parse_settings(&text) {
            prop_assert!(!setting.description.is_empty());
        }
    }

    #[test]
    fn setting_line_is_read_back(id in 0u16..1000, value in 0.0f64..100_000.0) {
        let line = format!("${}={:.3}", id, value);
        let (parsed_id, parsed_value) = parse_setting_line(&line).unwrap();

        prop_assert_eq!(parsed_id, id);
        prop_assert!((parsed_value - value).abs() < 1e-3);
    }

    #[test]
    fn plain_messages_do_not_end_a_wait(text in "\\[MSG:[B-Z ]{0,20}\\]") {
        prop_assert!(!is_terminal_line(&text));
    }
}

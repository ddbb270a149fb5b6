// reelq-core/tests/utils_tests.rs

use reelq_core::utils::{format_bytes, format_clock, format_duration, parse_ffmpeg_time, parse_time_input};

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0.0), "00:00:00");
    assert_eq!(format_duration(61.0), "00:01:01");
    assert_eq!(format_duration(3600.0 * 2.0 + 60.0 * 30.0 + 15.0), "02:30:15");
}

#[test]
fn test_format_bytes() {
    assert_eq!(format_bytes(1023), "1023 B");
    assert_eq!(format_bytes(1024), "1.00 KiB");
    assert_eq!(format_bytes(1024 * 1024 - 1), "1024.00 KiB"); // Check rounding
    assert_eq!(format_bytes(1024 * 1024 * 1536 / 1024), "1.50 MiB");
}

#[test]
fn test_clock_round_trip_of_user_input() {
    for text in ["00:00", "01:40", "59:59", "01:02:05"] {
        let seconds = parse_time_input(text).unwrap();
        assert_eq!(format_clock(Some(seconds)), text);
    }
}

#[test]
fn test_parse_time_input_forms() {
    assert_eq!(parse_time_input("1:30"), Some(90.0));
    assert_eq!(parse_time_input("0:01:30.5"), Some(90.5));
    assert_eq!(parse_time_input("12.25"), Some(12.25));
    assert_eq!(parse_time_input(""), None);
    assert_eq!(parse_time_input("-3"), None);
    assert_eq!(parse_time_input("1:2:3:4"), None);
    assert_eq!(parse_time_input("abc"), None);
}

#[test]
fn test_parse_ffmpeg_time_requires_three_fields() {
    assert_eq!(parse_ffmpeg_time("00:00:50.00"), Some(50.0));
    assert_eq!(parse_ffmpeg_time("01:40"), None);
}

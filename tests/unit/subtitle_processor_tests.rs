/*!
 * Tests for SRT parsing and writing
 */

use subrelay::subtitle_processor::{SubtitleCollection, SubtitleEntry};

use crate::common;

#[test]
fn test_fromBytes_withLatin1Byte_shouldKeepTrack() {
    let mut body = b"1\n00:00:01,000 --> 00:00:02,000\nCaf".to_vec();
    body.push(0xE9);
    body.extend_from_slice(b"\n");

    let collection = SubtitleCollection::from_bytes(&body).unwrap();
    assert_eq!(collection.len(), 1);
    assert!(collection.entries[0].text.starts_with("Caf"));
}

#[test]
fn test_parseSrtString_withMalformedBlock_shouldSkipIt() {
    let content = "1\nnot a timing line\nText\n\n2\n00:00:03.000 --> 00:00:04.000\nKept\n";
    let collection = SubtitleCollection::parse_srt_string(content).unwrap();

    assert_eq!(collection.len(), 1);
    assert_eq!(collection.entries[0].text, "Kept");
    assert_eq!(collection.entries[0].start_time_ms, 3_000);
}

#[test]
fn test_writeToSrt_shouldRoundTripThroughDisk() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("out.srt");

    let original = SubtitleCollection::parse_srt_string(common::SAMPLE_SRT).unwrap();
    original.write_to_srt(&path).unwrap();

    let reread = SubtitleCollection::parse_srt_string(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reread.texts(), original.texts());
    assert_eq!(reread.entries[2].end_time_ms, 14_000);
}

#[test]
fn test_formatTimestamp_shouldPadComponents() {
    assert_eq!(SubtitleEntry::format_timestamp(3_723_004), "01:02:03,004");
    assert_eq!(SubtitleEntry::format_timestamp(600_000), "00:10:00,000");
}

/*!
 * Tests for subtitle parsing, serialization and export naming
 */

use anyhow::Result;
use subfix::subtitle_processor::{self, export_file_name, SubtitleEntry, SubtitleFile};
use crate::common;

/// Test that serialize then parse gives back the same entries
#[test]
fn test_roundTrip_withWellFormedEntries_shouldBeIdentity() {
    let entries = vec![
        SubtitleEntry::new(1, "00:00:01,000 --> 00:00:02,000", "你好"),
        SubtitleEntry::new(4, "00:00:03,000 --> 00:00:04,000", "two\nlines"),
        SubtitleEntry::new(10, "01:02:03,004 --> 01:02:05,000", "- Dash\n- Dialog"),
    ];

    let parsed = subtitle_processor::parse(&subtitle_processor::serialize(&entries));

    assert_eq!(parsed, entries);
}

/// Test that the sample fixture parses with ids and times intact
#[test]
fn test_parse_withSampleFile_shouldKeepIdsAndTimes() {
    let entries = subtitle_processor::parse(common::SAMPLE_SRT);

    let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 5, 8]);
    assert_eq!(entries[1].time, "00:00:03,000 --> 00:00:04,500");
    assert_eq!(entries[2].text, "where is {p}?\ngoing home");
}

/// Test that CRLF line endings are accepted
#[test]
fn test_parse_withCrlf_shouldParseAllBlocks() {
    let content = "1\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nWorld\r\n";

    let entries = subtitle_processor::parse(content);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "Hello");
    assert_eq!(entries[1].time, "00:00:03,000 --> 00:00:04,000");
}

/// Test that a file starting with a UTF-8 byte order mark keeps its first cue
#[test]
fn test_load_withByteOrderMark_shouldKeepFirstEntry() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = format!("\u{feff}{}", common::SAMPLE_SRT);
    let path = common::create_test_file(temp_dir.path(), "windows.srt", &content)?;

    let file = SubtitleFile::load(&path)?;

    assert_eq!(file.entries.len(), 5);
    assert_eq!(file.entries[0].id, 1);
    assert_eq!(file.entries[0].time, "00:00:01,000 --> 00:00:02,000");
    assert_eq!(subtitle_processor::serialize(&file.entries), subtitle_processor::serialize(&subtitle_processor::parse(common::SAMPLE_SRT)));
    Ok(())
}

/// Test that malformed blocks are skipped without failing the parse
#[test]
fn test_parse_withMalformedBlocks_shouldSkipThem() {
    let content = "x\n00:00:01,000 --> 00:00:02,000\nBad id\n\n\
                   2\nno time range\nBad time\n\n\
                   3\n00:00:05,000 --> 00:00:06,000\n\n\
                   4\n00:00:07,000 --> 00:00:08,000\nGood";

    let entries = subtitle_processor::parse(content);

    assert_eq!(entries, vec![SubtitleEntry::new(4, "00:00:07,000 --> 00:00:08,000", "Good")]);
}

/// Test that empty input gives no entries
#[test]
fn test_parse_withBlankInput_shouldBeEmpty() {
    assert!(subtitle_processor::parse("  \n\n ").is_empty());
}

/// Test export naming
#[test]
fn test_exportFileName_shouldStripSrtExtension() {
    assert_eq!(export_file_name("movie.srt", "vi"), "movie.fixed.vi.srt");
    assert_eq!(export_file_name("movie.zh.srt", "vi"), "movie.zh.fixed.vi.srt");
    assert_eq!(export_file_name("notes.txt", "vi"), "notes.txt.fixed.vi.srt");
}

/// Test loading a subtitle file from disk
#[test]
fn test_subtitleFile_load_shouldReadNameAndEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "episode.srt", common::SAMPLE_SRT)?;

    let file = SubtitleFile::load(&path)?;

    assert_eq!(file.file_name, "episode.srt");
    assert_eq!(file.entries.len(), 5);
    assert_eq!(file.export_file_name("vi"), "episode.fixed.vi.srt");
    Ok(())
}

/// Test that a missing file is an error
#[test]
fn test_subtitleFile_load_withMissingFile_shouldFail() {
    assert!(SubtitleFile::load("/definitely/not/here.srt").is_err());
}

//! Filesystem round trips through caption-io

use std::fs;
use std::path::Path;

use caption_core::{Dispatcher, FormatKind, MicroTime, ReadOptions, SaveOptions, StyledText};
use caption_io::{join_file, load_json, open_file, save_files, save_json, IoError};
use pretty_assertions::assert_eq;

const SRT: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello <b>world</b>\n\n2\n00:00:04,000 --> 00:00:05,000\nBye\n";

fn write(path: &Path, text: &str) {
    fs::write(path, text).expect("fixture should be writable");
}

#[test]
fn open_takes_languages_from_filename() -> Result<(), IoError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("movie.de.srt");
    write(&path, SRT);

    let document = open_file(&Dispatcher::new(), &path, &ReadOptions::default())?;
    assert_eq!(document.default_language(), "de");
    assert_eq!(document.len(), 2);
    assert_eq!(
        document[1].text("de").map(StyledText::plain_text).as_deref(),
        Some("Bye")
    );
    assert_eq!(document.filename.as_deref(), Some(path.display().to_string().as_str()));
    Ok(())
}

#[test]
fn content_decides_the_codec() -> Result<(), IoError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("misnamed.srt");
    write(&path, "WEBVTT\n\n00:01.000 --> 00:02.000\nfrom vtt\n");

    let document = open_file(&Dispatcher::new(), &path, &ReadOptions::default())?;
    assert_eq!(document[0].start_time(), MicroTime::from_millis(1_000));
    Ok(())
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.srt");
    let err = open_file(&Dispatcher::new(), &path, &ReadOptions::default())
        .expect_err("absent file should fail");
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    assert!(err.to_string().contains("absent.srt"));
}

#[test]
fn unknown_content_is_an_engine_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("notes.txt");
    write(&path, "shopping list\n");
    let err = open_file(&Dispatcher::new(), &path, &ReadOptions::default())
        .expect_err("plain text should be rejected");
    assert!(matches!(err, IoError::Core(caption_core::CoreError::UnrecognizedFormat)));
}

#[test]
fn save_writes_one_file_per_format() -> Result<(), IoError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = dir.path().join("movie.en.srt");
    write(&source, SRT);
    let dispatcher = Dispatcher::new();
    let document = open_file(&dispatcher, &source, &ReadOptions::default())?;

    let base = dir.path().join("out").join("movie");
    let written = save_files(
        &dispatcher,
        &document,
        &base,
        &[FormatKind::Srt, FormatKind::Vtt],
        &SaveOptions::default(),
    )?;
    assert_eq!(
        written,
        vec![
            dir.path().join("out").join("movie.en.srt"),
            dir.path().join("out").join("movie.en.vtt"),
        ]
    );
    assert_eq!(fs::read_to_string(&written[0]).expect("srt written"), SRT);
    let vtt = fs::read_to_string(&written[1]).expect("vtt written");
    assert!(vtt.starts_with("WEBVTT"));
    assert!(vtt.contains("00:00:04.000 --> 00:00:05.000\nBye"));
    Ok(())
}

#[test]
fn filenames_can_omit_languages() -> Result<(), IoError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let dispatcher = Dispatcher::new();
    let document = dispatcher.read_str(SRT, &ReadOptions::default().with_languages(&["en"]))?;
    let written = save_files(
        &dispatcher,
        &document,
        &dir.path().join("plain.srt"),
        &[FormatKind::Srt],
        &SaveOptions::default().with_languages_in_filename(false),
    )?;
    assert_eq!(written, vec![dir.path().join("plain.srt")]);
    Ok(())
}

#[test]
fn snapshot_restores_an_equal_document() -> Result<(), IoError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let dispatcher = Dispatcher::new();
    let document = dispatcher.read_str(
        "{1}{1}10\n{DEFAULT}{C:$0000FF}\n{10}{20}{o:3}moved\n",
        &ReadOptions::default().with_languages(&["pl"]),
    )?;

    let path = dir.path().join("snapshot.json");
    save_json(&document, &path)?;
    let json = fs::read_to_string(&path).expect("snapshot written");
    for field in ["default_language", "time_length", "filename", "extensions", "options", "block_list"] {
        assert!(json.contains(&format!("\"{field}\"")), "missing {field}");
    }
    let restored = load_json(&path)?;
    assert_eq!(restored, document);
    assert_eq!(
        dispatcher.save_to_string(&restored, FormatKind::Sub, &SaveOptions::default())?,
        "{DEFAULT}{C:$0000FF}\n{10}{20}{o:3}moved\n"
    );
    Ok(())
}

#[test]
fn corrupt_snapshot_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    write(&path, "{\"block_list\": 3}");
    assert!(matches!(load_json(&path), Err(IoError::Snapshot(_))));
}

#[test]
fn join_places_file_after_document() -> Result<(), IoError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("part2.srt");
    write(&path, "1\n00:00:01,000 --> 00:00:02,000\nPart two\n");

    let dispatcher = Dispatcher::new();
    let mut document = dispatcher.read_str(SRT, &ReadOptions::default().with_languages(&["en"]))?;
    join_file(
        &dispatcher,
        &mut document,
        &path,
        &ReadOptions::default(),
        true,
        MicroTime::ZERO,
    )?;
    assert_eq!(document.len(), 3);
    assert_eq!(document[2].start_time(), MicroTime::from_millis(6_000));
    assert_eq!(document.time_length(), MicroTime::from_millis(7_000));
    assert_eq!(
        document[2].text("en").map(StyledText::plain_text).as_deref(),
        Some("Part two")
    );
    Ok(())
}

#[test]
fn failed_join_leaves_document_alone() -> Result<(), IoError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("bad.srt");
    write(&path, "1\n00:00:01,000 --> 00:00:02,000\nok\n\nx\nnot a timing\n");

    let dispatcher = Dispatcher::new();
    let mut document = dispatcher.read_str(SRT, &ReadOptions::default())?;
    let before = document.clone();
    let result = join_file(
        &dispatcher,
        &mut document,
        &path,
        &ReadOptions::default(),
        false,
        MicroTime::ZERO,
    );
    assert!(result.is_err());
    assert_eq!(document, before);
    Ok(())
}

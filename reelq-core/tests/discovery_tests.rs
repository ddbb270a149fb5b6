// reelq-core/tests/discovery_tests.rs

use reelq_core::discovery::{find_processable_files, is_video_file};
use reelq_core::error::CoreError;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn test_find_processable_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input_dir = dir.path();

    File::create(input_dir.join("b_clip.MOV"))?; // Case-insensitive extension
    File::create(input_dir.join("A_clip.mp4"))?;
    File::create(input_dir.join("loop.gif"))?;
    File::create(input_dir.join("notes.txt"))?;
    File::create(input_dir.join("poster.jpg"))?;
    fs::create_dir(input_dir.join("subdir"))?;
    File::create(input_dir.join("subdir").join("nested.mkv"))?; // Top level only

    let files = find_processable_files(input_dir)?;
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    // Sorted by lower-cased name, original case preserved
    assert_eq!(names, vec!["A_clip.mp4", "b_clip.MOV", "loop.gif"]);

    dir.close()?;
    Ok(())
}

#[test]
fn test_find_processable_files_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    File::create(dir.path().join("document.txt"))?;

    match find_processable_files(dir.path()) {
        Err(CoreError::NoFilesFound) => {}
        other => panic!("Unexpected result: {:?}", other),
    }

    dir.close()?;
    Ok(())
}

#[test]
fn test_find_processable_files_nonexistent_dir() {
    let missing = PathBuf::from("surely_this_does_not_exist_42_integration");
    assert!(matches!(
        find_processable_files(&missing),
        Err(CoreError::Io(_))
    ));
}

#[test]
fn test_is_video_file() {
    for name in ["a.mp4", "a.mkv", "a.MOV", "a.webm", "a.avi", "a.m4v", "a.mpg", "a.mpeg", "a.gif"] {
        assert!(is_video_file(Path::new(name)), "{name}");
    }
    assert!(!is_video_file(Path::new("a.wav")));
    assert!(!is_video_file(Path::new("mp4")));
}

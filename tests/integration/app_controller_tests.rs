/*!
 * Tests for the interactive controller
 */

use anyhow::Result;
use std::path::PathBuf;

use subfix::app_config::Config;
use subfix::app_controller::{Command, Controller, Flow};
use subfix::providers::mock::MockProvider;
use subfix::translation::{Character, CharacterRoster, Gender};
use subfix::View;
use crate::common;

fn controller() -> Controller {
    let provider = MockProvider::with_responder(common::scripted_reply);
    Controller::with_session(Config::default(), common::create_manager(provider, common::key_store(), 2))
}

/// Test parsing of the interactive commands
#[test]
fn test_commandParse_shouldRecognizeCommands() -> Result<()> {
    assert_eq!(Command::parse("load my movie.srt")?, Command::Load(PathBuf::from("my movie.srt")));
    assert_eq!(Command::parse("check-key")?, Command::CheckKey(None));
    assert_eq!(Command::parse("check-key abc")?, Command::CheckKey(Some("abc".into())));
    assert_eq!(
        Command::parse("gender Lý Tiểu Long nam")?,
        Command::SetGender { name: "Lý Tiểu Long".into(), gender: Gender::Male }
    );
    assert_eq!(Command::parse("show fixed")?, Command::Show(Some(View::Fixed)));
    assert_eq!(Command::parse("  QUIT ")?, Command::Quit);
    assert_eq!(Command::parse("export")?, Command::Export(None));
    Ok(())
}

/// Test parse errors for bad input
#[test]
fn test_commandParse_withBadInput_shouldFail() {
    assert!(Command::parse("load").is_err());
    assert!(Command::parse("gender OnlyName").is_err());
    assert!(Command::parse("show nowhere").is_err());
    assert!(Command::parse("dance").is_err());
}

/// Test the whole flow driven through commands
#[tokio::test]
async fn test_execute_fullFlow_shouldExportFile() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "show.srt", common::SAMPLE_SRT)?;
    let out_dir = temp_dir.path().join("out");
    let controller = controller();

    for command in [
        Command::Load(source),
        Command::Normalize,
        Command::Translate,
        Command::Analyze,
        Command::SetGender { name: "A".into(), gender: Gender::Female },
        Command::Confirm,
        Command::Export(Some(out_dir.clone())),
    ] {
        assert_eq!(controller.execute(command).await?, Flow::Continue);
    }

    let exported = std::fs::read_to_string(out_dir.join("show.fixed.vi.srt"))?;
    assert!(exported.starts_with("1\n00:00:01,000 --> 00:00:02,000\nVI:A GREETS THEY"));
    assert_eq!(controller.execute(Command::Quit).await?, Flow::Quit);
    Ok(())
}

/// Test that failures surface as errors without ending the session
#[tokio::test]
async fn test_execute_confirmWithoutReview_shouldError() {
    let controller = controller();
    controller.session().load_file("a.srt", common::SAMPLE_SRT);

    assert!(controller.execute(Command::Confirm).await.is_err());
    assert!(controller.execute(Command::Status).await.is_ok());
}

/// Test view rendering
#[test]
fn test_renderView_shouldShowStageOrPlaceholder() {
    let controller = controller();
    controller.session().load_file("a.srt", common::SAMPLE_SRT);

    let original = controller.render_view(View::Original);
    assert!(original.starts_with("== Original ==\n1\n00:00:01,000"));
    assert_eq!(controller.render_view(View::Fixed), "== Fixed ==\n(no data yet)");
    assert!(controller.render_view(View::Log).contains("Loaded file: a.srt (5 entries)"));
}

/// Test roster rendering
#[test]
fn test_renderRoster_shouldNumberCharacters() {
    let roster = CharacterRoster::from_characters(vec![
        Character::new("A", Gender::Male),
        Character::new("B", Gender::Unknown),
    ]);

    assert_eq!(Controller::render_roster(&roster), "  1. A (Male)\n  2. B (Unknown)");
    assert_eq!(Controller::render_roster(&CharacterRoster::default()), "No characters found.");
}

use std::sync::{Arc, Mutex};

use dualscreen::audio::AudioSink;
use dualscreen::core::{ExitCode, LogHostMenu, Resolution};
use dualscreen::demo::{build_channels, build_stage};
use dualscreen::resources::{Resources, BACKGROUND_MUSIC, DEFAULT_FONT};
use dualscreen::{AppConfig, Application, LoopError};

#[derive(Clone, Default)]
struct RecordingSink {
    calls: Arc<Mutex<Vec<String>>>,
}

impl AudioSink for RecordingSink {
    fn load(&mut self, data: Arc<[u8]>) {
        self.calls.lock().unwrap().push(format!("load {}", data.len()));
    }

    fn play(&mut self) {
        self.calls.lock().unwrap().push("play".into());
    }

    fn stop(&mut self) {
        self.calls.lock().unwrap().push("stop".into());
    }

    fn set_volume(&mut self, volume: u8) {
        self.calls.lock().unwrap().push(format!("volume {volume}"));
    }

    fn set_loop(&mut self, looped: bool) {
        self.calls.lock().unwrap().push(format!("loop {looped}"));
    }
}

fn config(max_frames: u64) -> AppConfig {
    AppConfig {
        primary: Resolution::new(64, 36),
        secondary: Resolution::new(32, 18),
        refresh_hz: None,
        fade_step: 85,
        max_frames: Some(max_frames),
        ..AppConfig::default()
    }
}

fn resources() -> Resources {
    Resources::new()
        .with_file(DEFAULT_FONT, b"\x00\x01\x00\x00font".to_vec())
        .with_file(BACKGROUND_MUSIC, b"OggS....".to_vec())
}

#[test]
fn test_exec_runs_on_render_thread() {
    let mut app = Application::new(
        config(3),
        resources(),
        build_channels(None),
        Box::new(RecordingSink::default()),
        Box::new(LogHostMenu),
    )
    .unwrap();

    let code = app
        .exec(|context| {
            assert_eq!(std::thread::current().name(), Some("render"));
            build_stage(context)
        })
        .unwrap();

    assert_eq!(code, ExitCode::Relaunch);
    assert!(!app.menu_requested());
}

#[test]
fn test_configured_exit_code_returned() {
    let mut app = Application::new(
        AppConfig {
            exit_code: ExitCode::Exit,
            ..config(1)
        },
        resources(),
        build_channels(None),
        Box::new(RecordingSink::default()),
        Box::new(LogHostMenu),
    )
    .unwrap();

    assert_eq!(app.exec(build_stage).unwrap(), ExitCode::Exit);
    assert_eq!(app.exec(build_stage).unwrap().code(), 0);
}

#[test]
fn test_missing_font_aborts_exec() {
    let mut app = Application::new(
        config(1),
        Resources::new(),
        build_channels(None),
        Box::new(RecordingSink::default()),
        Box::new(LogHostMenu),
    )
    .unwrap();

    assert!(matches!(app.exec(build_stage), Err(LoopError::MissingFont(_))));
}

#[test]
fn test_music_started_and_stopped_with_application() {
    let sink = RecordingSink::default();
    let calls = Arc::clone(&sink.calls);

    let mut app = Application::new(
        config(2),
        resources(),
        build_channels(None),
        Box::new(sink),
        Box::new(LogHostMenu),
    )
    .unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["load 8", "loop true", "play", "volume 50"]
    );

    app.exec(build_stage).unwrap();
    assert!(!calls.lock().unwrap().contains(&"stop".to_string()));

    drop(app);
    assert_eq!(calls.lock().unwrap().last().map(String::as_str), Some("stop"));
}

#[test]
fn test_no_music_without_resource() {
    let sink = RecordingSink::default();
    let calls = Arc::clone(&sink.calls);

    let app = Application::new(
        config(1),
        Resources::new().with_file(DEFAULT_FONT, b"OTTOfont".to_vec()),
        build_channels(None),
        Box::new(sink),
        Box::new(LogHostMenu),
    )
    .unwrap();
    drop(app);

    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_invalid_config_rejected() {
    let result = Application::new(
        AppConfig {
            fade_step: 0,
            ..AppConfig::default()
        },
        resources(),
        build_channels(None),
        Box::new(RecordingSink::default()),
        Box::new(LogHostMenu),
    );
    assert!(matches!(result, Err(LoopError::Config(_))));
}

#[test]
fn test_deletion_queue_empty_after_exec() {
    let mut app = Application::new(
        config(40),
        resources(),
        build_channels(None),
        Box::new(RecordingSink::default()),
        Box::new(LogHostMenu),
    )
    .unwrap();
    let deletion = app.deletion_queue();

    app.exec(build_stage).unwrap();

    assert!(deletion.is_pending_empty());
    assert!(deletion.is_staged_empty());
}

#[test]
fn test_exit_handle_stops_unbounded_loop() {
    let mut app = Application::new(
        AppConfig {
            max_frames: None,
            ..config(0)
        },
        resources(),
        build_channels(None),
        Box::new(RecordingSink::default()),
        Box::new(LogHostMenu),
    )
    .unwrap();

    // Raised before exec: the loop runs no steady frame and goes straight to the fade
    app.exit_handle().request_exit();
    assert_eq!(app.exec(build_stage).unwrap(), ExitCode::Relaunch);
}

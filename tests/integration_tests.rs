//! # Integration Tests for moodq
//!
//! End-to-end tests through the public API and the `moodq` binary: recorded
//! frame streams driving a session against an on-disk catalog and an
//! in-memory player, failure absorption at the provider and sink seams, and
//! configuration loading.

use anyhow::Result;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

use moodq::config::SessionConfig;
use moodq::debounce::{StabilityState, Transition};
use moodq::emotion::EmotionLabel::{self, *};
use moodq::error::{PlaybackError, ProviderError, QueueError};
use moodq::playback::{MemorySink, PlaybackSink, QueueSnapshot};
use moodq::queue::{QueueActions, QueueController, QueuePolicy, TopUpOutcome};
use moodq::session::{MoodSession, SessionEvent};
use moodq::source::{EmotionClassifier, ScriptedClassifier, ScriptedFrame, ScriptedFrames};
use moodq::tracks::{LocalCatalog, PlaylistTrackProvider, QueryTable, Track, TrackProvider};

/// Writes a catalog with one happy and one sad playlist of twelve tracks each.
fn create_test_catalog(dir: &TempDir) -> Result<PathBuf> {
    let tracks = |prefix: &str| -> Vec<serde_json::Value> {
        (1..=12)
            .map(|n| {
                json!({
                    "id": format!("{prefix}{n}"),
                    "uri": format!("spotify:track:{prefix}{n}"),
                    "name": format!("{prefix} song {n}"),
                    "artists": [{"name": "Test Artist"}]
                })
            })
            .collect()
    };

    let catalog = json!({
        "playlists": [
            {"id": "pl-happy", "name": "Happy Hits", "tags": ["upbeat"], "tracks": tracks("h")},
            {"id": "pl-sad", "name": "Sad Songs", "tags": ["melancholy"], "tracks": tracks("s")}
        ]
    });

    let path = dir.path().join("catalog.json");
    fs::write(&path, serde_json::to_string_pretty(&catalog)?)?;
    Ok(path)
}

/// A config where every frame is classified and emitted, so labels reach the
/// debouncer one per frame.
fn create_test_config(dir: &TempDir) -> Result<PathBuf> {
    let config = json!({
        "window_capacity": 1,
        "analysis_interval": 1,
        "check_interval": 1,
        "provider": {
            "queries": {"happy": ["happy"], "sad": ["sad"]},
            "seed": 7
        }
    });

    let path = dir.path().join("config.json");
    fs::write(&path, config.to_string())?;
    Ok(path)
}

fn frame_line(label: EmotionLabel) -> String {
    json!({"dominant": label, "confidence": {label.as_str(): 90.0}}).to_string()
}

fn write_frames(dir: &TempDir, lines: &[String]) -> Result<PathBuf> {
    let path = dir.path().join("frames.jsonl");
    fs::write(&path, lines.join("\n"))?;
    Ok(path)
}

fn track(n: usize) -> Track {
    Track {
        id: Some(format!("t{n}")),
        uri: Some(format!("spotify:track:t{n}")),
        name: format!("Track {n}"),
        artists: vec!["Test Artist".to_string()],
    }
}

/// Provider whose upstream is always down.
#[derive(Debug, Default)]
struct UnreachableProvider {
    calls: usize,
}

impl TrackProvider for UnreachableProvider {
    fn fetch_tracks(&mut self, _emotion: EmotionLabel, _limit: usize) -> Result<Vec<Track>, ProviderError> {
        self.calls += 1;
        Err(ProviderError::Unreachable("connection refused".into()))
    }
}

/// Provider that always has plenty of tracks.
#[derive(Debug, Default)]
struct StockProvider;

impl TrackProvider for StockProvider {
    fn fetch_tracks(&mut self, _emotion: EmotionLabel, limit: usize) -> Result<Vec<Track>, ProviderError> {
        Ok((0..limit).map(track).collect())
    }
}

/// Player that is reachable for status but refuses every change.
#[derive(Debug, Default)]
struct RefusingSink;

impl PlaybackSink for RefusingSink {
    fn start_playback(&mut self, _uris: &[String]) -> Result<(), PlaybackError> {
        Err(PlaybackError::Unavailable("no active device".into()))
    }

    fn enqueue(&mut self, uri: &str) -> Result<(), PlaybackError> {
        Err(PlaybackError::Rejected {
            command: format!("add {uri}"),
            reason: "no active device".into(),
        })
    }

    fn queue(&mut self) -> Result<QueueSnapshot, PlaybackError> {
        Ok(QueueSnapshot { size: 0 })
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_full_session_switches_between_emotions() -> Result<()> {
        let dir = TempDir::new()?;
        let config = SessionConfig::load(Some(&create_test_config(&dir)?))?;
        let catalog = LocalCatalog::from_file(&create_test_catalog(&dir)?)?;

        let mut lines: Vec<String> = [Happy, Happy, Happy, Happy, Happy].map(frame_line).to_vec();
        lines.push("null".to_string());
        lines.extend([Sad, Sad, Sad].map(frame_line));
        let mut frames = ScriptedFrames::from_file(&write_frames(&dir, &lines)?)?;

        let provider = PlaylistTrackProvider::from_config(catalog, &config.provider);
        let controller = QueueController::with_policy(provider, MemorySink::new(), QueuePolicy::from(&config));
        let mut session = MoodSession::new(&config, controller);

        let mut events = Vec::new();
        let report = session.run_with_observer(&mut frames, &mut ScriptedClassifier, |e| events.push(e.clone()));

        assert_eq!(report.frames, 9);
        assert_eq!(report.classified, 9);
        // The no-face frame re-emits the last smoothed label.
        assert_eq!(report.emitted, 9);
        assert_eq!(report.changes, 2);
        assert_eq!(report.confirmed, Some(Sad));
        assert!(!report.stopped);

        let confirmations: Vec<&SessionEvent> = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Confirmed { .. }))
            .collect();
        assert_eq!(
            confirmations,
            vec![
                &SessionEvent::Confirmed { from: None, to: Happy },
                &SessionEvent::Confirmed { from: Some(Happy), to: Sad },
            ]
        );

        let sink = session.queue().sink();
        assert_eq!(sink.starts(), 2);
        assert_eq!(sink.enqueues(), 0);
        assert_eq!(sink.now_playing(), Some("spotify:track:s1"));
        assert_eq!(sink.upcoming().len(), 9);
        Ok(())
    }

    #[test]
    fn test_classification_errors_do_not_stop_the_session() -> Result<()> {
        let dir = TempDir::new()?;
        let config = SessionConfig::load(Some(&create_test_config(&dir)?))?;

        let mut lines = vec![r#"{"error": "model crashed"}"#.to_string()];
        lines.extend([Happy, Happy].map(frame_line));
        lines.push(r#"{"error": "model crashed again"}"#.to_string());
        lines.push(frame_line(Happy));
        let mut frames = ScriptedFrames::from_file(&write_frames(&dir, &lines)?)?;

        let controller = QueueController::new(StockProvider, MemorySink::new());
        let mut session = MoodSession::new(&config, controller);
        let report = session.run(&mut frames, &mut ScriptedClassifier);

        assert_eq!(report.frames, 5);
        assert_eq!(report.classification_errors, 2);
        // The failed frame still emits the previous happy result.
        assert_eq!(report.emitted, 4);
        assert_eq!(report.confirmed, Some(Happy));
        Ok(())
    }

    #[test]
    fn test_provider_outage_keeps_session_running() {
        let config = SessionConfig {
            window_capacity: 1,
            analysis_interval: 1,
            check_interval: 1,
            ..SessionConfig::default()
        };
        let controller = QueueController::new(UnreachableProvider::default(), MemorySink::new());
        let mut session = MoodSession::new(&config, controller);

        let mut frames = ScriptedFrames::new(
            [Fear, Fear, Fear, Fear, Neutral].map(|l| Ok(Some(moodq::emotion::Detection::new(l)))),
        );
        let report = session.run(&mut frames, &mut ScriptedClassifier);

        assert_eq!(report.frames, 5);
        assert_eq!(report.changes, 1);
        assert_eq!(report.confirmed, Some(Fear));
        assert_eq!(
            session.state(),
            &StabilityState {
                confirmed: Some(Fear),
                pending: Some(Neutral),
                pending_count: 1,
            }
        );
        // One failed switch, one failed top-up.
        assert_eq!(session.queue().provider().calls, 2);
        assert_eq!(session.queue().sink().starts(), 0);
    }

    #[test]
    fn test_stop_handle_ends_run_early() {
        let config = SessionConfig::default();
        let controller = QueueController::new(StockProvider, MemorySink::new());
        let mut session = MoodSession::new(&config, controller);
        let stop = session.stop_handle();

        let mut frames = ScriptedFrames::new((0..100).map(|_| Ok(Some(moodq::emotion::Detection::new(Happy)))));
        let mut seen = 0;
        let mut classifier = |frame: &ScriptedFrame| {
            seen += 1;
            if seen == 10 {
                stop.stop();
            }
            ScriptedClassifier.classify(frame)
        };
        let report = session.run(&mut frames, &mut classifier);

        assert!(report.stopped);
        // Every third frame is classified; the tenth classification is frame 30.
        assert_eq!(report.frames, 30);
        assert_eq!(report.classified, 10);
    }
}

#[cfg(test)]
mod queue_tests {
    use super::*;

    #[test]
    fn test_provider_error_leaves_stability_state_alone() {
        let controller = QueueController::new(UnreachableProvider::default(), MemorySink::new());
        let mut session = MoodSession::new(&SessionConfig::default(), controller);

        let transitions = session.replay_labels([Sad, Sad, Sad]);
        assert_eq!(transitions[2], Transition::Confirmed { from: None, to: Sad });
        assert_eq!(session.state(), &StabilityState::confirmed(Sad));

        // Stable repeat: queue is empty, top-up fails at the provider.
        let transitions = session.replay_labels([Sad]);
        assert_eq!(transitions, vec![Transition::Stable(Sad)]);
        assert_eq!(session.state(), &StabilityState::confirmed(Sad));
        assert_eq!(session.queue().provider().calls, 2);
    }

    #[test]
    fn test_top_up_only_below_low_water() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = LocalCatalog::from_file(&create_test_catalog(&dir)?)?;
        let config = SessionConfig::load(Some(&create_test_config(&dir)?))?;
        let provider = PlaylistTrackProvider::from_config(catalog, &config.provider);
        let mut controller = QueueController::with_policy(provider, MemorySink::new(), QueuePolicy::default());

        let outcome = controller.try_switch(Happy)?;
        assert_eq!(outcome.started.len(), 10);
        assert_eq!(outcome.started[0], "spotify:track:h1");

        // 9 queued: nothing to do.
        assert_eq!(controller.try_top_up(Happy)?, TopUpOutcome::Sufficient { size: 9 });

        for _ in 0..6 {
            controller.sink_mut().advance();
        }
        assert_eq!(controller.try_top_up(Happy)?, TopUpOutcome::Sufficient { size: 3 });

        controller.sink_mut().advance();
        assert_eq!(
            controller.try_top_up(Happy)?,
            TopUpOutcome::Refilled {
                size: 2,
                requested: 3,
                appended: 3,
                failed: 0,
            }
        );
        assert_eq!(controller.sink().upcoming().len(), 5);
        Ok(())
    }

    #[test]
    fn test_sink_failures_are_reported_not_raised() {
        let mut controller = QueueController::new(StockProvider, RefusingSink);

        assert!(matches!(
            controller.try_switch(Angry),
            Err(QueueError::Playback(PlaybackError::Unavailable(_)))
        ));
        assert_eq!(
            controller.try_top_up(Angry),
            Ok(TopUpOutcome::Refilled {
                size: 0,
                requested: 5,
                appended: 0,
                failed: 5,
            })
        );

        // The fire-and-forget surface swallows both.
        controller.switch(Angry);
        controller.top_up(Angry);
    }

    #[test]
    fn test_empty_query_table_searches_for_music() -> Result<()> {
        let catalog: LocalCatalog = serde_json::from_value(json!({
            "playlists": [{
                "id": "pl-any",
                "name": "Music for everyone",
                "tracks": [null, {}, {"uri": "spotify:track:m1", "name": "m1"}]
            }]
        }))?;

        // The built-in surprise keywords match nothing here.
        let mut keyworded = PlaylistTrackProvider::new(catalog.clone());
        assert!(keyworded.get_tracks(Surprise, 10).is_empty());

        let mut fallback = PlaylistTrackProvider::new(catalog).with_queries(QueryTable::empty());
        let tracks = fallback.get_tracks(Surprise, 10);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].playable_uri(), Some("spotify:track:m1"));
        Ok(())
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let config = SessionConfig::load(Some(&create_test_config(&dir)?))?;

        assert_eq!(config.window_capacity, 1);
        assert_eq!(config.check_interval, 1);
        assert_eq!(config.stability_threshold, 3);
        assert_eq!(config.low_water, 3);
        assert_eq!(config.refill_target, 5);
        assert_eq!(config.switch_batch, 10);
        assert_eq!(config.provider.playlist_search_limit, 5);
        assert_eq!(config.provider.playlist_track_limit, 50);
        assert_eq!(config.provider.seed, Some(7));
        assert_eq!(config.provider.queries[&Happy], vec!["happy".to_string()]);
        Ok(())
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(SessionConfig::load(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"low_water": 8, "refill_target": 5}"#)?;
        assert!(SessionConfig::load(Some(&path)).is_err());
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn moodq() -> Command {
        Command::new(env!("CARGO_BIN_EXE_moodq"))
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = moodq().arg("--help").output().expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("moodq"));
        assert!(stdout.contains("run"));
        assert!(stdout.contains("labels"));
    }

    #[test]
    fn test_labels_command_reports_transitions() -> Result<()> {
        let dir = TempDir::new()?;
        let config = create_test_config(&dir)?;
        let catalog = create_test_catalog(&dir)?;

        let output = moodq()
            .arg("--config")
            .arg(&config)
            .args(["labels", "happy", "happy", "sad", "happy", "--catalog"])
            .arg(&catalog)
            .args(["--threshold", "2"])
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        assert!(stdout.contains("pending 1/2"));
        assert!(stdout.contains("CONFIRMED happy"));
        assert!(stdout.contains("stable"));
        assert!(stdout.contains("Now playing: spotify:track:h1"));
        Ok(())
    }

    #[test]
    fn test_dry_run_session() -> Result<()> {
        let dir = TempDir::new()?;
        let config = create_test_config(&dir)?;
        let catalog = create_test_catalog(&dir)?;
        let frames = write_frames(&dir, &[Sad, Sad, Sad].map(frame_line))?;

        let output = moodq()
            .arg("--config")
            .arg(&config)
            .arg("run")
            .arg("--frames")
            .arg(&frames)
            .arg("--catalog")
            .arg(&catalog)
            .arg("--dry-run")
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        let line = |prefix: &str| {
            stdout
                .lines()
                .find(|l| l.starts_with(prefix))
                .map(|l| l[prefix.len()..].trim().to_string())
        };
        assert_eq!(line("Emotion changes:").as_deref(), Some("1"));
        assert_eq!(line("Final emotion:").as_deref(), Some("sad"));
        Ok(())
    }

    #[test]
    fn test_config_command_applies_overrides() -> Result<()> {
        let dir = TempDir::new()?;
        let config = create_test_config(&dir)?;

        let output = moodq()
            .arg("--config")
            .arg(&config)
            .args(["config", "--threshold", "4"])
            .output()?;

        let printed: SessionConfig = serde_json::from_slice(&output.stdout)?;
        assert_eq!(printed.stability_threshold, 4);
        assert_eq!(printed.window_capacity, 1);
        Ok(())
    }

    #[test]
    fn test_invalid_override_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let config = create_test_config(&dir)?;

        let output = moodq()
            .arg("--config")
            .arg(&config)
            .args(["config", "--threshold", "0"])
            .output()?;

        assert!(!output.status.success());
        Ok(())
    }
}

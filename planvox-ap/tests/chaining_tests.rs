//! Chaining policy integration tests
//!
//! Paragraph and chapter advance on natural end, driven through the real
//! controller with a manual clock. The chain hooks spawn tasks, so each
//! step waits briefly for the next track to come up.

mod helpers;

use helpers::{test_rig, MockSummarizer, MockSynth, TestRig};
use planvox_ap::playback::{play_chapter, play_paragraph, play_summary};
use planvox_ap::state::WHOLE_CHAPTER;
use planvox_common::document::{Chapter, Document};
use planvox_common::events::PlaybackStatus;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// 1 second of audio per synthesized track
const ONE_SECOND: usize = 24_000;

fn document() -> Arc<Document> {
    Arc::new(Document {
        title: "Study plan".to_string(),
        chapters: vec![
            Chapter {
                title: "A".to_string(),
                content: "para1\n\npara2".to_string(),
                sub_chapters: Vec::new(),
            },
            Chapter {
                title: "B".to_string(),
                content: "chapter b text".to_string(),
                sub_chapters: Vec::new(),
            },
        ],
    })
}

/// Wait until the controller is playing the expected track title
async fn wait_for_track(rig: &TestRig, title: &str) {
    for _ in 0..200 {
        if rig.state.get_status().await == PlaybackStatus::Playing {
            if let Some(track) = rig.state.get_current_track().await {
                if track.title == title {
                    return;
                }
            }
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("track '{}' never started playing", title);
}

/// Let the current track run out and fire the end-of-stream detection
async fn finish_current(rig: &TestRig) {
    rig.clock.advance(2.0);
    rig.controller.poll_position().await;
}

#[tokio::test]
async fn test_paragraph_chain_advances_within_chapter() {
    let rig = test_rig(MockSynth::new(ONE_SECOND)).await;
    let doc = document();

    play_paragraph(&rig.controller, &doc, 0, 0).await.unwrap();
    wait_for_track(&rig, "A (paragraph 1)").await;

    finish_current(&rig).await;
    wait_for_track(&rig, "A (paragraph 2)").await;
    assert_eq!(rig.synth.calls(), 2);
}

#[tokio::test]
async fn test_paragraph_chain_stops_at_chapter_boundary() {
    let rig = test_rig(MockSynth::new(ONE_SECOND)).await;
    let doc = document();

    play_paragraph(&rig.controller, &doc, 0, 1).await.unwrap();
    wait_for_track(&rig, "A (paragraph 2)").await;

    finish_current(&rig).await;
    sleep(Duration::from_millis(50)).await;

    // Last paragraph of the chapter: no advance into chapter B
    assert_eq!(rig.state.get_status().await, PlaybackStatus::Idle);
    assert_eq!(
        rig.state.get_current_track().await.unwrap().title,
        "A (paragraph 2)"
    );
    assert_eq!(rig.synth.calls(), 1);
}

#[tokio::test]
async fn test_chapter_chain_advances_to_next_chapter() {
    let rig = test_rig(MockSynth::new(ONE_SECOND)).await;
    let doc = document();

    play_chapter(&rig.controller, &doc, 0).await.unwrap();
    wait_for_track(&rig, "A").await;
    assert_eq!(
        rig.state.get_current_track().await.unwrap().text,
        "para1\n\npara2"
    );

    finish_current(&rig).await;
    wait_for_track(&rig, "B").await;

    finish_current(&rig).await;
    sleep(Duration::from_millis(50)).await;

    // Last chapter: the document is done
    assert_eq!(rig.state.get_status().await, PlaybackStatus::Idle);
    assert_eq!(rig.synth.calls(), 2);
}

#[tokio::test]
async fn test_stop_breaks_the_chain() {
    let rig = test_rig(MockSynth::new(ONE_SECOND)).await;
    let doc = document();

    play_paragraph(&rig.controller, &doc, 0, 0).await.unwrap();
    wait_for_track(&rig, "A (paragraph 1)").await;

    rig.controller.stop(false).await.unwrap();
    rig.clock.advance(2.0);
    rig.controller.poll_position().await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(rig.state.get_status().await, PlaybackStatus::Idle);
    assert_eq!(rig.synth.calls(), 1);
}

#[tokio::test]
async fn test_summary_plays_standalone() {
    let rig = test_rig(MockSynth::new(ONE_SECOND)).await;
    let doc = document();
    let summarizer = MockSummarizer::new();

    play_summary(&rig.controller, &summarizer, &doc, 0)
        .await
        .unwrap();

    assert_eq!(summarizer.calls(), 1);
    assert_eq!(rig.state.get_status().await, PlaybackStatus::Playing);
    let track = rig.state.get_current_track().await.unwrap();
    assert_eq!(track.title, "A (summary)");
    assert_eq!(track.segment_index, Some(WHOLE_CHAPTER));
    assert!(track.text.starts_with("summary of A"));

    // Summaries never chain
    finish_current(&rig).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(rig.state.get_status().await, PlaybackStatus::Idle);
    assert_eq!(rig.synth.calls(), 1);
}

#[tokio::test]
async fn test_missing_paragraph_is_an_error() {
    let rig = test_rig(MockSynth::new(ONE_SECOND)).await;
    let doc = document();

    assert!(play_paragraph(&rig.controller, &doc, 0, 9).await.is_err());
    assert!(play_paragraph(&rig.controller, &doc, 7, 0).await.is_err());
    assert!(play_chapter(&rig.controller, &doc, 7).await.is_err());
}

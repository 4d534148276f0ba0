//! Playback chaining policies
//!
//! Decide what happens when a track finishes naturally: advance to the next
//! paragraph within a chapter, advance to the next chapter, or stop. Each
//! policy is an end-of-track hook that re-arms itself on the next track, so
//! a chain forms without any UI involvement. Explicit stop or pause never
//! reaches these hooks (the controller drops them).

use crate::playback::controller::{EndOfTrackHook, TransportController};
use crate::services::Summarizer;
use crate::state::{TrackRef, WHOLE_CHAPTER};
use planvox_common::document::Document;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Build the track reference for one paragraph of a chapter
fn paragraph_track(document: &Document, chapter_index: usize, paragraph_index: usize, text: &str) -> TrackRef {
    let chapter_title = document
        .chapter(chapter_index)
        .map(|c| c.title.as_str())
        .unwrap_or("Unknown chapter");

    TrackRef {
        chapter_index: Some(chapter_index),
        segment_index: Some(paragraph_index as i32),
        title: format!("{} (paragraph {})", chapter_title, paragraph_index + 1),
        text: text.to_string(),
    }
}

/// Build the track reference for a whole chapter
fn chapter_track(document: &Document, chapter_index: usize) -> Option<TrackRef> {
    let chapter = document.chapter(chapter_index)?;
    Some(TrackRef {
        chapter_index: Some(chapter_index),
        segment_index: Some(WHOLE_CHAPTER),
        title: chapter.title.clone(),
        text: chapter.content.clone(),
    })
}

/// Sequential paragraph advance policy
///
/// On natural end, plays the next paragraph of the same chapter with this
/// policy re-armed; stops at the chapter's last paragraph. Does not cross
/// chapter boundaries.
pub fn paragraph_chain(
    controller: Arc<TransportController>,
    document: Arc<Document>,
    chapter_index: usize,
    paragraph_index: usize,
) -> EndOfTrackHook {
    Box::new(move || {
        tokio::spawn(async move {
            let next_index = paragraph_index + 1;
            let text = {
                let Some(chapter) = document.chapter(chapter_index) else {
                    return;
                };
                match chapter.paragraphs().get(next_index) {
                    Some(text) => text.to_string(),
                    None => {
                        debug!(
                            "Chapter {} finished after paragraph {}",
                            chapter_index, paragraph_index
                        );
                        return;
                    }
                }
            };

            let track = paragraph_track(&document, chapter_index, next_index, &text);
            let hook = paragraph_chain(
                Arc::clone(&controller),
                Arc::clone(&document),
                chapter_index,
                next_index,
            );

            if let Err(e) = controller.load_and_play(track, Some(hook)).await {
                warn!("Paragraph chain stopped: {}", e);
            }
        });
    })
}

/// Sequential chapter advance policy
///
/// On natural end, plays the next whole chapter with this policy re-armed;
/// stops after the last chapter.
pub fn chapter_chain(
    controller: Arc<TransportController>,
    document: Arc<Document>,
    chapter_index: usize,
) -> EndOfTrackHook {
    Box::new(move || {
        tokio::spawn(async move {
            let next_index = chapter_index + 1;
            let Some(track) = chapter_track(&document, next_index) else {
                debug!("Document finished after chapter {}", chapter_index);
                return;
            };

            let hook = chapter_chain(Arc::clone(&controller), Arc::clone(&document), next_index);
            if let Err(e) = controller.load_and_play(track, Some(hook)).await {
                warn!("Chapter chain stopped: {}", e);
            }
        });
    })
}

/// Play one paragraph with the sequential paragraph advance policy armed
pub async fn play_paragraph(
    controller: &Arc<TransportController>,
    document: &Arc<Document>,
    chapter_index: usize,
    paragraph_index: usize,
) -> crate::error::Result<()> {
    let text = document
        .chapter(chapter_index)
        .and_then(|c| c.paragraphs().get(paragraph_index).map(|t| t.to_string()))
        .ok_or_else(|| {
            crate::error::Error::InvalidState(format!(
                "No paragraph {} in chapter {}",
                paragraph_index, chapter_index
            ))
        })?;

    let track = paragraph_track(document, chapter_index, paragraph_index, &text);
    let hook = paragraph_chain(
        Arc::clone(controller),
        Arc::clone(document),
        chapter_index,
        paragraph_index,
    );
    controller.load_and_play(track, Some(hook)).await
}

/// Play one whole chapter with the sequential chapter advance policy armed
pub async fn play_chapter(
    controller: &Arc<TransportController>,
    document: &Arc<Document>,
    chapter_index: usize,
) -> crate::error::Result<()> {
    let track = chapter_track(document, chapter_index).ok_or_else(|| {
        crate::error::Error::InvalidState(format!("No chapter {}", chapter_index))
    })?;

    let hook = chapter_chain(Arc::clone(controller), Arc::clone(document), chapter_index);
    controller.load_and_play(track, Some(hook)).await
}

/// Summarize one chapter and play the summary
///
/// Summaries are standalone: no advance policy is armed when one ends.
pub async fn play_summary(
    controller: &Arc<TransportController>,
    summarizer: &dyn Summarizer,
    document: &Arc<Document>,
    chapter_index: usize,
) -> crate::error::Result<()> {
    let chapter = document.chapter(chapter_index).ok_or_else(|| {
        crate::error::Error::InvalidState(format!("No chapter {}", chapter_index))
    })?;

    info!("Summarizing chapter: {}", chapter.title);
    let summary = summarizer.summarize(&chapter.title, &chapter.content).await?;

    let track = TrackRef {
        chapter_index: Some(chapter_index),
        segment_index: Some(WHOLE_CHAPTER),
        title: format!("{} (summary)", chapter.title),
        text: summary,
    };
    controller.load_and_play(track, None).await
}

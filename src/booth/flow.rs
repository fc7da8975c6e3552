use tracing::{debug, error, info, warn};

use crate::booth::error::BoothError;
use crate::booth::session::{FlowTicket, GeneratedPair, LoadingKind, Session, SessionSnapshot};
use crate::booth::traits::GeneratedImage;
use crate::llm::media::ensure_jpeg;
use crate::state::AppState;
use crate::themes::{build_fashion_prompt, Era, PromptError, WinningThemes};
use crate::utils::data_url::{parse_image_data_url, to_data_url};

const CAPTURE_MIME: &str = "image/jpeg";

/// Holds a loading ticket until the step resolves it. Dropping it unresolved
/// (client gone, request cancelled, upstream error) sends the session back
/// to its recovery stage.
struct PendingStep<'a> {
    state: &'a AppState,
    id: &'a str,
    ticket: FlowTicket,
    kind: LoadingKind,
    resolved: bool,
}

impl<'a> PendingStep<'a> {
    fn new(state: &'a AppState, id: &'a str, ticket: FlowTicket, kind: LoadingKind) -> Self {
        Self {
            state,
            id,
            ticket,
            kind,
            resolved: false,
        }
    }

    fn finish(
        mut self,
        apply: impl FnOnce(&mut Session, FlowTicket) -> Result<(), BoothError>,
    ) -> Result<SessionSnapshot, BoothError> {
        self.resolved = true;
        let ticket = self.ticket;
        self.state.with_session(self.id, |session| {
            apply(session, ticket)?;
            Ok(session.snapshot())
        })
    }
}

impl Drop for PendingStep<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let (ticket, kind) = (self.ticket, self.kind);
        let outcome = self.state.with_session(self.id, |session| match kind {
            LoadingKind::Generation => session.fail_generation(ticket),
            LoadingKind::Upload => session.fail_upload(ticket),
        });
        match outcome {
            Ok(()) => info!("Session {} recovered from unfinished {:?} step", self.id, kind),
            Err(err) => debug!("Session {} moved on before {:?} finished: {}", self.id, kind, err),
        }
    }
}

fn snapshot(state: &AppState, id: &str) -> Result<SessionSnapshot, BoothError> {
    state.with_session(id, |session| Ok(session.snapshot()))
}

fn build_prompts(
    state: &AppState,
    themes: &WinningThemes,
) -> Result<(String, String), PromptError> {
    let mut rng = rand::thread_rng();
    let mut prompt_for =
        |era: Era| build_fashion_prompt(&state.catalog, era, themes.for_era(era), &mut rng);
    Ok((prompt_for(Era::Past)?, prompt_for(Era::Future)?))
}

fn image_data_url(image: &GeneratedImage) -> String {
    to_data_url(&image.mime_type, &image.bytes)
}

/// Accepts a camera frame as a data URL and stores it as JPEG.
pub fn capture(state: &AppState, id: &str, data_url: &str) -> Result<SessionSnapshot, BoothError> {
    let image = parse_image_data_url(data_url).map_err(|err| BoothError::InvalidImage(err.to_string()))?;
    let jpeg = ensure_jpeg(&image.bytes, &image.mime_type)
        .map_err(|err| BoothError::InvalidImage(err.to_string()))?;

    state.with_session(id, |session| {
        session.capture(jpeg)?;
        Ok(session.snapshot())
    })
}

/// Restyles the captured photo into both eras concurrently.
pub async fn generate(state: &AppState, id: &str) -> Result<SessionSnapshot, BoothError> {
    let (ticket, image, themes) = state.with_session(id, |session| session.begin_generation())?;
    let step = PendingStep::new(state, id, ticket, LoadingKind::Generation);
    info!(
        "Generating looks for session {} (past={}, future={})",
        id, themes.past, themes.future
    );

    let (past_prompt, future_prompt) = build_prompts(state, &themes).map_err(|err| {
        error!("Prompt construction failed for session {}: {}", id, err);
        BoothError::from(err)
    })?;

    let (past, future) = tokio::try_join!(
        state.generator.generate(&image, CAPTURE_MIME, &past_prompt),
        state.generator.generate(&image, CAPTURE_MIME, &future_prompt),
    )
    .map_err(|err| {
        warn!("Generation failed for session {}: {}", id, err);
        BoothError::from(err)
    })?;

    let images = GeneratedPair {
        past: image_data_url(&past),
        future: image_data_url(&future),
    };
    step.finish(|session, ticket| session.complete_generation(ticket, images))
}

/// Uploads the final composite and records its download link.
pub async fn upload_composite(
    state: &AppState,
    id: &str,
    data_url: &str,
) -> Result<SessionSnapshot, BoothError> {
    parse_image_data_url(data_url).map_err(|err| BoothError::InvalidImage(err.to_string()))?;
    let ticket = state.with_session(id, |session| session.begin_upload())?;
    let step = PendingStep::new(state, id, ticket, LoadingKind::Upload);

    let download_url = state.uploader.upload(data_url).await.map_err(|err| {
        warn!("Composite upload failed for session {}: {}", id, err);
        BoothError::from(err)
    })?;

    step.finish(|session, ticket| session.complete_upload(ticket, data_url.to_string(), download_url))
}

pub fn restart(state: &AppState, id: &str) -> Result<SessionSnapshot, BoothError> {
    state.with_session(id, |session| {
        session.restart();
        Ok(session.snapshot())
    })
}

pub fn current(state: &AppState, id: &str) -> Result<SessionSnapshot, BoothError> {
    snapshot(state, id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::booth::session::{BoothStage, GENERATION_FAILED_MESSAGE, UPLOAD_FAILED_MESSAGE};
    use crate::state::test_support::{
        jpeg_data_url, state_from, state_with, FakeGenerator, FakeUploader, StalledGenerator,
        StalledUploader,
    };

    fn session_at_edit(state: &AppState) -> String {
        let id = state.create_session().id().to_string();
        state
            .with_session(&id, |session| {
                session.enter()?;
                let keywords = vec!["Bold".to_string(), "Creative".to_string(), "Dreamy".to_string()];
                session.select_keywords(&state.catalog, &keywords)?;
                Ok(())
            })
            .unwrap();
        capture(state, &id, &jpeg_data_url()).unwrap();
        id
    }

    #[test]
    fn capture_rejects_non_image_payloads() {
        let state = state_with(false, false);
        let id = state.create_session().id().to_string();

        let err = capture(&state, &id, "data:text/plain;base64,aGk=").unwrap_err();
        assert!(matches!(err, BoothError::InvalidImage(_)));
    }

    #[test]
    fn capture_rejects_truncated_jpeg() {
        let state = state_with(false, false);
        let id = state.create_session().id().to_string();
        state
            .with_session(&id, |session| {
                session.enter()?;
                let keywords = vec!["Bold".to_string(), "Calm".to_string(), "Glam".to_string()];
                session.select_keywords(&state.catalog, &keywords)?;
                Ok(())
            })
            .unwrap();

        let err = capture(&state, &id, "data:image/jpeg;base64,/9j/4A==").unwrap_err();
        assert!(matches!(err, BoothError::InvalidImage(_)));
        assert_eq!(current(&state, &id).unwrap().stage, "camera");
    }

    #[test]
    fn capture_outside_camera_stage_is_rejected() {
        let state = state_with(false, false);
        let id = state.create_session().id().to_string();

        let err = capture(&state, &id, &jpeg_data_url()).unwrap_err();
        assert!(matches!(err, BoothError::InvalidStage { stage: "landing", .. }));
    }

    #[tokio::test]
    async fn generate_produces_both_images() {
        let state = state_with(false, false);
        let id = session_at_edit(&state);

        let snapshot = generate(&state, &id).await.unwrap();
        assert_eq!(snapshot.stage, "dual_result");
        let images = snapshot.generated_images.unwrap();
        assert!(images.past.starts_with("data:image/png;base64,"));
        assert!(images.future.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn generate_builds_one_prompt_per_era() {
        let generator = Arc::new(FakeGenerator::new(false));
        let state = state_from(generator.clone(), Arc::new(FakeUploader { fail: false }));
        let id = session_at_edit(&state);

        generate(&state, &id).await.unwrap();

        let prompts = generator.prompts.lock().clone();
        assert_eq!(prompts.len(), 2);
        let past: Vec<&String> = prompts
            .iter()
            .filter(|prompt| prompt.contains("inspired by the 1970s Bohemian aesthetic"))
            .collect();
        let future: Vec<&String> = prompts
            .iter()
            .filter(|prompt| prompt.contains("inspired by the 2070s Holographic aesthetic"))
            .collect();
        assert_eq!(past.len(), 1);
        assert_eq!(future.len(), 1);
        assert!(past[0].contains("vintage film photography"));
        assert!(future[0].contains("futuristic editorial"));
    }

    #[tokio::test]
    async fn abandoned_generation_returns_to_edit() {
        let state = state_from(Arc::new(StalledGenerator), Arc::new(FakeUploader { fail: false }));
        let id = session_at_edit(&state);

        let outcome = tokio::time::timeout(Duration::from_millis(50), generate(&state, &id)).await;
        assert!(outcome.is_err());

        let snapshot = current(&state, &id).unwrap();
        assert_eq!(snapshot.stage, "edit");
        assert_eq!(snapshot.error.as_deref(), Some(GENERATION_FAILED_MESSAGE));
        assert!(snapshot.captured_image.is_some());
        assert_eq!(restart(&state, &id).unwrap().stage, "landing");
    }

    #[tokio::test]
    async fn abandoned_generation_allows_retake() {
        let state = state_from(Arc::new(StalledGenerator), Arc::new(FakeUploader { fail: false }));
        let id = session_at_edit(&state);

        let _ = tokio::time::timeout(Duration::from_millis(20), generate(&state, &id)).await;
        state.with_session(&id, |session| session.retake()).unwrap();
        assert_eq!(current(&state, &id).unwrap().stage, "camera");
    }

    #[tokio::test]
    async fn restart_during_generation_is_not_overwritten_by_drop() {
        let state = state_from(Arc::new(StalledGenerator), Arc::new(FakeUploader { fail: false }));
        let id = session_at_edit(&state);

        let mut pending = Box::pin(generate(&state, &id));
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut pending)
                .await
                .is_err()
        );
        restart(&state, &id).unwrap();
        drop(pending);

        let snapshot = current(&state, &id).unwrap();
        assert_eq!(snapshot.stage, "landing");
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn abandoned_upload_returns_to_dual_result() {
        let generator = Arc::new(FakeGenerator::new(false));
        let state = state_from(generator, Arc::new(StalledUploader));
        let id = session_at_edit(&state);
        generate(&state, &id).await.unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            upload_composite(&state, &id, &jpeg_data_url()),
        )
        .await;
        assert!(outcome.is_err());

        let snapshot = current(&state, &id).unwrap();
        assert_eq!(snapshot.stage, "dual_result");
        assert_eq!(snapshot.error.as_deref(), Some(UPLOAD_FAILED_MESSAGE));
        assert!(snapshot.generated_images.is_some());
    }

    #[tokio::test]
    async fn failed_generation_returns_to_edit() {
        let state = state_with(true, false);
        let id = session_at_edit(&state);

        let err = generate(&state, &id).await.unwrap_err();
        assert!(matches!(err, BoothError::Generation(_)));

        let snapshot = current(&state, &id).unwrap();
        assert_eq!(snapshot.stage, "edit");
        assert_eq!(snapshot.error.as_deref(), Some(GENERATION_FAILED_MESSAGE));
        assert!(snapshot.captured_image.is_some());
    }

    #[tokio::test]
    async fn upload_moves_to_result_with_download_url() {
        let state = state_with(false, false);
        let id = session_at_edit(&state);
        generate(&state, &id).await.unwrap();

        let snapshot = upload_composite(&state, &id, &jpeg_data_url()).await.unwrap();
        assert_eq!(snapshot.stage, "result");
        assert_eq!(
            snapshot.download_url.as_deref(),
            Some("https://storage.test/uploads/1-abc123.jpg?alt=media")
        );
        assert_eq!(snapshot.final_image, Some(jpeg_data_url()));
    }

    #[tokio::test]
    async fn failed_upload_returns_to_dual_result() {
        let state = state_with(false, true);
        let id = session_at_edit(&state);
        generate(&state, &id).await.unwrap();

        let err = upload_composite(&state, &id, &jpeg_data_url()).await.unwrap_err();
        assert!(matches!(err, BoothError::Upload(_)));

        let stage = state.with_session(&id, |session| Ok(session.stage())).unwrap();
        assert_eq!(stage, BoothStage::DualResult);
        assert_eq!(
            current(&state, &id).unwrap().error.as_deref(),
            Some(UPLOAD_FAILED_MESSAGE)
        );
    }

    #[tokio::test]
    async fn invalid_composite_leaves_stage_untouched() {
        let state = state_with(false, false);
        let id = session_at_edit(&state);
        generate(&state, &id).await.unwrap();

        let err = upload_composite(&state, &id, "not a data url").await.unwrap_err();
        assert!(matches!(err, BoothError::InvalidImage(_)));
        assert_eq!(current(&state, &id).unwrap().stage, "dual_result");
    }

    #[test]
    fn restart_resets_to_landing() {
        let state = state_with(false, false);
        let id = session_at_edit(&state);

        let snapshot = restart(&state, &id).unwrap();
        assert_eq!(snapshot.stage, "landing");
        assert!(snapshot.captured_image.is_none());
        assert!(snapshot.selected_keywords.is_empty());
    }
}

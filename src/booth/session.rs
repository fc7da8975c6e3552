use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::booth::error::BoothError;
use crate::themes::{ThemeCatalog, ThemeScores, WinningThemes};
use crate::utils::data_url::to_data_url;

pub const REQUIRED_KEYWORDS: usize = 3;

pub const GENERATION_FAILED_MESSAGE: &str = "Failed to create your fashion shots. Please try again.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to save your composite image. Please try again.";

const GENERATION_MESSAGES: &[&str] = &[
    "Analyzing your vibe...",
    "Warming up the AI stylist...",
    "Generating retro reality...",
    "Crafting a futuristic vision...",
    "Saving your masterpiece...",
    "Almost ready for your debut...",
];

const UPLOAD_MESSAGES: &[&str] = &[
    "Saving your final image...",
    "Uploading your masterpiece...",
    "Generating your download link...",
    "Preparing your QR code...",
    "Almost done...",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingKind {
    Generation,
    Upload,
}

impl LoadingKind {
    pub fn messages(self) -> &'static [&'static str] {
        match self {
            LoadingKind::Generation => GENERATION_MESSAGES,
            LoadingKind::Upload => UPLOAD_MESSAGES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoothStage {
    Landing,
    KeywordSelection,
    Camera,
    Edit,
    Loading(LoadingKind),
    DualResult,
    Result,
}

impl BoothStage {
    pub fn as_str(self) -> &'static str {
        match self {
            BoothStage::Landing => "landing",
            BoothStage::KeywordSelection => "keyword_selection",
            BoothStage::Camera => "camera",
            BoothStage::Edit => "edit",
            BoothStage::Loading(_) => "loading",
            BoothStage::DualResult => "dual_result",
            BoothStage::Result => "result",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPair {
    pub past: String,
    pub future: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadingView {
    pub kind: LoadingKind,
    pub messages: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub stage: &'static str,
    pub loading: Option<LoadingView>,
    pub selected_keywords: Vec<String>,
    pub themes: Option<WinningThemes>,
    pub scores: Option<ThemeScores>,
    pub captured_image: Option<String>,
    pub generated_images: Option<GeneratedPair>,
    pub final_image: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Ticket handed out when a long-running step starts; the step may only
/// complete if the session has not been reset in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTicket(u64);

/// Everything one kiosk visitor has done so far.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    stage: BoothStage,
    selected_keywords: Vec<String>,
    themes: Option<WinningThemes>,
    scores: Option<ThemeScores>,
    captured: Option<Vec<u8>>,
    generated: Option<GeneratedPair>,
    final_image: Option<String>,
    download_url: Option<String>,
    error: Option<String>,
    epoch: u64,
    updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: BoothStage::Landing,
            selected_keywords: Vec::new(),
            themes: None,
            scores: None,
            captured: None,
            generated: None,
            final_image: None,
            download_url: None,
            error: None,
            epoch: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn expect_stage(&self, action: &'static str, allowed: &[BoothStage]) -> Result<(), BoothError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(BoothError::InvalidStage {
                action,
                stage: self.stage.as_str(),
            })
        }
    }

    fn expect_ticket(&self, ticket: FlowTicket, kind: LoadingKind) -> Result<(), BoothError> {
        if ticket.0 != self.epoch || self.stage != BoothStage::Loading(kind) {
            return Err(BoothError::Superseded);
        }
        Ok(())
    }

    pub fn enter(&mut self) -> Result<(), BoothError> {
        self.expect_stage("enter the booth", &[BoothStage::Landing])?;
        self.stage = BoothStage::KeywordSelection;
        self.touch();
        Ok(())
    }

    /// Adds or removes a keyword. Returns `false` when the keyword was not
    /// selected because the selection is already full.
    pub fn toggle_keyword(&mut self, catalog: &ThemeCatalog, keyword: &str) -> Result<bool, BoothError> {
        self.expect_stage("choose keywords", &[BoothStage::KeywordSelection])?;
        let keyword = keyword.trim();
        if !catalog.contains_keyword(keyword) {
            return Err(BoothError::UnknownKeyword(keyword.to_string()));
        }

        self.touch();
        if let Some(index) = self.selected_keywords.iter().position(|k| k == keyword) {
            self.selected_keywords.remove(index);
            return Ok(true);
        }
        if self.selected_keywords.len() < REQUIRED_KEYWORDS {
            self.selected_keywords.push(keyword.to_string());
            return Ok(true);
        }
        Ok(false)
    }

    pub fn submit_keywords(&mut self, catalog: &ThemeCatalog) -> Result<&WinningThemes, BoothError> {
        self.expect_stage("submit keywords", &[BoothStage::KeywordSelection])?;
        if self.selected_keywords.len() != REQUIRED_KEYWORDS {
            return Err(BoothError::KeywordCount {
                expected: REQUIRED_KEYWORDS,
                got: self.selected_keywords.len(),
            });
        }

        let scores = catalog.score(&self.selected_keywords);
        let themes = catalog.winners(&scores);
        self.scores = Some(scores);
        self.stage = BoothStage::Camera;
        self.touch();
        Ok(&*self.themes.insert(themes))
    }

    /// Replaces the selection wholesale, then submits it.
    pub fn select_keywords(
        &mut self,
        catalog: &ThemeCatalog,
        keywords: &[String],
    ) -> Result<&WinningThemes, BoothError> {
        self.expect_stage("choose keywords", &[BoothStage::KeywordSelection])?;
        if keywords.len() != REQUIRED_KEYWORDS {
            return Err(BoothError::KeywordCount {
                expected: REQUIRED_KEYWORDS,
                got: keywords.len(),
            });
        }

        let mut selection: Vec<String> = Vec::with_capacity(REQUIRED_KEYWORDS);
        for keyword in keywords {
            let keyword = keyword.trim();
            if !catalog.contains_keyword(keyword) {
                return Err(BoothError::UnknownKeyword(keyword.to_string()));
            }
            if selection.iter().any(|k| k == keyword) {
                return Err(BoothError::DuplicateKeyword(keyword.to_string()));
            }
            selection.push(keyword.to_string());
        }

        self.selected_keywords = selection;
        self.submit_keywords(catalog)
    }

    pub fn capture(&mut self, jpeg: Vec<u8>) -> Result<(), BoothError> {
        self.expect_stage("capture a photo", &[BoothStage::Camera])?;
        self.captured = Some(jpeg);
        self.error = None;
        self.stage = BoothStage::Edit;
        self.touch();
        Ok(())
    }

    pub fn retake(&mut self) -> Result<(), BoothError> {
        self.expect_stage("retake the photo", &[BoothStage::Edit, BoothStage::DualResult])?;
        self.captured = None;
        self.generated = None;
        self.error = None;
        self.stage = BoothStage::Camera;
        self.touch();
        Ok(())
    }

    /// Moves to the generation spinner and hands back what the generation
    /// calls need.
    pub fn begin_generation(&mut self) -> Result<(FlowTicket, Vec<u8>, WinningThemes), BoothError> {
        self.expect_stage("generate images", &[BoothStage::Edit])?;
        let (Some(image), Some(themes)) = (self.captured.clone(), self.themes.clone()) else {
            return Err(BoothError::InvalidStage {
                action: "generate images",
                stage: self.stage.as_str(),
            });
        };

        self.epoch += 1;
        self.error = None;
        self.stage = BoothStage::Loading(LoadingKind::Generation);
        self.touch();
        Ok((FlowTicket(self.epoch), image, themes))
    }

    pub fn complete_generation(&mut self, ticket: FlowTicket, images: GeneratedPair) -> Result<(), BoothError> {
        self.expect_ticket(ticket, LoadingKind::Generation)?;
        self.generated = Some(images);
        self.stage = BoothStage::DualResult;
        self.touch();
        Ok(())
    }

    pub fn fail_generation(&mut self, ticket: FlowTicket) -> Result<(), BoothError> {
        self.expect_ticket(ticket, LoadingKind::Generation)?;
        self.error = Some(GENERATION_FAILED_MESSAGE.to_string());
        self.stage = BoothStage::Edit;
        self.touch();
        Ok(())
    }

    pub fn begin_upload(&mut self) -> Result<FlowTicket, BoothError> {
        self.expect_stage("save the composite", &[BoothStage::DualResult])?;
        self.epoch += 1;
        self.error = None;
        self.stage = BoothStage::Loading(LoadingKind::Upload);
        self.touch();
        Ok(FlowTicket(self.epoch))
    }

    pub fn complete_upload(
        &mut self,
        ticket: FlowTicket,
        final_image: String,
        download_url: String,
    ) -> Result<(), BoothError> {
        self.expect_ticket(ticket, LoadingKind::Upload)?;
        self.final_image = Some(final_image);
        self.download_url = Some(download_url);
        self.stage = BoothStage::Result;
        self.touch();
        Ok(())
    }

    pub fn fail_upload(&mut self, ticket: FlowTicket) -> Result<(), BoothError> {
        self.expect_ticket(ticket, LoadingKind::Upload)?;
        self.error = Some(UPLOAD_FAILED_MESSAGE.to_string());
        self.stage = BoothStage::DualResult;
        self.touch();
        Ok(())
    }

    pub fn go_back(&mut self) -> Result<(), BoothError> {
        self.expect_stage("go back", &[BoothStage::Result])?;
        self.final_image = None;
        self.download_url = None;
        self.stage = BoothStage::DualResult;
        self.touch();
        Ok(())
    }

    pub fn restart(&mut self) {
        let epoch = self.epoch + 1;
        *self = Session::new(std::mem::take(&mut self.id));
        self.epoch = epoch;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let loading = match self.stage {
            BoothStage::Loading(kind) => Some(LoadingView {
                kind,
                messages: kind.messages(),
            }),
            _ => None,
        };

        SessionSnapshot {
            id: self.id.clone(),
            stage: self.stage.as_str(),
            loading,
            selected_keywords: self.selected_keywords.clone(),
            themes: self.themes.clone(),
            scores: self.scores.clone(),
            captured_image: self
                .captured
                .as_deref()
                .map(|bytes| to_data_url("image/jpeg", bytes)),
            generated_images: self.generated.clone(),
            final_image: self.final_image.clone(),
            download_url: self.download_url.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
impl Session {
    pub fn stage(&self) -> BoothStage {
        self.stage
    }

    pub fn themes(&self) -> Option<&WinningThemes> {
        self.themes.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_keywords(&self) -> &[String] {
        &self.selected_keywords
    }
}

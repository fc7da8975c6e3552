use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Past,
    Future,
}

impl Era {
    pub fn as_str(self) -> &'static str {
        match self {
            Era::Past => "past",
            Era::Future => "future",
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme name to vote weight, for one era.
pub type EraWeights = IndexMap<String, u32>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordWeights {
    #[serde(default)]
    pub past: EraWeights,
    #[serde(default)]
    pub future: EraWeights,
}

impl KeywordWeights {
    pub fn for_era(&self, era: Era) -> &EraWeights {
        match era {
            Era::Past => &self.past,
            Era::Future => &self.future,
        }
    }
}

/// Keyword to per-era weights. Iteration follows declaration order.
pub type ThemeWeightTable = IndexMap<String, KeywordWeights>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Failed to read theme catalog '{path}': {message}")]
    Read { path: String, message: String },
    #[error("Failed to parse theme catalog: {0}")]
    Parse(String),
    #[error("Era '{label}' has no themes")]
    EmptyEra { label: String },
    #[error("Era label cannot be empty")]
    BlankEraLabel,
    #[error("Both eras use the label '{0}'")]
    DuplicateEraLabel(String),
    #[error("Era '{label}' contains a blank theme name")]
    BlankTheme { label: String },
    #[error("Theme '{theme}' is listed twice in era '{label}'")]
    DuplicateTheme { label: String, theme: String },
    #[error("Theme '{0}' belongs to both eras")]
    OverlappingTheme(String),
    #[error("Theme catalog defines no keywords")]
    NoKeywords,
    #[error("Theme catalog contains a blank keyword")]
    BlankKeyword,
    #[error("Theme '{0}' has no variants")]
    MissingVariants(String),
    #[error("Theme '{theme}' has no {field}")]
    EmptyVariantList { theme: String, field: &'static str },
}

/// Ordered, non-empty theme enumeration for one era.
///
/// Declaration order is the tie-break order for voting, and the first theme
/// is the fallback winner when no keyword contributes any evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraThemes {
    label: String,
    themes: Vec<String>,
}

impl EraThemes {
    pub fn new(label: impl Into<String>, themes: Vec<String>) -> Result<Self, CatalogError> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(CatalogError::BlankEraLabel);
        }
        if themes.is_empty() {
            return Err(CatalogError::EmptyEra { label });
        }

        let mut normalized: Vec<String> = Vec::with_capacity(themes.len());
        for theme in themes {
            let theme = theme.trim().to_string();
            if theme.is_empty() {
                return Err(CatalogError::BlankTheme { label });
            }
            if normalized.contains(&theme) {
                return Err(CatalogError::DuplicateTheme { label, theme });
            }
            normalized.push(theme);
        }

        Ok(Self {
            label,
            themes: normalized,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    pub fn contains(&self, theme: &str) -> bool {
        self.themes.iter().any(|known| known == theme)
    }

    pub fn fallback(&self) -> &str {
        // non-empty by construction
        &self.themes[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeVariants {
    #[serde(default)]
    pub backgrounds: Vec<String>,
    #[serde(default)]
    pub outfits: Vec<String>,
    #[serde(default)]
    pub accessories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningThemes {
    pub past: String,
    pub future: String,
}

impl WinningThemes {
    pub fn for_era(&self, era: Era) -> &str {
        match era {
            Era::Past => &self.past,
            Era::Future => &self.future,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeScore {
    pub theme: String,
    pub score: u64,
}

/// Accumulated votes per era, in theme declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeScores {
    pub past: Vec<ThemeScore>,
    pub future: Vec<ThemeScore>,
}

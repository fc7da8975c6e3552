use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::themes::resolver;
use crate::themes::types::{
    CatalogError, Era, EraThemes, ThemeScores, ThemeVariants, ThemeWeightTable, WinningThemes,
};

const BUILTIN_CATALOG: &str = include_str!("../../assets/theme_catalog.yaml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    past: EraFile,
    future: EraFile,
    keywords: ThemeWeightTable,
    #[serde(default)]
    variants: IndexMap<String, ThemeVariants>,
}

#[derive(Debug, Deserialize)]
struct EraFile {
    label: String,
    themes: Vec<String>,
}

/// Static booth configuration: the two theme enumerations, the keyword
/// weight table and the flavor-text variants used to build prompts.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    past: EraThemes,
    future: EraThemes,
    keywords: ThemeWeightTable,
    variants: HashMap<String, ThemeVariants>,
}

impl ThemeCatalog {
    pub fn new(
        past: EraThemes,
        future: EraThemes,
        keywords: ThemeWeightTable,
        variants: HashMap<String, ThemeVariants>,
    ) -> Result<Self, CatalogError> {
        if past.label() == future.label() {
            return Err(CatalogError::DuplicateEraLabel(past.label().to_string()));
        }
        if let Some(shared) = past.themes().iter().find(|theme| future.contains(theme)) {
            return Err(CatalogError::OverlappingTheme(shared.clone()));
        }
        if keywords.is_empty() {
            return Err(CatalogError::NoKeywords);
        }
        if keywords.keys().any(|keyword| keyword.trim().is_empty()) {
            return Err(CatalogError::BlankKeyword);
        }

        for theme in past.themes().iter().chain(future.themes()) {
            let Some(entry) = variants.get(theme) else {
                return Err(CatalogError::MissingVariants(theme.clone()));
            };
            for (field, values) in [
                ("backgrounds", &entry.backgrounds),
                ("outfits", &entry.outfits),
                ("accessories", &entry.accessories),
            ] {
                if values.iter().all(|value| value.trim().is_empty()) {
                    return Err(CatalogError::EmptyVariantList {
                        theme: theme.clone(),
                        field,
                    });
                }
            }
        }

        for (keyword, weights) in &keywords {
            for (era, themes) in [(Era::Past, &past), (Era::Future, &future)] {
                for (theme, weight) in weights.for_era(era) {
                    if !themes.contains(theme) {
                        warn!(
                            "Keyword '{}' weights unknown {} theme '{}'; it will be ignored",
                            keyword, era, theme
                        );
                    } else if *weight == 0 {
                        warn!(
                            "Keyword '{}' gives {} theme '{}' a zero weight",
                            keyword, era, theme
                        );
                    }
                }
            }
        }

        Ok(Self {
            past,
            future,
            keywords,
            variants,
        })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_yaml::from_str(raw).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::from_file(file)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(raw).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::from_file(file)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|err| CatalogError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let catalog = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_yaml_str(&raw)?
        };

        info!(
            "Loaded theme catalog from {} ({} keyword(s))",
            path.display(),
            catalog.keywords.len()
        );
        Ok(catalog)
    }

    /// Catalog from `path` when given, otherwise the embedded default.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        let past = EraThemes::new(file.past.label, file.past.themes)?;
        let future = EraThemes::new(file.future.label, file.future.themes)?;
        let keywords = file
            .keywords
            .into_iter()
            .map(|(keyword, weights)| (keyword.trim().to_string(), weights))
            .collect();
        let variants = file
            .variants
            .into_iter()
            .map(|(theme, variants)| (theme.trim().to_string(), variants))
            .collect();
        Self::new(past, future, keywords, variants)
    }

    pub fn past(&self) -> &EraThemes {
        &self.past
    }

    pub fn future(&self) -> &EraThemes {
        &self.future
    }

    pub fn themes(&self, era: Era) -> &EraThemes {
        match era {
            Era::Past => &self.past,
            Era::Future => &self.future,
        }
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.keys().map(String::as_str)
    }

    pub fn contains_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains_key(keyword)
    }

    pub fn era_of(&self, theme: &str) -> Option<Era> {
        if self.past.contains(theme) {
            Some(Era::Past)
        } else if self.future.contains(theme) {
            Some(Era::Future)
        } else {
            None
        }
    }

    pub fn variants(&self, theme: &str) -> Option<&ThemeVariants> {
        self.variants.get(theme)
    }

    pub fn score<S: AsRef<str>>(&self, selection: &[S]) -> ThemeScores {
        resolver::score(selection, &self.keywords, &self.past, &self.future)
    }

    pub fn resolve<S: AsRef<str>>(&self, selection: &[S]) -> WinningThemes {
        resolver::resolve(selection, &self.keywords, &self.past, &self.future)
    }

    pub fn winners(&self, scores: &ThemeScores) -> WinningThemes {
        resolver::winners(scores, &self.past, &self.future)
    }
}

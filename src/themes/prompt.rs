use rand::seq::SliceRandom;
use rand::Rng;

use crate::themes::catalog::ThemeCatalog;
use crate::themes::types::Era;

pub const BASE_PROMPT_PREAMBLE: &str = "Generate a new image in a vertical, portrait aspect ratio (9:16). The main subject's face must be centrally composed and fully visible within the frame, ensuring it is not cut off at the edges. Analyze the person or people in this photo. It is absolutely crucial that the final image contains the exact same number of people as the original photo; do not add or remove anyone. You must retain ALL of each person's original features, including their face, skin tone, and gender presentation. Pay special attention to the hair; the hairstyle and hair color for every person must be preserved *exactly* as they appear in the original photo. Do NOT alter their facial features or makeup. The only changes should be to their clothing and the background scene. The final image must not contain any text, logos, or words.";

const PAST_FINISH: &str = "The lighting should be soft and warm, reminiscent of vintage film photography. The final image should have the distinct look of an aged photograph with subtle film grain, capturing a nostalgic vibe.";

const FUTURE_FINISH: &str = "The lighting should be clean and sharp, highlighting the details of the fashion and technology. The final image should look like a professional, polished fashion photo from a futuristic editorial.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Variants for theme \"{era_label} {theme}\" not found.")]
    UnknownTheme { era_label: String, theme: String },
}

/// One randomly drawn look for a theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeLook<'a> {
    pub background: &'a str,
    pub outfit: &'a str,
    pub accessory: &'a str,
}

pub fn pick_look<'a, R: Rng + ?Sized>(
    catalog: &'a ThemeCatalog,
    era: Era,
    theme: &str,
    rng: &mut R,
) -> Result<ThemeLook<'a>, PromptError> {
    let unknown = || PromptError::UnknownTheme {
        era_label: catalog.themes(era).label().to_string(),
        theme: theme.to_string(),
    };
    if !catalog.themes(era).contains(theme) {
        return Err(unknown());
    }
    let variants = catalog.variants(theme).ok_or_else(unknown)?;

    let background = variants.backgrounds.choose(rng).ok_or_else(unknown)?;
    let outfit = variants.outfits.choose(rng).ok_or_else(unknown)?;
    let accessory = variants.accessories.choose(rng).ok_or_else(unknown)?;

    Ok(ThemeLook {
        background,
        outfit,
        accessory,
    })
}

pub fn format_fashion_prompt(era: Era, era_label: &str, theme: &str, look: &ThemeLook<'_>) -> String {
    let mut prompt = format!(
        "{BASE_PROMPT_PREAMBLE} Your task is to place them into a high-fashion photoshoot inspired by the {era_label} {theme} aesthetic. "
    );
    prompt.push_str(&format!(
        "Dress them in cohesive, stylish, gender-neutral high-fashion attire, specifically a {} accessorized with a {}. ",
        look.outfit, look.accessory
    ));
    prompt.push_str(&format!("The setting is a {}. ", look.background));
    prompt.push_str(match era {
        Era::Past => PAST_FINISH,
        Era::Future => FUTURE_FINISH,
    });
    prompt
}

/// Builds the restyling instruction sent alongside the captured photo.
pub fn build_fashion_prompt<R: Rng + ?Sized>(
    catalog: &ThemeCatalog,
    era: Era,
    theme: &str,
    rng: &mut R,
) -> Result<String, PromptError> {
    let look = pick_look(catalog, era, theme, rng)?;
    Ok(format_fashion_prompt(
        era,
        catalog.themes(era).label(),
        theme,
        &look,
    ))
}

use tracing::debug;

use crate::themes::types::{EraThemes, EraWeights, ThemeScore, ThemeScores, ThemeWeightTable, WinningThemes};

fn seed_scores(themes: &EraThemes) -> Vec<ThemeScore> {
    themes
        .themes()
        .iter()
        .map(|theme| ThemeScore {
            theme: theme.clone(),
            score: 0,
        })
        .collect()
}

fn accumulate(scores: &mut [ThemeScore], weights: &EraWeights) {
    for (theme, weight) in weights {
        // Entries for themes outside the era are dropped.
        if let Some(entry) = scores.iter_mut().find(|entry| entry.theme == *theme) {
            entry.score = entry.score.saturating_add(u64::from(*weight));
        }
    }
}

/// First strictly greater score wins, so ties keep declaration order.
/// Without any positive evidence the era falls back to its first theme.
fn pick_winner<'a>(scores: &'a [ThemeScore], themes: &'a EraThemes) -> &'a str {
    let mut top: Option<&ThemeScore> = None;
    for entry in scores {
        if top.map_or(true, |best| entry.score > best.score) {
            top = Some(entry);
        }
    }

    match top {
        Some(best) if best.score > 0 => &best.theme,
        _ => themes.fallback(),
    }
}

/// Weighted vote of every selected keyword over both eras.
///
/// Keywords missing from `table` contribute nothing; duplicates vote again.
pub fn score<S: AsRef<str>>(
    selection: &[S],
    table: &ThemeWeightTable,
    past_themes: &EraThemes,
    future_themes: &EraThemes,
) -> ThemeScores {
    let mut past = seed_scores(past_themes);
    let mut future = seed_scores(future_themes);

    for keyword in selection {
        let keyword = keyword.as_ref();
        let Some(weights) = table.get(keyword) else {
            debug!("Skipping unknown keyword '{}'", keyword);
            continue;
        };
        accumulate(&mut past, &weights.past);
        accumulate(&mut future, &weights.future);
    }

    ThemeScores { past, future }
}

pub fn winners(scores: &ThemeScores, past_themes: &EraThemes, future_themes: &EraThemes) -> WinningThemes {
    WinningThemes {
        past: pick_winner(&scores.past, past_themes).to_string(),
        future: pick_winner(&scores.future, future_themes).to_string(),
    }
}

/// Reduces a keyword selection to one past and one future theme.
///
/// Total over every input: empty selections, unknown keywords and
/// zero-evidence eras all resolve to the era's first declared theme.
pub fn resolve<S: AsRef<str>>(
    selection: &[S],
    table: &ThemeWeightTable,
    past_themes: &EraThemes,
    future_themes: &EraThemes,
) -> WinningThemes {
    let scores = score(selection, table, past_themes, future_themes);
    winners(&scores, past_themes, future_themes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::themes::catalog::ThemeCatalog;
    use crate::themes::types::KeywordWeights;

    fn era(label: &str, themes: &[&str]) -> EraThemes {
        EraThemes::new(label, themes.iter().map(|theme| theme.to_string()).collect()).unwrap()
    }

    fn weights(entries: &[(&str, u32)]) -> EraWeights {
        entries
            .iter()
            .map(|(theme, weight)| (theme.to_string(), *weight))
            .collect()
    }

    fn table(entries: &[(&str, &[(&str, u32)], &[(&str, u32)])]) -> ThemeWeightTable {
        entries
            .iter()
            .map(|(keyword, past, future)| {
                (
                    keyword.to_string(),
                    KeywordWeights {
                        past: weights(past),
                        future: weights(future),
                    },
                )
            })
            .collect()
    }

    fn fixture() -> (EraThemes, EraThemes) {
        (
            era("1970s", &["Hippy", "Bohemian", "Funk", "Disco"]),
            era("2070s", &["Y3K", "Cyberpunk", "Holographic", "Cyborg"]),
        )
    }

    #[test]
    fn empty_selection_falls_back_to_first_themes() {
        let (past, future) = fixture();
        let table = table(&[("Bold", &[("Funk", 3)], &[("Cyberpunk", 2)])]);
        let empty: [&str; 0] = [];

        let result = resolve(&empty, &table, &past, &future);
        assert_eq!(result.past, "Hippy");
        assert_eq!(result.future, "Y3K");
    }

    #[test]
    fn unknown_keyword_matches_empty_selection() {
        let (past, future) = fixture();
        let table = table(&[("Bold", &[("Funk", 3)], &[("Cyberpunk", 2)])]);
        let empty: [&str; 0] = [];

        assert_eq!(
            resolve(&["NotAKeyword"], &table, &past, &future),
            resolve(&empty, &table, &past, &future)
        );
    }

    #[test]
    fn single_keyword_picks_strict_winner() {
        let (past, future) = fixture();
        let table = table(&[("A", &[("Funk", 3)], &[])]);

        let result = resolve(&["A"], &table, &past, &future);
        assert_eq!(result.past, "Funk");
        assert_eq!(result.future, "Y3K");
    }

    #[test]
    fn ties_keep_declaration_order_regardless_of_selection_order() {
        let (past, future) = fixture();
        let table = table(&[
            ("A", &[("Funk", 2)], &[]),
            ("B", &[("Bohemian", 2)], &[]),
        ]);

        for _ in 0..10 {
            assert_eq!(resolve(&["A", "B"], &table, &past, &future).past, "Bohemian");
            assert_eq!(resolve(&["B", "A"], &table, &past, &future).past, "Bohemian");
        }
    }

    #[test]
    fn scores_accumulate_across_keywords() {
        let (past, future) = fixture();
        let table = table(&[
            ("A", &[("Disco", 2)], &[]),
            ("B", &[("Disco", 2)], &[]),
            ("C", &[("Hippy", 3)], &[]),
        ]);

        let scores = score(&["A", "B", "C"], &table, &past, &future);
        let disco = scores.past.iter().find(|entry| entry.theme == "Disco").unwrap();
        assert_eq!(disco.score, 4);
        assert_eq!(resolve(&["A", "B", "C"], &table, &past, &future).past, "Disco");
    }

    #[test]
    fn duplicate_keywords_vote_twice() {
        let (past, future) = fixture();
        let table = table(&[
            ("A", &[("Disco", 2)], &[]),
            ("C", &[("Hippy", 3)], &[]),
        ]);

        assert_eq!(resolve(&["A", "A", "C"], &table, &past, &future).past, "Disco");
    }

    #[test]
    fn future_weights_never_change_past_winner() {
        let (past, future) = fixture();
        let original = table(&[
            ("A", &[("Funk", 3)], &[("Cyborg", 1)]),
            ("B", &[("Disco", 1)], &[("Y3K", 5)]),
        ]);
        let rewired = table(&[
            ("A", &[("Funk", 3)], &[("Holographic", 9), ("Y3K", 4)]),
            ("B", &[("Disco", 1)], &[]),
        ]);

        let before = resolve(&["A", "B"], &original, &past, &future);
        let after = resolve(&["A", "B"], &rewired, &past, &future);
        assert_eq!(before.past, after.past);
        assert_ne!(before.future, after.future);
    }

    #[test]
    fn ignores_weights_for_themes_outside_the_era() {
        let (past, future) = fixture();
        let table = table(&[("A", &[("Cyberpunk", 7), ("Polka", 4)], &[("Disco", 5)])]);

        let scores = score(&["A"], &table, &past, &future);
        assert!(scores.past.iter().all(|entry| entry.score == 0));
        assert!(scores.future.iter().all(|entry| entry.score == 0));
        assert_eq!(
            resolve(&["A"], &table, &past, &future),
            WinningThemes {
                past: "Hippy".to_string(),
                future: "Y3K".to_string()
            }
        );
    }

    #[test]
    fn zero_weights_still_use_fallback() {
        let (past, future) = fixture();
        let table = table(&[("A", &[("Disco", 0)], &[("Cyborg", 0)])]);

        let result = resolve(&["A"], &table, &past, &future);
        assert_eq!(result.past, "Hippy");
        assert_eq!(result.future, "Y3K");
    }

    #[test]
    fn resolves_any_selection_size_within_known_themes() {
        let catalog = ThemeCatalog::builtin().unwrap();
        let vocabulary: Vec<&str> = catalog.keywords().collect();
        let selections: Vec<Vec<&str>> = vec![
            vec![],
            vec!["Glam"],
            vec!["Bold", "Calm", "Techy"],
            vec!["Techy", "Techy", "Nope", "Soulful"],
            vocabulary.iter().copied().take(10).collect(),
        ];

        for selection in selections {
            let result = catalog.resolve(&selection);
            assert!(catalog.past().contains(&result.past));
            assert!(catalog.future().contains(&result.future));
        }
    }

    #[test]
    fn builtin_catalog_resolves_documented_example() {
        let catalog = ThemeCatalog::builtin().unwrap();

        let scores = catalog.score(&["Bold", "Creative", "Dreamy"]);
        let past: Vec<(&str, u64)> = scores
            .past
            .iter()
            .map(|entry| (entry.theme.as_str(), entry.score))
            .collect();
        assert_eq!(
            past,
            vec![("Hippy", 3), ("Bohemian", 4), ("Funk", 3), ("Disco", 1)]
        );

        let result = catalog.resolve(&["Bold", "Creative", "Dreamy"]);
        assert_eq!(result.past, "Bohemian");
        assert_eq!(result.future, "Holographic");
    }

    #[test]
    fn analytical_only_selection_falls_back_for_past_era() {
        let catalog = ThemeCatalog::builtin().unwrap();

        let result = catalog.resolve(&["Analytical"]);
        assert_eq!(result.past, "Hippy");
        assert_eq!(result.future, "Cyborg");
    }
}

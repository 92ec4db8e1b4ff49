//! Normalizace jmen týmů napříč providery.
//!
//! "SE Palmeiras" / "Palmeiras", "Atl. Mineiro" / "Atlético Mineiro",
//! "1. FC Köln" / "Köln" — každý provider to píše jinak.

use strsim::normalized_levenshtein;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Club-type tokens that carry no identity.
pub const GENERIC_CLUB_TOKENS: &[&str] = &[
    "fc", "cf", "sc", "ec", "se", "ac", "afc", "cd", "ca", "cr", "ud", "sd", "sv", "fk", "bk",
    "club", "clube", "de", "do", "da", "del", "futebol", "futbol", "football", "calcio", "the",
];

/// Tunable matching policy. The threshold is compared with `>`.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    pub similarity_threshold: f64,
    pub min_substring_len: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            min_substring_len: 3,
        }
    }
}

/// lowercase, bez diakritiky, ne-alfanumerické znaky → mezera, bez generických tokenů
pub fn name_tokens(name: &str) -> Vec<String> {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let all: Vec<String> = folded.split_whitespace().map(str::to_string).collect();
    let meaningful: Vec<String> = all
        .iter()
        .filter(|t| !GENERIC_CLUB_TOKENS.contains(&t.as_str()))
        .cloned()
        .collect();

    // "FC Porto" → "porto", ale čistě generický název ("Club de Futebol") necháme celý
    if meaningful.is_empty() { all } else { meaningful }
}

pub fn normalize_team_name(name: &str) -> String {
    name_tokens(name).concat()
}

/// Replace abbreviated tokens ("atl") with the counterpart token they prefix ("atletico").
fn expand_abbreviations(tokens: &[String], other: &[String]) -> String {
    tokens
        .iter()
        .map(|t| {
            if t.chars().count() < 3 {
                return t.as_str();
            }
            other
                .iter()
                .find(|o| o.len() > t.len() && o.starts_with(t.as_str()))
                .map(String::as_str)
                .unwrap_or(t.as_str())
        })
        .collect()
}

/// 1 − Levenshtein / max length, over normalized names with abbreviations expanded.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ta = name_tokens(a);
    let tb = name_tokens(b);
    let ea = expand_abbreviations(&ta, &tb);
    let eb = expand_abbreviations(&tb, &ta);
    if ea.is_empty() || eb.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&ea, &eb)
}

impl MatchPolicy {
    pub fn same_team(&self, a: &str, b: &str) -> bool {
        let na = normalize_team_name(a);
        let nb = normalize_team_name(b);
        if na.is_empty() || nb.is_empty() {
            return false;
        }
        if na == nb {
            return true;
        }

        let shorter = na.chars().count().min(nb.chars().count());
        if shorter >= self.min_substring_len && (na.contains(&nb) || nb.contains(&na)) {
            return true;
        }

        similarity(a, b) > self.similarity_threshold
    }

    /// Both sides must match, orientation preserved.
    pub fn same_fixture(&self, home_a: &str, away_a: &str, home_b: &str, away_b: &str) -> bool {
        self.same_team(home_a, home_b) && self.same_team(away_a, away_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_tokens_and_diacritics_are_stripped() {
        assert_eq!(normalize_team_name("SE Palmeiras"), normalize_team_name("Palmeiras"));
        assert_eq!(normalize_team_name("Atlético-MG"), "atleticomg");
        assert_eq!(normalize_team_name("1. FC Köln"), "1koln");
        assert_eq!(normalize_team_name("Grêmio FBPA"), "gremiofbpa");
    }

    #[test]
    fn all_generic_name_is_kept() {
        assert_eq!(normalize_team_name("Club de Futebol"), "clubdefutebol");
        assert_eq!(normalize_team_name("FC"), "fc");
    }

    #[test]
    fn abbreviation_exceeds_threshold() {
        assert!(similarity("Atletico Mineiro", "Atl. Mineiro") > 0.8);
        assert!(MatchPolicy::default().same_team("Atletico Mineiro", "Atl. Mineiro"));
    }

    #[test]
    fn different_clubs_do_not_match() {
        assert!(similarity("Flamengo", "Fluminense") < 0.8);
        assert!(!MatchPolicy::default().same_team("Flamengo", "Fluminense"));
        assert!(!MatchPolicy::default().same_team("Arsenal", "Chelsea"));
    }

    #[test]
    fn substring_and_typo_match() {
        let p = MatchPolicy::default();
        assert!(p.same_team("Palmeiras", "SE Palmeiras"));
        assert!(p.same_team("Wolverhampton Wanderers", "Wolverhampton"));
        assert!(p.same_team("Borussia Monchengladbach", "Borussia Mönchengladbach"));
        assert!(p.same_team("Internazionale", "Internazionalle"));
    }

    #[test]
    fn empty_names_never_match() {
        assert!(!MatchPolicy::default().same_team("", "Palmeiras"));
        assert!(!MatchPolicy::default().same_team("---", "---"));
    }

    #[test]
    fn fixture_needs_both_sides_in_order() {
        let p = MatchPolicy::default();
        assert!(p.same_fixture("SE Palmeiras", "Flamengo", "Palmeiras", "CR Flamengo"));
        assert!(!p.same_fixture("Palmeiras", "Flamengo", "Palmeiras", "Fluminense"));
        assert!(!p.same_fixture("Palmeiras", "Flamengo", "Flamengo", "Palmeiras"));
    }

    #[test]
    fn threshold_is_configurable() {
        let strict = MatchPolicy { similarity_threshold: 0.99, min_substring_len: 3 };
        assert!(!strict.same_team("Internazionale", "Internazionalle"));
    }
}

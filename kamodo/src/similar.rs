//! "Did you mean" suggestions for unknown names

/// Candidates resembling `query`, best first
pub fn find_similar<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut matches: Vec<(&str, usize)> = candidates
        .into_iter()
        .filter(|c| *c != query)
        .map(|c| (c, similarity_score(&query_lower, &c.to_lowercase())))
        .filter(|(_, score)| *score >= 6)
        .collect();

    matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    matches.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// Suggestion text for the first few matches
pub fn suggestion(query: &str, similar: &[String]) -> Option<String> {
    match similar {
        [] => None,
        [one] => Some(format!("Did you mean '{}'?", one)),
        many => Some(format!(
            "'{}' is not registered. Similar: {}",
            query,
            many.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
        )),
    }
}

fn similarity_score(query: &str, candidate: &str) -> usize {
    let mut score = 0;

    if candidate.starts_with(query) {
        score += 100;
    } else if candidate.contains(query) {
        score += 50;
    } else if query.contains(candidate) {
        score += 30;
    }

    let query_chars: std::collections::HashSet<char> = query.chars().collect();
    let candidate_chars: std::collections::HashSet<char> = candidate.chars().collect();
    score += query_chars.intersection(&candidate_chars).count() * 2;

    let len_diff = query.len().abs_diff(candidate.len());
    if len_diff < 5 && score > 0 {
        score += 5 - len_diff;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_ranks_first() {
        let similar = find_similar("rh", ["mass", "rho", "vol"]);
        assert_eq!(similar.first().map(String::as_str), Some("rho"));
    }

    #[test]
    fn test_unrelated_names_dropped() {
        assert!(find_similar("q", ["mass", "vol"]).is_empty());
    }

    #[test]
    fn test_suggestion_text() {
        assert_eq!(suggestion("rh", &["rho".to_string()]).unwrap(), "Did you mean 'rho'?");
        assert!(suggestion("rh", &[]).is_none());
    }
}

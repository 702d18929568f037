// Fuzzy matching for operator and key suggestions

/// Calculate Levenshtein distance between two strings
/// Returns the minimum number of single-character edits (insertions, deletions, substitutions)
/// needed to transform one string into another
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    // Single rolling row of the edit matrix
    let mut previous: Vec<usize> = (0..=s2_chars.len()).collect();
    for (i, c1) in s1_chars.iter().enumerate() {
        let mut current = vec![i + 1; s2_chars.len() + 1];
        for (j, c2) in s2_chars.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)      // deletion
                .min(current[j] + 1)                    // insertion
                .min(previous[j] + cost);               // substitution
        }
        previous = current;
    }

    previous[s2_chars.len()]
}

/// Closest candidate within `max_distance` edits (case-insensitive)
pub fn suggest<'a>(name: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let name = name.to_lowercase();
    candidates
        .iter()
        .map(|c| (*c, levenshtein_distance(&name, &c.to_lowercase())))
        .filter(|(_, d)| *d <= max_distance)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(c, _)| c)
}

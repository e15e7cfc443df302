use super::normalizer::{normalize_clinic_name, normalize_name};

/// Minimum per-token similarity for a token pairing to count towards a name match.
pub const TOKEN_ACCEPTANCE_THRESHOLD: u8 = 60;

/// Levenshtein distance counted in characters, so Cyrillic input is not penalised
/// for its multi-byte encoding.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Edit-distance similarity on a 0..=100 scale. Two empty strings carry no signal and
/// score 0.
pub fn char_similarity(a: &str, b: &str) -> u8 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0;
    }

    let distance = levenshtein_distance(a, b);
    let ratio = 1.0 - distance as f64 / longest as f64;
    (ratio * 100.0).round() as u8
}

/// Person-name similarity tolerant to token order and to extra tokens (patronymics).
pub fn name_similarity(name1: &str, name2: &str) -> u8 {
    name_similarity_with_threshold(name1, name2, TOKEN_ACCEPTANCE_THRESHOLD)
}

/// Greedy best pairing of tokens: every token of `name1` takes the unused token of `name2`
/// it is most similar to, and the pairing counts only at `min_token_score` or above. The
/// average of accepted pairings is weighted by how much of the longer name was covered.
pub fn name_similarity_with_threshold(name1: &str, name2: &str, min_token_score: u8) -> u8 {
    let left = normalize_name(name1);
    let right = normalize_name(name2);

    if !left.is_empty() && left == right {
        return 100;
    }

    let left_tokens: Vec<&str> = left.split_whitespace().collect();
    let right_tokens: Vec<&str> = right.split_whitespace().collect();
    let longest = left_tokens.len().max(right_tokens.len());
    if longest == 0 {
        return 0;
    }

    let mut used = vec![false; right_tokens.len()];
    let mut accepted: Vec<u8> = Vec::new();

    for token in &left_tokens {
        let best = right_tokens
            .iter()
            .enumerate()
            .filter(|(index, _)| !used[*index])
            .map(|(index, candidate)| (index, char_similarity(token, candidate)))
            .fold(None::<(usize, u8)>, |best, current| match best {
                Some((_, score)) if score >= current.1 => best,
                _ => Some(current),
            });

        if let Some((index, score)) = best {
            if score >= min_token_score {
                used[index] = true;
                accepted.push(score);
            }
        }
    }

    if accepted.is_empty() {
        return 0;
    }

    let average = accepted.iter().map(|score| f64::from(*score)).sum::<f64>() / accepted.len() as f64;
    let coverage = accepted.len() as f64 / longest as f64;
    (average * coverage).round() as u8
}

/// Clinic-name similarity. Legal-form words and quotes are ignored; an exact match scores
/// 100, containment in either direction 90, anything else falls back to whole-string
/// edit similarity.
pub fn clinic_similarity(name1: &str, name2: &str) -> u8 {
    let left = normalize_clinic_name(name1);
    let right = normalize_clinic_name(name2);

    if left.is_empty() || right.is_empty() {
        return 0;
    }
    if left == right {
        return 100;
    }
    if left.contains(&right) || right.contains(&left) {
        return 90;
    }

    char_similarity(&left, &right)
}

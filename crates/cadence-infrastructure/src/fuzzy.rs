// SPDX-License-Identifier: GPL-3.0-or-later

//! Text similarity used to score catalog names against a search string.

/// Two tokens closer than this count as the same word.
const TOKEN_MATCH_THRESHOLD: f32 = 0.8;

/// Similarity of `candidate` to `query`, in `[0, 1]`.
///
/// The score is the better of a whole-string edit-distance ratio and a token
/// coverage measure. The coverage term lets "daft punk one more time" match
/// both "Daft Punk" and "One More Time".
pub fn similarity(query: &str, candidate: &str) -> f32 {
    let query = normalize_for_match(query);
    let candidate = normalize_for_match(candidate);
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return 1.0;
    }

    let whole = edit_similarity(&query, &candidate);
    let coverage = token_coverage(&query, &candidate);
    whole.max(coverage).clamp(0.0, 1.0)
}

fn edit_similarity(left: &str, right: &str) -> f32 {
    if left == right {
        return 1.0;
    }
    let distance = levenshtein_distance(left, right) as f32;
    let max_len = left.chars().count().max(right.chars().count()) as f32;
    if max_len == 0.0 {
        return 0.0;
    }
    (1.0 - (distance / max_len)).clamp(0.0, 1.0)
}

fn token_coverage(query: &str, candidate: &str) -> f32 {
    let query_tokens: Vec<&str> = query.split(' ').collect();
    let candidate_tokens: Vec<&str> = candidate.split(' ').collect();

    let matches = |token: &str, others: &[&str]| {
        others
            .iter()
            .any(|other| edit_similarity(token, other) >= TOKEN_MATCH_THRESHOLD)
    };

    let candidate_hits = candidate_tokens
        .iter()
        .filter(|token| matches(token, &query_tokens))
        .count();
    if candidate_hits == 0 {
        return 0.0;
    }
    let query_hits = query_tokens
        .iter()
        .filter(|token| matches(token, &candidate_tokens))
        .count();

    let candidate_ratio = candidate_hits as f32 / candidate_tokens.len() as f32;
    let query_ratio = query_hits as f32 / query_tokens.len() as f32;
    (candidate_ratio + query_ratio) / 2.0
}

fn normalize_for_match(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn levenshtein_distance(left: &str, right: &str) -> usize {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();

    if left_chars.is_empty() {
        return right_chars.len();
    }
    if right_chars.is_empty() {
        return left_chars.len();
    }

    let mut previous_row: Vec<usize> = (0..=right_chars.len()).collect();
    let mut current_row: Vec<usize> = vec![0; right_chars.len() + 1];

    for (left_index, left_char) in left_chars.iter().enumerate() {
        current_row[0] = left_index + 1;
        for (right_index, right_char) in right_chars.iter().enumerate() {
            let insert_cost = current_row[right_index] + 1;
            let delete_cost = previous_row[right_index + 1] + 1;
            let replace_cost = previous_row[right_index] + usize::from(left_char != right_char);
            current_row[right_index + 1] = insert_cost.min(delete_cost).min(replace_cost);
        }
        std::mem::swap(&mut previous_row, &mut current_row);
    }

    previous_row[right_chars.len()]
}

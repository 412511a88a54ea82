//! Closest-name suggestions for unresolved function names.

/// Levenshtein distance between two strings, counted in chars.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single rolling row instead of the full matrix
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, &ac) in a_chars.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, &bc) in b_chars.iter().enumerate() {
            let cost = usize::from(ac != bc);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diag + cost);
            diag = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b_chars.len()]
}

/// Local part of a prefixed name (`local:count` -> `count`).
fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Find the candidate closest to `target`, if any is close enough.
///
/// Names are compared case-insensitively on their local part, so a typo in
/// the prefix or in the case of a letter is still matched. Ties resolve to
/// the alphabetically first candidate, keeping diagnostics reproducible.
pub fn closest_name<'a, I>(target: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let target_lower = local_part(target).to_lowercase();
    let target_len = target_lower.chars().count();
    let max_distance = if target_len <= 3 {
        1
    } else if target_len <= 6 {
        2
    } else {
        3.max(target_len / 3)
    };

    let mut best: Option<(usize, &str)> = None;
    for candidate in candidates {
        if candidate == target {
            continue;
        }
        let distance = levenshtein_distance(&target_lower, &local_part(candidate).to_lowercase());
        if distance > max_distance {
            continue;
        }
        let better = match best {
            None => true,
            Some((d, name)) => distance < d || (distance == d && candidate < name),
        };
        if better {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, name)| name.to_string())
}

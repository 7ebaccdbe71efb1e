use std::collections::HashSet;

/// Collapse repeated countries in one row, keeping first appearances at the
/// front and padding with absent markers to exactly `width` cells.
///
/// Values are compared on their trimmed form; empty strings count as absent.
pub fn dedup_row(cells: &[Option<String>], width: usize) -> Vec<Option<String>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut deduped: Vec<Option<String>> = cells
        .iter()
        .flatten()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty() && seen.insert(*value))
        .map(|value| Some(value.to_string()))
        .collect();

    deduped.truncate(width);
    deduped.resize(width, None);
    deduped
}

/// Number of later duplicates `dedup_row` would drop from `cells`.
pub fn duplicate_count(cells: &[Option<String>]) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();
    cells
        .iter()
        .flatten()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .filter(|value| !seen.insert(*value))
        .count()
}

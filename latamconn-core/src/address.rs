//! Country token extraction from free-text affiliation addresses.
//!
//! An address field holds one or more affiliations separated by `;`. The
//! country is taken to be whatever follows the last `,` of each affiliation,
//! so tokens can be arbitrary text (cities, abbreviations) until validated.

/// Extract one trailing token per non-empty `;`-separated segment.
///
/// A missing field yields no tokens. A segment without a comma yields the
/// whole trimmed segment.
pub fn extract_countries(address: Option<&str>) -> Vec<String> {
    let Some(address) = address else {
        return Vec::new();
    };

    address
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.rsplit(',').next())
        .map(|token| token.trim().to_string())
        .collect()
}

// Tests for the country registry and token validation

use latamconn_core::registry::{CountryAuthority, CountryRecord, CountryRegistry, Iso3166};

struct FixedAuthority;

impl CountryAuthority for FixedAuthority {
    fn countries(&self) -> Vec<CountryRecord> {
        vec![
            CountryRecord {
                alpha_2: Some("BR".to_string()),
                name: "Brazil".to_string(),
                official_name: Some("Federative Republic of Brazil".to_string()),
            },
            CountryRecord {
                alpha_2: Some("CA".to_string()),
                name: "Canada".to_string(),
                official_name: None,
            },
            CountryRecord {
                alpha_2: Some("HU".to_string()),
                name: "Hungary".to_string(),
                official_name: Some("Hungary".to_string()),
            },
        ]
    }
}

// ============================================================================
// Registry Construction Tests
// ============================================================================

#[test]
fn test_registry_includes_common_and_official_names() {
    let registry = CountryRegistry::from_authority(&FixedAuthority);

    assert!(registry.contains("Brazil"));
    assert!(registry.contains("Federative Republic of Brazil"));
    assert!(registry.contains("Canada"));
    // Identical official name is not a second entry
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_builtin_registry() {
    let registry = CountryRegistry::builtin().unwrap();

    assert!(registry.contains("Mexico"));
    assert!(registry.contains("United Mexican States"));
    assert!(registry.contains("United States"));
    assert!(registry.contains("United States of America"));
    assert!(registry.len() > 249);
}

#[test]
fn test_iso3166_from_json_rejects_empty() {
    assert!(Iso3166::from_json("[]").is_err());
    assert!(Iso3166::from_json("not json").is_err());
}

#[test]
fn test_iso3166_from_json() {
    let authority =
        Iso3166::from_json(r#"[{"name": "Peru", "official_name": "Republic of Peru"}]"#).unwrap();
    let registry = CountryRegistry::from_authority(&authority);
    assert!(registry.contains("Republic of Peru"));
    assert_eq!(registry.len(), 2);
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_validate_exact_match() {
    let registry = CountryRegistry::from_authority(&FixedAuthority);
    assert_eq!(registry.validate("Brazil"), Some("Brazil".to_string()));
}

#[test]
fn test_validate_trims_token() {
    let registry = CountryRegistry::from_authority(&FixedAuthority);
    assert_eq!(registry.validate("  Brazil \t"), Some("Brazil".to_string()));
}

#[test]
fn test_validate_is_case_sensitive() {
    let registry = CountryRegistry::from_authority(&FixedAuthority);
    assert_eq!(registry.validate("brazil"), None);
    assert_eq!(registry.validate("BRAZIL"), None);
}

#[test]
fn test_validate_rejects_noise() {
    let registry = CountryRegistry::from_authority(&FixedAuthority);
    assert_eq!(registry.validate("Sao Paulo"), None);
    assert_eq!(registry.validate("USA"), None);
    assert_eq!(registry.validate(""), None);
}

#[test]
fn test_validate_is_idempotent() {
    let registry = CountryRegistry::builtin().unwrap();
    for name in ["Mexico", "Federative Republic of Brazil", "Spain"] {
        let once = registry.validate(name).unwrap();
        assert_eq!(registry.validate(&once), Some(once.clone()));
        assert_eq!(once, name);
    }
}

#[test]
fn test_from_names() {
    let registry = CountryRegistry::from_names(["Chile ", "Peru"]);
    assert_eq!(registry.validate("Chile"), Some("Chile".to_string()));
    assert_eq!(registry.len(), 2);
}

// Tests for connectivity aggregation and the matrix container

use latamconn_core::matrix::{
    AggregationStats, ConnectivityAggregator, ConnectivityMatrix, LATAM_COUNTRIES,
    RecordContribution,
};
use latamconn_core::table::CountryTable;
use std::collections::HashSet;

fn table(rows: &[&[&str]]) -> CountryTable {
    CountryTable::from_lists(
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// ============================================================================
// Aggregation Tests
// ============================================================================

#[test]
fn test_default_rows_are_latam_countries_in_order() {
    let matrix = ConnectivityAggregator::default().aggregate(&table(&[&["Mexico"]]));
    assert_eq!(matrix.rows().len(), 29);
    assert_eq!(matrix.rows()[0], "Belize");
    assert_eq!(matrix.rows()[28], "Saint-Martin");
    assert_eq!(matrix.rows(), LATAM_COUNTRIES.map(String::from).as_slice());
}

#[test]
fn test_single_anchor_is_self_connection() {
    let matrix = ConnectivityAggregator::default().aggregate(&table(&[&["Mexico"]]));

    assert_eq!(matrix.columns(), &["Mexico".to_string()]);
    assert_eq!(matrix.get("Mexico", "Mexico"), Some(1));
    assert_eq!(matrix.total(), 1);
}

#[test]
fn test_multi_country_record_counts_every_anchor_pair() {
    let matrix =
        ConnectivityAggregator::default().aggregate(&table(&[&["Brazil", "Argentina", "Spain"]]));

    assert_eq!(matrix.columns(), labels(&["Argentina", "Brazil", "Spain"]).as_slice());
    for anchor in ["Brazil", "Argentina"] {
        for country in ["Argentina", "Brazil", "Spain"] {
            assert_eq!(matrix.get(anchor, country), Some(1), "{anchor} x {country}");
        }
    }
    assert_eq!(matrix.total(), 6);
    assert_eq!(matrix.row_total("Chile"), 0);
}

#[test]
fn test_record_without_anchor_only_adds_columns() {
    let matrix = ConnectivityAggregator::default().aggregate(&table(&[&["Spain", "France"]]));

    assert_eq!(matrix.columns(), labels(&["France", "Spain"]).as_slice());
    assert_eq!(matrix.total(), 0);
    // Non-anchors never become rows
    assert_eq!(matrix.get("Spain", "France"), None);
}

#[test]
fn test_single_non_anchor_is_not_a_self_connection() {
    let (matrix, stats) =
        ConnectivityAggregator::default().aggregate_with_stats(&table(&[&["Spain"]]));
    assert_eq!(matrix.total(), 0);
    assert_eq!(stats.records_without_anchor, 1);
    assert_eq!(stats.self_connections, 0);
}

#[test]
fn test_empty_rows_contribute_nothing() {
    let countries = CountryTable {
        width: 2,
        rows: vec![vec![None, None], vec![Some("Peru".to_string()), None]],
    };
    let (matrix, stats) = ConnectivityAggregator::default().aggregate_with_stats(&countries);

    assert_eq!(matrix.get("Peru", "Peru"), Some(1));
    assert_eq!(stats.records_without_anchor, 1);
    assert_eq!(stats.self_connections, 1);
}

#[test]
fn test_anchor_anchor_counts_in_both_directions() {
    let matrix = ConnectivityAggregator::default().aggregate(&table(&[&["Chile", "Peru"]]));
    assert_eq!(matrix.get("Chile", "Peru"), Some(1));
    assert_eq!(matrix.get("Peru", "Chile"), Some(1));
    assert_eq!(matrix.get("Chile", "Chile"), Some(1));
}

#[test]
fn test_stats_accumulate() {
    let (matrix, stats) = ConnectivityAggregator::default().aggregate_with_stats(&table(&[
        &["Mexico"],
        &["Brazil", "Argentina", "Spain"],
        &["Germany"],
        &["Cuba", "Canada"],
    ]));

    assert_eq!(
        stats,
        AggregationStats {
            records_without_anchor: 1,
            self_connections: 1,
            multi_country_records: 2,
            increments: 1 + 6 + 2,
        }
    );
    assert_eq!(matrix.total(), stats.increments);
}

#[test]
fn test_custom_anchors() {
    let aggregator = ConnectivityAggregator::new(labels(&["Spain"]));
    let matrix = aggregator.aggregate(&table(&[&["Spain", "Portugal"]]));

    assert_eq!(matrix.rows(), labels(&["Spain"]).as_slice());
    assert_eq!(matrix.get("Spain", "Portugal"), Some(1));
    assert_eq!(matrix.get("Spain", "Spain"), Some(1));
}

#[test]
fn test_apply_record_contributions() {
    let aggregator = ConnectivityAggregator::default();
    let mut matrix = ConnectivityMatrix::new(
        aggregator.anchors().to_vec(),
        labels(&["Brazil", "Chile", "Japan"]),
    );

    let none: HashSet<&str> = ["Japan"].into_iter().collect();
    let single: HashSet<&str> = ["Chile"].into_iter().collect();
    let multi: HashSet<&str> = ["Brazil", "Japan"].into_iter().collect();

    assert_eq!(
        aggregator.apply_record(&mut matrix, &none),
        RecordContribution::NoAnchor
    );
    assert_eq!(
        aggregator.apply_record(&mut matrix, &single),
        RecordContribution::SelfConnection
    );
    assert_eq!(
        aggregator.apply_record(&mut matrix, &multi),
        RecordContribution::Connections(2)
    );
}

#[test]
fn test_chunked_matches_single_pass() {
    let countries = table(&[
        &["Mexico"],
        &["Brazil", "Argentina", "Spain"],
        &["Germany", "Chile"],
        &["Peru", "Chile", "Colombia"],
        &["France"],
    ]);
    let aggregator = ConnectivityAggregator::default();
    let (single, single_stats) = aggregator.aggregate_with_stats(&countries);

    for chunk_size in [1, 2, 3, 10] {
        let (chunked, chunked_stats) = aggregator.aggregate_chunked(&countries, chunk_size).unwrap();
        assert_eq!(chunked, single, "chunk size {chunk_size}");
        assert_eq!(chunked_stats, single_stats);
    }
}

// ============================================================================
// Matrix Container Tests
// ============================================================================

#[test]
fn test_increment_unknown_label() {
    let mut matrix = ConnectivityMatrix::new(labels(&["Peru"]), labels(&["Chile"]));
    assert!(matrix.increment("Peru", "Chile"));
    assert!(!matrix.increment("Peru", "Japan"));
    assert!(!matrix.increment("Japan", "Chile"));
    assert_eq!(matrix.total(), 1);
}

#[test]
fn test_merge_requires_same_labels() {
    let mut a = ConnectivityMatrix::new(labels(&["Peru"]), labels(&["Chile"]));
    let b = ConnectivityMatrix::new(labels(&["Peru"]), labels(&["Chile", "Japan"]));
    assert!(a.merge(&b).is_err());

    let mut c = ConnectivityMatrix::new(labels(&["Peru"]), labels(&["Chile"]));
    c.increment("Peru", "Chile");
    a.merge(&c).unwrap();
    a.merge(&c).unwrap();
    assert_eq!(a.get("Peru", "Chile"), Some(2));
}

#[test]
fn test_nonzero_cells_order() {
    let mut matrix = ConnectivityMatrix::new(labels(&["Peru", "Chile"]), labels(&["A", "B"]));
    matrix.increment("Chile", "A");
    matrix.increment("Peru", "B");
    let cells: Vec<_> = matrix.nonzero_cells().collect();
    assert_eq!(cells, vec![("Peru", "B", 1), ("Chile", "A", 1)]);
}

#[test]
fn test_top_connections_skip_diagonal() {
    let mut matrix = ConnectivityMatrix::new(
        labels(&["Brazil", "Chile"]),
        labels(&["Brazil", "Chile", "Spain"]),
    );
    for _ in 0..5 {
        matrix.increment("Brazil", "Brazil");
    }
    for _ in 0..3 {
        matrix.increment("Chile", "Spain");
    }
    matrix.increment("Brazil", "Chile");
    matrix.increment("Brazil", "Spain");

    let top = matrix.top_connections(10);
    let pairs: Vec<_> = top
        .iter()
        .map(|c| (c.source.as_str(), c.target.as_str(), c.count))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Chile", "Spain", 3),
            ("Brazil", "Chile", 1),
            ("Brazil", "Spain", 1)
        ]
    );
    assert_eq!(matrix.top_connections(1).len(), 1);
}

// ============================================================================
// CSV Tests
// ============================================================================

#[test]
fn test_csv_layout() {
    let matrix =
        ConnectivityAggregator::new(labels(&["Brazil", "Chile"])).aggregate(&table(&[&[
            "Brazil", "Spain",
        ]]));

    let mut out = Vec::new();
    matrix.write_csv(&mut out).unwrap();
    let csv = String::from_utf8(out).unwrap();

    assert_eq!(csv, ",Brazil,Spain\nBrazil,1,1\nChile,0,0\n");
}

#[test]
fn test_csv_read_back() {
    let matrix = ConnectivityAggregator::default().aggregate(&table(&[
        &["Mexico"],
        &["Brazil", "Argentina", "Spain"],
    ]));

    let mut out = Vec::new();
    matrix.write_csv(&mut out).unwrap();
    let parsed = ConnectivityMatrix::from_reader(out.as_slice()).unwrap();
    assert_eq!(parsed, matrix);
}

#[test]
fn test_csv_accepts_float_counts() {
    let parsed = ConnectivityMatrix::from_reader(",Chile\nPeru,3.0\n".as_bytes()).unwrap();
    assert_eq!(parsed.get("Peru", "Chile"), Some(3));
}

#[test]
fn test_csv_rejects_bad_counts() {
    assert!(ConnectivityMatrix::from_reader(",Chile\nPeru,many\n".as_bytes()).is_err());
    assert!(ConnectivityMatrix::from_reader(",Chile\nPeru,-1\n".as_bytes()).is_err());
    assert!(ConnectivityMatrix::from_reader(",Chile\nPeru,1.5\n".as_bytes()).is_err());
}

#[test]
fn test_csv_rejects_counts_beyond_u64() {
    assert!(ConnectivityMatrix::from_reader(",Chile\nPeru,1e30\n".as_bytes()).is_err());
    assert!(ConnectivityMatrix::from_reader(",Chile\nPeru,18446744073709551616\n".as_bytes()).is_err());

    let max = ConnectivityMatrix::from_reader(",Chile\nPeru,18446744073709551615\n".as_bytes())
        .unwrap();
    assert_eq!(max.get("Peru", "Chile"), Some(u64::MAX));
}

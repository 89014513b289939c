mod common;

use common::{dataset, num, text};
use datastory_prep::aggregate::{group_mean, present_sorted};
use datastory_prep::dataset::Dataset;
use datastory_prep::error::AggregateError;

#[test]
fn group_mean_averages_each_group() {
    let input = dataset(
        &["year", "value"],
        vec![
            vec![text("2000"), num(1.0)],
            vec![text("2001"), num(2.0)],
            vec![text("2000"), num(3.0)],
            vec![text("2001"), num(4.0)],
            vec![text("2001"), num(6.0)],
        ],
    );
    let grouped = group_mean(&input, "year").expect("group");

    assert_eq!(grouped.columns(), ["year", "value"]);
    assert_eq!(
        grouped.rows(),
        [
            vec![text("2000"), num(2.0)],
            vec![text("2001"), num(4.0)],
        ]
    );
}

#[test]
fn group_mean_orders_keys_ascending_and_drops_text_columns() {
    let input = dataset(
        &["Year", "Region", "kg", "note"],
        vec![
            vec![num(2002.0), text("Fryslân"), num(540.0), text("x")],
            vec![num(2000.0), text("Fryslân"), num(560.0), None],
            vec![num(2000.0), text("Groningen"), num(590.0), text("y")],
            vec![num(2002.0), text("Groningen"), None, None],
        ],
    );
    let grouped = group_mean(&input, "Year").expect("group");

    assert_eq!(grouped.columns(), ["Year", "kg"]);
    assert_eq!(
        grouped.rows(),
        [
            vec![num(2000.0), num(575.0)],
            // Missing values are left out of the mean.
            vec![num(2002.0), num(540.0)],
        ]
    );
}

#[test]
fn group_mean_of_an_all_missing_group_is_missing() {
    let input = dataset(
        &["k", "v"],
        vec![vec![num(1.0), None], vec![num(2.0), num(3.0)]],
    );
    let grouped = group_mean(&input, "k").expect("group");
    assert_eq!(grouped.rows()[0], vec![num(1.0), None]);
}

#[test]
fn group_mean_puts_numeric_keys_before_text_keys() {
    let input = dataset(
        &["k", "v"],
        vec![
            vec![text("total"), num(9.0)],
            vec![num(2.0), num(1.0)],
            vec![num(1.0), num(1.0)],
        ],
    );
    let grouped = group_mean(&input, "k").expect("group");
    let keys: Vec<_> = grouped.rows().iter().map(|row| row[0].clone()).collect();
    assert_eq!(keys, [num(1.0), num(2.0), text("total")]);
}

#[test]
fn group_mean_treats_signed_zero_keys_as_one_group() {
    let input = dataset(
        &["k", "v"],
        vec![vec![num(0.0), num(1.0)], vec![num(-0.0), num(3.0)]],
    );
    let grouped = group_mean(&input, "k").expect("group");
    assert_eq!(grouped.rows(), [vec![num(0.0), num(2.0)]]);
}

#[test]
fn group_mean_on_empty_input_is_empty() {
    let input = Dataset::empty(vec!["k".into(), "v".into()]).expect("empty");
    let grouped = group_mean(&input, "k").expect("group");
    assert!(grouped.is_empty());
}

#[test]
fn unknown_group_key_is_an_error() {
    let input = dataset(&["k"], vec![]);
    let err = group_mean(&input, "year").unwrap_err();
    assert!(matches!(err, AggregateError::UnknownColumn(ref name) if name == "year"));
}

#[test]
fn present_sorted_drops_missing_and_sorts_ascending() {
    let input = dataset(
        &["country", "access"],
        vec![
            vec![text("A"), None],
            vec![text("B"), num(30.0)],
            vec![text("C"), num(10.0)],
        ],
    );
    let ranked = present_sorted(&input, "access", "access").expect("rank");
    let countries: Vec<_> = ranked.rows().iter().map(|row| row[0].clone()).collect();
    assert_eq!(countries, [text("C"), text("B")]);
}

#[test]
fn present_sorted_is_stable_for_ties() {
    let input = dataset(
        &["country", "access"],
        vec![
            vec![text("first"), num(50.0)],
            vec![text("low"), num(10.0)],
            vec![text("second"), num(50.0)],
            vec![text("third"), num(50.0)],
        ],
    );
    let ranked = present_sorted(&input, "access", "access").expect("rank");
    let countries: Vec<_> = ranked.rows().iter().map(|row| row[0].clone()).collect();
    assert_eq!(
        countries,
        [text("low"), text("first"), text("second"), text("third")]
    );
}

#[test]
fn each_snapshot_filters_on_its_own_column() {
    let input = dataset(
        &["Country", "2005", "2017"],
        vec![
            vec![text("Ethiopia"), None, num(41.1)],
            vec![text("Niger"), num(41.8), None],
            vec![text("Chad"), num(37.5), num(38.7)],
        ],
    );

    let ranked_2005 = present_sorted(&input, "2005", "2005").expect("rank 2005");
    let names_2005: Vec<_> = ranked_2005.rows().iter().map(|row| row[0].clone()).collect();
    assert_eq!(names_2005, [text("Chad"), text("Niger")]);

    let ranked_2017 = present_sorted(&input, "2017", "2017").expect("rank 2017");
    let names_2017: Vec<_> = ranked_2017.rows().iter().map(|row| row[0].clone()).collect();
    assert_eq!(names_2017, [text("Chad"), text("Ethiopia")]);
}

#[test]
fn sort_column_may_differ_from_target_with_missing_last() {
    let input = dataset(
        &["Country", "2005", "2017"],
        vec![
            vec![text("Ethiopia"), None, num(41.1)],
            vec![text("Chad"), num(37.5), num(38.7)],
        ],
    );
    let ranked = present_sorted(&input, "2017", "2005").expect("rank");
    let names: Vec<_> = ranked.rows().iter().map(|row| row[0].clone()).collect();
    assert_eq!(names, [text("Chad"), text("Ethiopia")]);
}

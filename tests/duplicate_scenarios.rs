// End-to-end scenarios for detect_duplicates through the public API

use rstest::rstest;
use trust_duplicates::{detect_duplicates, DuplicateDetector, Transaction, DUPLICATE_WINDOW_MS};

fn create_test_transaction(id: &str, time: &str) -> Transaction {
    create_test_transaction_with(id, time, 100.0, "eating_out")
}

fn create_test_transaction_with(id: &str, time: &str, amount: f64, category: &str) -> Transaction {
    Transaction::new(id, "A", "B", amount, category, time)
}

fn ids(transactions: &[Transaction]) -> Vec<Vec<String>> {
    detect_duplicates(transactions)
        .unwrap()
        .iter()
        .map(|cluster| cluster.ids().into_iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn test_empty_batch() {
    assert!(detect_duplicates(&[]).unwrap().is_empty());
}

#[rstest]
#[case::fifty_seconds("2018-03-02T10:33:50.000Z", true)]
#[case::exactly_one_minute("2018-03-02T10:34:00.000Z", true)]
#[case::almost_three_minutes("2018-03-02T10:35:50.000Z", false)]
fn test_pair_of_same_key_transactions(#[case] second_time: &str, #[case] duplicate: bool) {
    let transactions = vec![
        create_test_transaction("1", "2018-03-02T10:33:00.000Z"),
        create_test_transaction("2", second_time),
    ];

    let expected: Vec<Vec<String>> = if duplicate {
        vec![vec!["1".to_string(), "2".to_string()]]
    } else {
        Vec::new()
    };
    assert_eq!(ids(&transactions), expected);
}

#[test]
fn test_no_duplicates_across_keys() {
    let transactions = vec![
        create_test_transaction_with("1", "2018-03-02T10:34:30.000Z", 90.0, "eating_out"),
        create_test_transaction_with("2", "2018-03-02T10:33:00.000Z", 100.0, "eating_out"),
    ];

    assert!(ids(&transactions).is_empty());
}

#[test]
fn test_non_duplicate_is_left_out() {
    let transactions = vec![
        create_test_transaction("1", "2018-03-02T10:33:00.000Z"),
        create_test_transaction("2", "2018-03-02T10:33:50.000Z"),
        create_test_transaction_with("3", "2018-03-02T10:33:00.000Z", 100.0, "groceries"),
    ];

    assert_eq!(ids(&transactions), vec![vec!["1", "2"]]);
}

#[test]
fn test_two_clusters_sorted_by_earliest_member() {
    let transactions = vec![
        create_test_transaction("1", "2018-03-02T10:33:00.000Z"),
        create_test_transaction("2", "2018-03-02T10:33:50.000Z"),
        create_test_transaction_with("3", "2018-03-01T10:34:30.000Z", 90.0, "groceries"),
        create_test_transaction_with("4", "2018-03-01T10:34:40.000Z", 90.0, "groceries"),
    ];

    assert_eq!(ids(&transactions), vec![vec!["3", "4"], vec!["1", "2"]]);
}

#[test]
fn test_other_key_in_between_does_not_break_pair() {
    let transactions = vec![
        create_test_transaction("A", "2018-03-02T10:33:00.000Z"),
        create_test_transaction_with("B", "2018-03-02T10:35:00.000Z", 55.0, "transport"),
        create_test_transaction("C", "2018-03-02T10:34:00.000Z"),
    ];

    assert_eq!(ids(&transactions), vec![vec!["A", "C"]]);
}

#[test]
fn test_same_key_far_transaction_in_between_input() {
    let transactions = vec![
        create_test_transaction("1", "2018-03-02T10:33:00.000Z"),
        create_test_transaction("2", "2018-03-02T10:36:00.000Z"),
        create_test_transaction("3", "2018-03-02T10:34:00.000Z"),
    ];

    assert_eq!(ids(&transactions), vec![vec!["1", "3"]]);
}

#[test]
fn test_identical_times_keep_input_order() {
    let time = "2018-03-02T10:33:00.000Z";
    let transactions = vec![
        create_test_transaction("1", time),
        create_test_transaction("2", time),
        create_test_transaction("3", time),
    ];

    assert_eq!(ids(&transactions), vec![vec!["1", "2", "3"]]);
}

#[test]
fn test_chain_extends_beyond_one_minute_from_first() {
    let transactions = vec![
        create_test_transaction("1", "2018-03-02T10:33:00.000Z"),
        create_test_transaction("2", "2018-03-02T10:33:50.000Z"),
        create_test_transaction("3", "2018-03-02T10:34:40.000Z"),
        create_test_transaction("4", "2018-03-02T10:35:30.000Z"),
    ];

    let clusters = detect_duplicates(&transactions).unwrap();

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].len(), 4);
    assert_eq!(clusters[0].span_ms(), 150_000);
}

#[test]
fn test_cluster_invariants_on_mixed_batch() {
    let mut transactions = Vec::new();
    let categories = ["eating_out", "groceries", "transport"];
    for n in 0..60u32 {
        let category = categories[(n % 3) as usize];
        let minute = n / 2;
        let second = (n * 17) % 60;
        let time = format!("2018-03-02T10:{:02}:{:02}.000Z", minute, second);
        transactions.push(create_test_transaction_with(&n.to_string(), &time, 100.0, category));
    }

    let first = detect_duplicates(&transactions).unwrap();
    let second = detect_duplicates(&transactions).unwrap();

    assert!(!first.is_empty());
    assert_eq!(
        first.iter().map(|c| c.ids()).collect::<Vec<_>>(),
        second.iter().map(|c| c.ids()).collect::<Vec<_>>()
    );

    for cluster in &first {
        assert!(cluster.len() >= 2);

        let key = cluster.original().business_key();
        assert!(cluster.transactions().iter().all(|tx| tx.business_key() == key));

        for hop in cluster.member_times().windows(2) {
            let gap = (hop[1] - hop[0]).num_milliseconds();
            assert!((0..=DUPLICATE_WINDOW_MS).contains(&gap));
        }
    }

    for pair in first.windows(2) {
        assert!(pair[0].anchor_time() <= pair[1].anchor_time());
    }
}

#[test]
fn test_invalid_timestamp_aborts_batch() {
    let transactions = vec![
        create_test_transaction("1", "2018-03-02T10:33:00.000Z"),
        create_test_transaction("2", "2018-03-02T10:33:10.000Z"),
        create_test_transaction("bad", "02/03/2018 10:33"),
    ];

    let err = DuplicateDetector::new().detect(&transactions).unwrap_err();

    assert!(err.to_string().contains("bad"));
}

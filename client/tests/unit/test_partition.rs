//! Group partitioner tests

use std::collections::HashSet;

use vmlab::wizard::draft::GroupMode;
use vmlab::wizard::partition::{partition, Group};

fn students(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("s{}", i)).collect()
}

fn no_names(_: &str) -> Option<String> {
    None
}

fn sizes(groups: &[Group]) -> Vec<usize> {
    groups.iter().map(|g| g.member_ids.len()).collect()
}

#[test]
fn test_custom_seven_into_three() {
    let groups = partition(&students(7), GroupMode::Custom, 3, &[], no_names).unwrap();

    assert_eq!(sizes(&groups), vec![3, 2, 2]);
    assert_eq!(groups[0].member_ids, vec!["s1", "s2", "s3"]);
    assert_eq!(groups[1].member_ids, vec!["s4", "s5"]);
    assert_eq!(groups[2].member_ids, vec!["s6", "s7"]);
    assert_eq!(groups[0].name, "Team #1");
    assert_eq!(groups[2].name, "Team #3");
}

#[test]
fn test_custom_sizes_differ_by_at_most_one() {
    for n in 0..25 {
        for count in 1..9 {
            let input = students(n);
            let groups = partition(&input, GroupMode::Custom, count, &[], no_names).unwrap();
            assert_eq!(groups.len(), count);

            let sizes = sizes(&groups);
            let max = sizes.iter().max().copied().unwrap_or(0);
            let min = sizes.iter().min().copied().unwrap_or(0);
            assert!(max - min <= 1, "n={} count={} sizes={:?}", n, count, sizes);

            // every student exactly once
            let members: Vec<&String> = groups.iter().flat_map(|g| &g.member_ids).collect();
            assert_eq!(members.len(), n);
            let unique: HashSet<&String> = members.iter().copied().collect();
            assert_eq!(unique.len(), n);
            assert!(input.iter().all(|s| unique.contains(s)));
        }
    }
}

#[test]
fn test_custom_more_groups_than_students() {
    let groups = partition(&students(2), GroupMode::Custom, 4, &[], no_names).unwrap();
    assert_eq!(sizes(&groups), vec![1, 1, 0, 0]);
}

#[test]
fn test_zero_group_count_rejected() {
    assert!(partition(&students(3), GroupMode::Custom, 0, &[], no_names).is_err());
    assert!(partition(&students(3), GroupMode::Single, 0, &[], no_names).is_err());
    assert!(partition(&students(3), GroupMode::EachUser, 0, &[], no_names).is_ok());
}

#[test]
fn test_each_user_one_group_per_student() {
    let groups = partition(&students(2), GroupMode::EachUser, 99, &[], no_names).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].member_ids, vec!["s1"]);
    assert_eq!(groups[1].member_ids, vec!["s2"]);
    assert_ne!(groups[0].member_ids, groups[1].member_ids);
}

#[test]
fn test_each_user_names_from_display_identity() {
    let overrides = vec![String::new(), "Pair B".to_string()];
    let groups = partition(&students(3), GroupMode::EachUser, 0, &overrides, |id| {
        (id == "s1").then(|| "alice".to_string())
    })
    .unwrap();

    assert_eq!(groups[0].name, "alice");
    assert_eq!(groups[1].name, "Pair B");
    assert_eq!(groups[2].name, "s3");
}

#[test]
fn test_single_uses_first_custom_name() {
    let names = vec!["Everyone".to_string()];
    let groups = partition(&students(4), GroupMode::Single, 1, &names, no_names).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Everyone");
    assert_eq!(groups[0].member_ids.len(), 4);
}

#[test]
fn test_partition_is_deterministic_and_drops_duplicates() {
    let input = vec![
        "s1".to_string(),
        "s2".to_string(),
        " s1 ".to_string(),
        "s3".to_string(),
    ];
    let first = partition(&input, GroupMode::Custom, 2, &[], no_names).unwrap();
    let second = partition(&input, GroupMode::Custom, 2, &[], no_names).unwrap();

    assert_eq!(first, second);
    assert_eq!(sizes(&first), vec![2, 1]);
}

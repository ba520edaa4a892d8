mod common;

use common::write_data_file;
use house_price_heatmap::importers::{partition_data_files, remove_files, LONDON_AREAS};

#[test]
fn test_partition_keeps_london_and_belt_areas() {
    let dir = tempfile::tempdir().unwrap();
    let camden = write_data_file(dir.path(), "Camden", &[]);
    let guildford = write_data_file(dir.path(), "Guildford", &[]);
    let leeds = write_data_file(dir.path(), "Leeds", &[]);
    let cornwall = write_data_file(dir.path(), "Cornwall", &[]);
    std::fs::write(dir.path().join("README.txt"), "not data").unwrap();

    let partition = partition_data_files(dir.path()).unwrap();

    assert_eq!(partition.keep, vec![camden, guildford]);
    assert_eq!(partition.remove, vec![cornwall, leeds]);
}

#[test]
fn test_remove_files_counts_successes() {
    let dir = tempfile::tempdir().unwrap();
    let leeds = write_data_file(dir.path(), "Leeds", &[]);
    let missing = dir.path().join("Gone_link_26122024.csv");

    let removed = remove_files(&[leeds.clone(), missing]);

    assert_eq!(removed, 1);
    assert!(!leeds.exists());
}

#[test]
fn test_area_list_uses_file_name_form() {
    assert!(LONDON_AREAS.contains(&"Kingston_upon_Thames"));
    assert!(LONDON_AREAS.iter().all(|area| !area.contains(' ')));
}

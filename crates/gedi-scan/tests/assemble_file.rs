//! Beam union and derived-column behavior against an in-memory store.

use arrow::array::{
    Array, Float64Array, RecordBatch, StringArray, StructArray, TimestampNanosecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};

use gedi_hdf5::{MemoryStore, SliceData};
use gedi_scan::{assemble, ScanOptions, MISSION_EPOCH_NS};

/// Two beams of two rows each, the minimal shape of a real granule.
fn two_beam_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (beam, agbd, lon, lat, delta) in [
        (
            "BEAM0000",
            vec![0.9, 2.5],
            vec![-70.51330701882061, -70.51248198865636],
            vec![-51.77306938985101, -51.77306720114365],
            vec![0.5, 1.25],
        ),
        (
            "BEAM1000",
            vec![3.9, 1.5],
            vec![-70.54086976614937, -70.54004432851809],
            vec![-51.80907508732351, -51.80907305598579],
            vec![2.0, 2.5],
        ),
    ] {
        store.add_dataset(
            &format!("{}/agbd", beam),
            &[2],
            SliceData::Float64(agbd),
        );
        store.add_dataset(
            &format!("{}/lon_lowestmode", beam),
            &[2],
            SliceData::Float64(lon),
        );
        store.add_dataset(
            &format!("{}/lat_lowestmode", beam),
            &[2],
            SliceData::Float64(lat),
        );
        store.add_dataset(
            &format!("{}/delta_time", beam),
            &[2],
            SliceData::Float64(delta),
        );
    }
    // Auxiliary groups are not beams and must be ignored.
    store.add_group("METADATA");
    store
}

#[test]
fn two_beams_assemble_into_one_table() {
    let store = two_beam_store();
    let scan = assemble(store.root(), None).unwrap();

    let names: Vec<&str> = scan
        .output_schema()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(
        names,
        vec!["agbd", "beam_name", "beam_type", "time", "geometry"]
    );

    let batches: Vec<RecordBatch> = scan
        .execute(ScanOptions::default())
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    let total_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(total_rows, 4);

    // Beams arrive in child-iteration order: BEAM0000 then BEAM1000.
    let first = &batches[0];
    let beam_name = first
        .column_by_name("beam_name")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    let beam_type = first
        .column_by_name("beam_type")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(beam_name.value(0), "BEAM0000");
    assert_eq!(beam_type.value(0), "coverage");

    let last = batches.last().unwrap();
    let beam_name = last
        .column_by_name("beam_name")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    let beam_type = last
        .column_by_name("beam_type")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(beam_name.value(beam_name.len() - 1), "BEAM1000");
    assert_eq!(beam_type.value(beam_type.len() - 1), "power");
}

#[test]
fn time_is_epoch_plus_delta_nanoseconds() {
    let store = two_beam_store();
    let scan = assemble(store.root(), None).unwrap();
    let batches: Vec<RecordBatch> = scan
        .execute(ScanOptions::default())
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    let time = batches[0]
        .column_by_name("time")
        .unwrap()
        .as_any()
        .downcast_ref::<TimestampNanosecondArray>()
        .unwrap()
        .clone();
    assert_eq!(
        time.data_type(),
        &DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into()))
    );
    // delta_time 0.5s and 1.25s after the 2018-01-01 epoch.
    assert_eq!(time.value(0), MISSION_EPOCH_NS + 500_000_000);
    assert_eq!(time.value(1), MISSION_EPOCH_NS + 1_250_000_000);
}

#[test]
fn geometry_is_lon_lat_point_struct() {
    let store = two_beam_store();
    let scan = assemble(store.root(), None).unwrap();
    let batches: Vec<RecordBatch> = scan
        .execute(ScanOptions::default())
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    let geometry = batches[0]
        .column_by_name("geometry")
        .unwrap()
        .as_any()
        .downcast_ref::<StructArray>()
        .unwrap()
        .clone();
    let x = geometry
        .column_by_name("x")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    let y = geometry
        .column_by_name("y")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(x.value(0), -70.51330701882061);
    assert_eq!(y.value(0), -51.77306938985101);
}

#[test]
fn nested_and_algorithm_columns_rename() {
    let store = MemoryStore::new();
    store.add_dataset("BEAM0000/agbd", &[2], SliceData::Float64(vec![1.0, 2.0]));
    store.add_dataset(
        "BEAM0000/geolocation/lat_lowestmode",
        &[2],
        SliceData::Float64(vec![0.0, 1.0]),
    );
    store.add_dataset(
        "BEAM0000/geolocation/lon_lowestmode",
        &[2],
        SliceData::Float64(vec![0.0, 1.0]),
    );
    store.add_dataset(
        "BEAM0000/geolocation/delta_time",
        &[2],
        SliceData::Float64(vec![0.0, 1.0]),
    );
    store.add_dataset(
        "BEAM0000/rx_processing_a1/zcross",
        &[2],
        SliceData::Float32(vec![5.0, 6.0]),
    );
    store.add_dataset(
        "BEAM0000/rx_processing_a2/zcross",
        &[2],
        SliceData::Float32(vec![7.0, 8.0]),
    );

    let scan = assemble(store.root(), None).unwrap();
    let names: Vec<&str> = scan
        .output_schema()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    // The geolocation/* source columns are consumed by time and geometry;
    // the per-algorithm duplicates keep their _aN suffix.
    assert_eq!(
        names,
        vec![
            "agbd",
            "zcross_a1",
            "zcross_a2",
            "beam_name",
            "beam_type",
            "time",
            "geometry"
        ]
    );

    let batches: Vec<RecordBatch> = scan
        .execute(ScanOptions::default())
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(batches[0].num_rows(), 2);
}

#[test]
fn projection_through_assembly_skips_unneeded_datasets() {
    let store = two_beam_store();
    let scan = assemble(store.root(), None).unwrap();

    let batches: Vec<RecordBatch> = scan
        .execute(ScanOptions::default().with_columns(["agbd", "beam_name"]))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(batches[0].num_columns(), 2);
    assert!(store.read_count("BEAM0000/agbd") > 0);
    // Neither derived column was requested, so their sources are never read.
    assert_eq!(store.read_count("BEAM0000/delta_time"), 0);
    assert_eq!(store.read_count("BEAM0000/lat_lowestmode"), 0);
    assert_eq!(store.read_count("BEAM0000/lon_lowestmode"), 0);
}

#[test]
fn limit_applies_across_beams() {
    let store = two_beam_store();
    let scan = assemble(store.root(), None).unwrap();

    let sizes: Vec<usize> = scan
        .execute(ScanOptions::default().with_limit(3))
        .unwrap()
        .map(|r| r.unwrap().num_rows())
        .collect();
    assert_eq!(sizes.iter().sum::<usize>(), 3);
}

#[test]
fn file_without_beams_is_an_error() {
    let store = MemoryStore::new();
    store.add_group("METADATA");
    assert!(assemble(store.root(), None).is_err());
}

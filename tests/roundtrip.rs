//! Instruments survive writing to NeXus JSON and reading back.

use std::path::Path;

use serde_json::Value;

use nxinstrument::json::{
    self, config, create_writer_commands, from_json_str, instrument_document, read_json_file,
    to_json_string, write_json_file, NexusJsonWriter, ReadOptions,
};
use nxinstrument::model::{
    Component, ComponentClass, CountDirection, Corner, CylindricalGeometry, Geometry, Instrument,
    OffGeometry, PixelData, PixelGrid, PixelMapping, TransformRef, Transformation, Vector3,
};

fn fixture() -> Instrument {
    read_json_file(Path::new("tests/fixtures/instrument.json"), &ReadOptions::default())
        .expect("fixture loads")
        .instrument
}

fn round_trip(instrument: &Instrument) -> Instrument {
    let json = to_json_string(instrument, &NexusJsonWriter::new()).expect("serialize");
    let outcome = from_json_str(&json, &ReadOptions::default()).expect("parse");
    assert!(outcome.report.is_clean(), "{}", outcome.report);
    outcome.instrument
}

fn square() -> OffGeometry {
    OffGeometry::from_faces(
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ],
        &[vec![0, 1, 2], vec![0, 2, 3]],
        "mm",
    )
}

#[test]
fn fixture_round_trip_is_lossless() {
    let instrument = fixture();
    assert_eq!(round_trip(&instrument), instrument);
}

#[test]
fn round_trip_is_idempotent() {
    let first = to_json_string(&fixture(), &NexusJsonWriter::new()).unwrap();
    let reread = from_json_str(&first, &ReadOptions::default()).unwrap().instrument;
    let second = to_json_string(&reread, &NexusJsonWriter::new()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_pixel_data_variant_round_trips() {
    let mut instrument = Instrument::default();
    instrument.sample.description = "Powder in a can".to_string();

    let grid = PixelGrid {
        rows: 3,
        columns: 4,
        row_height: 0.5,
        col_width: 0.25,
        first_id: 100,
        count_direction: CountDirection::Column,
        initial_count_corner: Corner::TopRight,
    };
    let panel = Component::new("panel", ComponentClass::Detector)
        .with_geometry(Geometry::Off(square()))
        .with_pixel_data(PixelData::Grid(grid));

    let mapping: PixelMapping = [(0, 11), (1, 12)].into_iter().collect();
    let bank = Component::new("bank", ComponentClass::Detector)
        .with_geometry(Geometry::Off(square()))
        .with_pixel_data(PixelData::Mapping(mapping));

    let tube = Component::new("tube", ComponentClass::Detector)
        .with_geometry(Geometry::Cylindrical(CylindricalGeometry::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 12.5),
            Vector3::new(0.0, 1000.0, 0.0),
            "mm",
        )))
        .with_pixel_data(PixelData::SingleId { id: 42 });

    let mut monitor = Component::new("monitor", ComponentClass::Monitor)
        .with_pixel_data(PixelData::SingleId { id: 7 });
    monitor.transforms.push(
        Transformation::translation("position", -3.0, "m", Vector3::new(0.0, 0.0, 1.0))
            .with_depends_on(TransformRef::new("tube", "rotate")),
    );
    monitor.depends_on = Some(TransformRef::new("monitor", "position"));

    let mut tube = tube;
    tube.transforms.push(Transformation::rotation(
        "rotate",
        90.0,
        "deg",
        Vector3::new(0.0, 1.0, 0.0),
    ));

    for component in [panel, bank, tube, monitor] {
        instrument.add_component(component).unwrap();
    }

    assert_eq!(round_trip(&instrument), instrument);
}

#[test]
fn truncation_only_affects_large_arrays() {
    let instrument = fixture();
    let writer = NexusJsonWriter::new().with_truncation(json::DEFAULT_TRUNCATION);
    let document = instrument_document(&instrument, &writer);

    let detector = &document["nexus_structure"]["children"][0]["children"][1]["children"][0];
    let shape = detector["children"]
        .as_array()
        .and_then(|c| c.iter().find(|n| n["name"] == "shape"))
        .unwrap();
    let winding = shape["children"]
        .as_array()
        .and_then(|c| c.iter().find(|n| n["name"] == "winding_order"))
        .unwrap();
    assert_eq!(winding["values"].as_array().map(Vec::len), Some(10));
    assert_eq!(winding["dataset"]["size"], serde_json::json!([10]));

    let faces = shape["children"]
        .as_array()
        .and_then(|c| c.iter().find(|n| n["name"] == "faces"))
        .unwrap();
    assert_eq!(faces["values"].as_array().map(Vec::len), Some(6));
}

#[test]
fn config_streams_links_and_commands() {
    let config = config::load_writer_config(Path::new("tests/fixtures/writer.yaml")).unwrap();
    let instrument = fixture();
    let structure = config
        .writer()
        .structure(&json::instrument_to_tree(&instrument));

    let entry = &structure["children"][0];
    let sample = &entry["children"][0];
    assert_eq!(sample["children"][0]["type"], "link");
    assert_eq!(sample["children"][0]["target"], "/entry/instrument/detector");

    let monitor = &entry["children"][1]["children"][1];
    assert_eq!(monitor["name"], "monitor");
    assert_eq!(monitor["children"][0]["stream"]["topic"], "monitor_events");

    let (write, stop) = create_writer_commands(
        structure.clone(),
        config.file_name.as_deref().unwrap_or("out.nxs"),
        &config.command_options(),
    );
    assert_eq!(write.broker, "kafka.example.org:9092");
    assert_eq!(write.job_id, "7f2c1a9e-job");
    assert_eq!(stop.job_id, write.job_id);
    assert_eq!(write.file_attributes.file_name, "run_42.nxs");
    assert_eq!(write.nexus_structure, structure);
}

#[test]
fn written_file_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.json");
    let instrument = fixture();
    write_json_file(&path, &instrument, &NexusJsonWriter::new()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let document: Value = serde_json::from_str(&text).unwrap();
    assert!(document["nexus_structure"]["children"].is_array());

    let reread = read_json_file(&path, &ReadOptions::default()).unwrap().instrument;
    assert_eq!(reread, instrument);
}

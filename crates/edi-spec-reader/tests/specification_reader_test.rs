use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::thread;

use edi_grammar::{Edimap, Import, Segment, SegmentGroup, SegmentNode};
use edi_spec_reader::specification::DEFINITIONS_NAME;
use edi_spec_reader::{
    Definitions, Error, ReaderOptions, ReferenceKind, SpecificationArchive, SpecificationReader,
};
use zip::write::SimpleFileOptions;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/unedifact/d08a")
}

fn fixture(name: &str) -> Vec<u8> {
    fs::read(fixture_dir().join(name)).expect("fixture should load")
}

fn fixture_text(name: &str) -> String {
    String::from_utf8(fixture(name)).expect("fixture should be ASCII")
}

fn zip_archive(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).expect("zip entry should start");
        writer.write_all(content).expect("zip entry should write");
    }
    writer.finish().expect("zip should finish").into_inner()
}

/// A release laid out like the published archives, one nested zip per directory
fn release_zip() -> Vec<u8> {
    let eded = zip_archive(&[("EDED.08A", fixture("EDED.08A"))]);
    let edcd = zip_archive(&[("EDCD.08A", fixture("EDCD.08A"))]);
    let edsd = zip_archive(&[("EDSD.08A", fixture("EDSD.08A"))]);
    let edmd = zip_archive(&[
        ("INVOIC_D.08A", fixture("INVOIC_D.08A")),
        ("ORDERS_D.08A", fixture("ORDERS_D.08A")),
    ]);
    zip_archive(&[
        ("d08a/EDED.ZIP", eded),
        ("d08a/EDCD.ZIP", edcd),
        ("d08a/EDSD.ZIP", edsd),
        ("d08a/EDMD.ZIP", edmd),
        ("d08a/README.TXT", b"UN/EDIFACT directory D.08A".to_vec()),
    ])
}

fn reader(options: ReaderOptions) -> SpecificationReader {
    init_tracing();
    SpecificationReader::from_zip(&release_zip(), options).expect("release should load")
}

fn definitions() -> Definitions {
    Definitions::from_bytes(
        &fixture("EDED.08A"),
        &fixture("EDCD.08A"),
        &fixture("EDSD.08A"),
    )
    .expect("definitions should load")
}

/// Segment codes and group names of the direct children of `group`
fn children(group: &SegmentGroup) -> Vec<&str> {
    group
        .children
        .iter()
        .map(|child| match child {
            SegmentNode::Segment(segment) => segment.segcode.as_str(),
            SegmentNode::Group(group) => group.name.as_str(),
        })
        .collect()
}

fn group<'a>(parent: &'a SegmentGroup, name: &str) -> &'a SegmentGroup {
    parent
        .groups()
        .find(|g| g.name == name)
        .unwrap_or_else(|| panic!("group {name} should exist"))
}

fn occurs(segment: &Segment) -> (u32, u32) {
    (segment.min_occurs, segment.max_occurs)
}

#[test]
fn release_lists_definitions_and_messages() {
    let reader = reader(ReaderOptions::default());
    assert_eq!(
        reader.message_names(),
        vec![DEFINITIONS_NAME, "INVOIC", "ORDERS"]
    );
    assert_eq!(reader.directory_version(), Some("d08a"));
}

#[test]
fn definitions_model_holds_directory_and_envelope() {
    let reader = reader(ReaderOptions::default());
    let model = reader.definition_model();

    assert_eq!(
        children(&model.segments),
        vec![
            "BGM", "DTM", "IMD", "LIN", "MOA", "NAD", "RFF", "UNS", "UGH", "UGT", "UNB", "UNZ",
            "UNG", "UNE", "UNH", "UNT"
        ]
    );

    let bgm = model.segment("BGM").unwrap();
    assert_eq!(bgm.name, "BEGINNING OF MESSAGE");
    let ids: Vec<&str> = bgm.fields.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["C002", "C106", "1225"]);
    assert_eq!(bgm.fields[2].max_length, 3);

    let nad = model.segment("NAD").unwrap();
    assert!(nad.fields[0].required);
    assert!(!nad.fields[1].required);
    assert!(nad.fields[1].components[0].required);
    assert_eq!(nad.fields[2].id, "3164");
    assert!(!nad.fields[2].required);

    let moa = model.segment("MOA").unwrap();
    assert_eq!(
        moa.fields[0].components[1].documentation,
        "Number of monetary units specified in a transaction."
    );
}

#[test]
fn invoic_segment_table_structure() {
    let reader = reader(ReaderOptions::default());
    let invoic = reader.mapping_model("INVOIC").unwrap();

    assert_eq!(invoic.name(), "INVOIC");
    assert_eq!(invoic.description.version, "D:08A:UN");
    assert_eq!(
        invoic.description.namespace.as_deref(),
        Some("urn:org.milyn.edi.unedifact:un:d08a:invoic")
    );

    let root = &invoic.segments;
    assert_eq!(
        children(root),
        vec![
            "BGM",
            "DTM",
            "Segment group 1",
            "Segment group 2",
            "Segment group 4",
            "UNS",
            "MOA",
            "DTM"
        ]
    );

    let sg1 = group(root, "Segment group 1");
    assert_eq!(children(sg1), vec!["RFF", "DTM"]);
    assert_eq!((sg1.min_occurs, sg1.max_occurs), (0, 99));
    assert_eq!(sg1.xmltag, "Segment_group_1");

    let sg2 = group(root, "Segment group 2");
    assert_eq!(children(sg2), vec!["NAD", "Segment group 3"]);
    let sg3 = group(sg2, "Segment group 3");
    assert_eq!(children(sg3), vec!["RFF", "DTM"]);
    assert_eq!(sg3.max_occurs, 9999);

    let sg4 = group(root, "Segment group 4");
    assert_eq!(children(sg4), vec!["LIN", "IMD", "MOA"]);
    assert_eq!(sg4.max_occurs, 9_999_999);

    let segments: Vec<&Segment> = root.segments().collect();
    assert_eq!(occurs(segments[0]), (1, 1));
    assert_eq!(occurs(segments[1]), (1, 35));
    assert_eq!(occurs(segments[3]), (1, 100));
    assert_eq!(occurs(segments[4]), (0, 1));
}

#[test]
fn invoic_usages_carry_definitions_and_position_text() {
    let reader = reader(ReaderOptions::default());
    let invoic = reader.mapping_model("INVOIC").unwrap();
    let definitions = reader.definition_model();

    let bgm = invoic.segment("BGM").unwrap();
    assert_eq!(bgm.xmltag, "BGM");
    assert_eq!(bgm.name, "Beginning of message");
    assert_eq!(bgm.node_type_ref.as_deref(), Some("UN:BGM"));
    assert_eq!(bgm.fields, definitions.segment("BGM").unwrap().fields);
    assert_eq!(
        bgm.documentation,
        "A segment by which the sender uniquely identifies the invoice\ndocument."
    );

    let sg2 = group(&invoic.segments, "Segment group 2");
    assert_eq!(
        sg2.documentation,
        "A group of segments identifying the parties with associated\ninformation."
    );

    let imd = group(&invoic.segments, "Segment group 4")
        .segments()
        .find(|s| s.segcode == "IMD")
        .unwrap();
    assert_eq!(
        imd.name,
        "Item description, written over the full width of the column"
    );
    assert_eq!(occurs(imd), (0, 10));
    assert_eq!(
        imd.documentation,
        "A segment for describing the product or service being invoiced."
    );
}

#[test]
fn invoic_skips_service_segments_and_stops_at_annex() {
    let reader = reader(ReaderOptions::default());
    let invoic = reader.mapping_model("INVOIC").unwrap();

    let codes: Vec<&str> = invoic
        .segments
        .all_segments()
        .iter()
        .map(|s| s.segcode.as_str())
        .collect();
    for skipped in ["UNH", "UNT", "ZZZ"] {
        assert!(!codes.contains(&skipped), "{skipped} should not be a usage");
    }
    // section headings between the groups match no layout and are passed over
    assert_eq!(codes.len(), 13);
}

#[test]
fn group_starts_balance_group_closes() {
    let text = fixture_text("INVOIC_D.08A");
    let table: Vec<&str> = text
        .lines()
        .skip_while(|line| !line.starts_with("Pos    Tag Name"))
        .take_while(|line| !line.starts_with("Informative annex"))
        .collect();

    let starts = table
        .iter()
        .filter(|line| line.contains("Segment group"))
        .count();
    let closes: usize = table
        .iter()
        .filter(|line| !line.contains("Segment group"))
        .map(|line| line.matches('+').count())
        .sum();
    assert_eq!(starts, closes);

    let reader = reader(ReaderOptions::default());
    let invoic = reader.mapping_model("INVOIC").unwrap();
    assert_eq!(invoic.segments.all_groups().len(), starts);
}

#[test]
fn usages_satisfy_occurrence_bounds() {
    let reader = reader(ReaderOptions::default());
    for name in ["INVOIC", "ORDERS"] {
        let model = reader.mapping_model(name).unwrap();
        for segment in model.segments.all_segments() {
            assert!(segment.min_occurs <= 1, "{name}/{}", segment.segcode);
            assert!(segment.max_occurs >= segment.min_occurs, "{name}/{}", segment.segcode);
        }
        for group in model.segments.all_groups() {
            assert!(group.min_occurs <= 1, "{name}/{}", group.name);
            assert!(group.max_occurs >= group.min_occurs, "{name}/{}", group.name);
        }
    }
}

#[test]
fn field_components_resolve_to_data_elements() {
    let definitions = definitions();
    let fields = definitions
        .fields
        .iter()
        .map(|(_, field)| field)
        .chain(definitions.segments.iter().flat_map(|s| s.fields.iter()));

    for field in fields {
        let mut seen = Vec::new();
        for component in &field.components {
            let definition = definitions
                .components
                .get(&component.id)
                .unwrap_or_else(|| panic!("{} of {} should resolve", component.id, field.id));
            assert_eq!(&component.with_required(false), definition);
            assert!(!seen.contains(&component.id), "{} listed twice", component.id);
            seen.push(component.id.clone());
        }
    }
}

#[test]
fn definitions_read_is_idempotent() {
    let first = definitions();
    let second = definitions();
    assert_eq!(
        first.components.ids().collect::<Vec<_>>(),
        second.components.ids().collect::<Vec<_>>()
    );
    assert_eq!(first.components, second.components);
    assert_eq!(first.fields, second.fields);
    assert_eq!(first.segments, second.segments);
    assert_eq!(first.components.len(), 18);
    assert_eq!(first.fields.len(), 8);
}

#[test]
fn orders_old_layout_numbers_positions_in_order() {
    let reader = reader(ReaderOptions::default());
    let orders = reader.mapping_model("ORDERS").unwrap();

    assert_eq!(
        children(&orders.segments),
        vec!["BGM", "DTM", "Segment group 1", "UNS"]
    );
    let bgm = orders.segment("BGM").unwrap();
    assert_eq!(
        bgm.documentation,
        "A segment for unique identification of the purchase order."
    );
    let sg1 = group(&orders.segments, "Segment group 1");
    assert_eq!(sg1.documentation, "A group of segments identifying the parties.");
    assert_eq!(children(sg1), vec!["NAD", "RFF"]);
    let rff = sg1.segments().nth(1).unwrap();
    assert_eq!(occurs(rff), (0, 10));
    assert_eq!(rff.documentation, "A segment giving a reference of the party.");
}

#[test]
fn import_mode_references_definitions() {
    let reader = reader(ReaderOptions::default().with_import(true));
    let invoic = reader.mapping_model("INVOIC").unwrap();

    assert_eq!(
        invoic.imports,
        vec![Import {
            namespace: "UN".to_string(),
            resource: format!("{DEFINITIONS_NAME}.yaml"),
        }]
    );
    assert!(invoic.segments.all_segments().iter().all(|s| s.fields.is_empty()));
    assert_eq!(
        invoic.segment("BGM").unwrap().node_type_ref.as_deref(),
        Some("UN:BGM")
    );
}

#[test]
fn long_names_use_encoded_tags() {
    let reader = reader(ReaderOptions::default().with_short_name(false));

    let definitions = reader.definition_model();
    assert_eq!(definitions.segment("BGM").unwrap().xmltag, "BEGINNING_OF_MESSAGE");
    assert_eq!(definitions.segment("UNH").unwrap().xmltag, "messageHeader");
    assert_eq!(definitions.segment("UGH").unwrap().xmltag, "UGH");

    let invoic = reader.mapping_model("INVOIC").unwrap();
    assert_eq!(invoic.segment("BGM").unwrap().xmltag, "Beginning_of_message");
}

#[test]
fn message_lookups_parse_afresh_with_equal_results() {
    let reader = reader(ReaderOptions::default());
    let first = reader.mapping_model("INVOIC").unwrap();
    let second = reader.mapping_model("INVOIC").unwrap();
    assert_eq!(first, second);
}

#[test]
fn concurrent_lookups_share_the_reader() {
    let reader = reader(ReaderOptions::default());
    let (invoic, orders) = thread::scope(|scope| {
        let invoic = scope.spawn(|| reader.mapping_model("INVOIC"));
        let orders = scope.spawn(|| reader.mapping_model("ORDERS"));
        (invoic.join().unwrap(), orders.join().unwrap())
    });
    assert_eq!(invoic.unwrap().name(), "INVOIC");
    assert_eq!(orders.unwrap().name(), "ORDERS");
}

#[test]
fn plain_entries_read_like_nested_archives() -> anyhow::Result<()> {
    let archive = SpecificationArchive::from_entries(
        ["EDED.08A", "EDCD.08A", "EDSD.08A", "INVOIC_D.08A"]
            .into_iter()
            .map(|name| (name, fixture(name))),
    )?;
    let plain = SpecificationReader::new(archive, ReaderOptions::default())?;
    let nested = reader(ReaderOptions::default());

    assert_eq!(plain.definition_model(), nested.definition_model());
    assert_eq!(plain.mapping_model("INVOIC")?, nested.mapping_model("INVOIC")?);
    Ok(())
}

#[test]
fn stray_release_files_are_not_messages() -> anyhow::Result<()> {
    init_tracing();
    let edmd = zip_archive(&[("INVOIC_D.08A", fixture("INVOIC_D.08A"))]);
    let release = zip_archive(&[
        ("d08a/EDED.ZIP", zip_archive(&[("EDED.08A", fixture("EDED.08A"))])),
        ("d08a/EDCD.ZIP", zip_archive(&[("EDCD.08A", fixture("EDCD.08A"))])),
        ("d08a/EDSD.ZIP", zip_archive(&[("EDSD.08A", fixture("EDSD.08A"))])),
        ("d08a/EDMD.ZIP", edmd),
        ("d08a/D08A_TOC.TXT", b"Table of contents".to_vec()),
        ("d08a/UNCL_D.08A", b"Code lists".to_vec()),
        ("d08a/IDMD_D.96A", b"Older batch directory".to_vec()),
    ]);

    let reader = SpecificationReader::from_zip(&release, ReaderOptions::default())?;
    assert_eq!(reader.message_names(), vec![DEFINITIONS_NAME, "INVOIC"]);
    assert_eq!(reader.directory_version(), Some("d08a"));
    assert!(matches!(
        reader.mapping_model("UNCL"),
        Err(Error::UnknownMessage(name)) if name == "UNCL"
    ));
    Ok(())
}

#[test]
fn box_drawing_bytes_read_like_ascii() -> anyhow::Result<()> {
    let ascii = fixture("INVOIC_D.08A");
    let legacy: Vec<u8> = ascii
        .iter()
        .map(|&byte| match byte {
            b'-' => 0xC4,
            b'+' => 0xD9,
            b'|' => 0xB3,
            other => other,
        })
        .collect();

    let read = |invoic: Vec<u8>| -> anyhow::Result<Edimap> {
        let archive = SpecificationArchive::from_entries([
            ("EDED.08A", fixture("EDED.08A")),
            ("EDCD.08A", fixture("EDCD.08A")),
            ("EDSD.08A", fixture("EDSD.08A")),
            ("INVOIC_D.08A", invoic),
        ])?;
        Ok(SpecificationReader::new(archive, ReaderOptions::default())?.mapping_model("INVOIC")?)
    };
    assert_eq!(read(legacy)?, read(ascii)?);
    Ok(())
}

#[test]
fn unknown_segment_code_is_reported() {
    let text = fixture_text("INVOIC_D.08A").replace("0130   LIN Line item", "0130   ZZX Line item");
    let archive = SpecificationArchive::from_entries([
        ("EDED.08A", fixture("EDED.08A")),
        ("EDCD.08A", fixture("EDCD.08A")),
        ("EDSD.08A", fixture("EDSD.08A")),
        ("INVOIC_D.08A", text.into_bytes()),
    ])
    .unwrap();
    let reader = SpecificationReader::new(archive, ReaderOptions::default()).unwrap();

    let error = reader.mapping_model("INVOIC").unwrap_err();
    assert!(matches!(
        &error,
        Error::UnresolvedReference { kind: ReferenceKind::Segment, id } if id == "ZZX"
    ));
    assert_eq!(error.to_string(), "Unknown segment code 'ZZX'");
}

#[test]
fn edi_directory_numbers_repeated_tags() {
    let reader = reader(ReaderOptions::default());

    let directory = reader.edi_directory(&["INVOIC"]).unwrap();
    assert_eq!(directory.common.name(), DEFINITIONS_NAME);
    assert_eq!(directory.messages.len(), 1);

    let invoic = directory.message("INVOIC").unwrap();
    let tags: Vec<&str> = invoic.segments.children.iter().map(|c| c.xmltag()).collect();
    assert_eq!(
        tags,
        vec![
            "BGM",
            "DTM_1",
            "Segment_group_1",
            "Segment_group_2",
            "Segment_group_4",
            "UNS",
            "MOA",
            "DTM_2"
        ]
    );

    // lookups outside the directory keep the published tags
    let plain = reader.mapping_model("INVOIC").unwrap();
    assert_eq!(plain.segments.children[1].xmltag(), "DTM");

    assert_eq!(reader.edi_directory(&[]).unwrap().messages.len(), 2);
}

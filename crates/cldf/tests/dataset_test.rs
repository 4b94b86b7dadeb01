//! Integration tests for building, writing, reading and validating datasets.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;

use cldf::{
    CldfError, Dataset, ObservationType, Row, Severity, Source, ValidationLog,
};

fn structure_dataset(dir: &Path) -> Dataset {
    let mut ds = Dataset::in_dir(dir, "StructureDataset", false).expect("Failed to create dataset");
    ds.add_component("LanguageTable", Vec::<&str>::new())
        .expect("Failed to add LanguageTable");
    ds
}

fn value(id: &str, language: &str) -> Row {
    Row::new()
        .with("ID", id)
        .with("Language_ID", language)
        .with("Parameter_ID", "p")
        .with("Value", "1")
}

fn language(id: &str) -> Row {
    Row::new().with("ID", id).with("Name", "language")
}

fn first_error(ds: &Dataset) -> cldf::Observation {
    let mut log = ValidationLog::new();
    assert!(!ds.validate(Some(&mut log)).expect("Validation aborted"));
    log.errors().next().cloned().expect("No error recorded")
}

// =============================================================================
// Key Inference Scenarios
// =============================================================================

#[test]
fn test_language_reference_wired_and_validated() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());

    let values = ds.table("ValueTable").unwrap();
    assert_eq!(values.foreign_keys().len(), 1);
    let fk = &values.foreign_keys()[0];
    assert_eq!(fk.column_reference, vec!["Language_ID"]);
    assert_eq!(fk.reference.resource, "languages.csv");
    assert_eq!(fk.reference.column_reference, vec!["ID"]);

    ds.write([
        ("ValueTable", vec![value("1", "abc")]),
        ("LanguageTable", vec![]),
    ])
    .unwrap();
    assert!(matches!(ds.validate(None), Err(CldfError::Validation(_))));

    ds.write([
        ("ValueTable", vec![value("1", "abc")]),
        ("LanguageTable", vec![language("abc")]),
    ])
    .unwrap();
    assert!(ds.validate(None).unwrap());
}

#[test]
fn test_composite_foreign_key_rejected() {
    let dir = TempDir::new().unwrap();
    let mut ds = Dataset::in_dir(dir.path(), "Generic", true).unwrap();
    ds.add_table("primary.csv", ["ID", "Name"], Some(&["ID", "Name"][..]))
        .unwrap();
    ds.add_table("foreign.csv", ["a", "b"], None).unwrap();
    let before = ds.tablegroup().clone();

    let err = ds
        .add_foreign_key("foreign.csv", ["a", "b"], "primary.csv", None)
        .unwrap_err();
    assert!(matches!(err, CldfError::Unsupported(_)));
    assert!(err.to_string().contains("not supported"));
    assert_eq!(ds.tablegroup(), &before);
}

#[test]
fn test_missing_source_names_key() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    let rows = vec![value("1", "abc").with("Source", vec!["key[1-20]"])];
    ds.write([
        ("ValueTable", rows.clone()),
        ("LanguageTable", vec![language("abc")]),
    ])
    .unwrap();

    let err = ds.validate(None).unwrap_err();
    let CldfError::Validation(failure) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failure.column.as_deref(), Some("Source"));
    assert!(failure.message.contains("key"));

    ds.sources
        .add(Source::new("book", "key").with_field("title", "The Book"))
        .unwrap();
    ds.write([
        ("ValueTable", rows),
        ("LanguageTable", vec![language("abc")]),
    ])
    .unwrap();
    assert!(dir.path().join("sources.bib").exists());
    assert!(ds.validate(None).unwrap());
}

#[test]
fn test_removing_id_drops_reference() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    assert_eq!(ds.table("ValueTable").unwrap().foreign_keys().len(), 1);

    ds.remove_columns("LanguageTable", ["ID"]).unwrap();
    assert!(ds.table("ValueTable").unwrap().foreign_keys().is_empty());
    assert!(ds.table("LanguageTable").unwrap().primary_key().is_none());
}

#[test]
fn test_unknown_term_conformance() {
    let dir = TempDir::new().unwrap();
    let md = dir.path().join("Generic-metadata.json");
    fs::write(
        &md,
        r#"{
            "@context": "http://www.w3.org/ns/csvw",
            "tables": [{
                "url": "things.csv",
                "dc:conformsTo": "http://cldf.clld.org/v1.0/terms.rdf#ThingTable",
                "tableSchema": {"columns": [{"name": "ID"}]}
            }]
        }"#,
    )
    .unwrap();
    let ds = Dataset::from_metadata(&md).unwrap();
    let err = ds.tables()[0].table_type().unwrap_err();
    assert!(matches!(err, CldfError::UnknownTerm(_)));

    let obs = first_error(&ds);
    assert_eq!(obs.observation_type, ObservationType::InvalidUri);
}

// =============================================================================
// Row-Level Validation
// =============================================================================

#[test]
fn test_datatype_error_has_position() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    ds.write([
        ("ValueTable", vec![value("1", "abc")]),
        ("LanguageTable", vec![language("abc")]),
    ])
    .unwrap();
    fs::write(
        dir.path().join("languages.csv"),
        "ID,Name,Latitude\nabc,language,north\n",
    )
    .unwrap();

    let obs = first_error(&ds);
    assert_eq!(obs.observation_type, ObservationType::TypeMismatch);
    assert_eq!(obs.table.as_deref(), Some("languages.csv"));
    assert_eq!(obs.column.as_deref(), Some("Latitude"));
    assert_eq!(obs.line, Some(2));
}

#[test]
fn test_required_value_missing() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    let row = Row::new().with("ID", "1").with("Language_ID", "abc");
    ds.write([
        ("ValueTable", vec![row]),
        ("LanguageTable", vec![language("abc")]),
    ])
    .unwrap();

    let obs = first_error(&ds);
    assert_eq!(obs.observation_type, ObservationType::MissingValue);
    assert_eq!(obs.column.as_deref(), Some("Parameter_ID"));
}

#[test]
fn test_invalid_glottocode() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    ds.write([
        ("ValueTable", vec![value("1", "abc")]),
        (
            "LanguageTable",
            vec![language("abc").with("Glottocode", "abcd12")],
        ),
    ])
    .unwrap();

    let obs = first_error(&ds);
    assert_eq!(obs.observation_type, ObservationType::ValidatorFailure);
    assert_eq!(obs.description, "invalid glottocode: abcd12");
}

#[test]
fn test_gloss_count_mismatch() {
    let dir = TempDir::new().unwrap();
    let mut ds = Dataset::in_dir(dir.path(), "Generic", true).unwrap();
    ds.add_component("ExampleTable", Vec::<&str>::new()).unwrap();
    ds.write([(
        "ExampleTable",
        vec![
            Row::new()
                .with("ID", "e1")
                .with("Language_ID", "l")
                .with("Primary_Text", "the dogs")
                .with("Analyzed_Word", vec!["the", "dog-s"])
                .with("Gloss", vec!["DEF", "dog-PL"]),
            Row::new()
                .with("ID", "e2")
                .with("Language_ID", "l")
                .with("Primary_Text", "the dogs")
                .with("Analyzed_Word", vec!["the", "dog-s"])
                .with("Gloss", vec!["DEF"]),
        ],
    )])
    .unwrap();

    let mut log = ValidationLog::new();
    assert!(!ds.validate(Some(&mut log)).unwrap());
    let errors: Vec<_> = log.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, Some(3));
    assert!(errors[0].description.contains("morphemes and glosses"));
}

#[test]
fn test_self_reference() {
    let dir = TempDir::new().unwrap();
    let mut ds = Dataset::in_dir(dir.path(), "Generic", true).unwrap();
    ds.add_table("nodes.csv", ["ID", "Parent_ID"], Some(&["ID"][..]))
        .unwrap();
    ds.add_foreign_key("nodes.csv", "Parent_ID", "nodes.csv", None)
        .unwrap();
    ds.write([(
        "nodes.csv",
        vec![
            Row::new().with("ID", "root"),
            Row::new().with("ID", "leaf").with("Parent_ID", "root"),
        ],
    )])
    .unwrap();
    assert!(ds.validate(None).unwrap());

    ds.write([(
        "nodes.csv",
        vec![Row::new().with("ID", "leaf").with("Parent_ID", "gone")],
    )])
    .unwrap();
    let obs = first_error(&ds);
    assert_eq!(obs.observation_type, ObservationType::DanglingReference);
}

#[test]
fn test_reference_chain() {
    let dir = TempDir::new().unwrap();
    let mut ds = Dataset::in_dir(dir.path(), "Wordlist", false).unwrap();
    ds.add_component("LanguageTable", Vec::<&str>::new()).unwrap();
    ds.add_component("CognateTable", Vec::<&str>::new()).unwrap();

    let form = |language: &str| {
        Row::new()
            .with("ID", "f1")
            .with("Language_ID", language)
            .with("Parameter_ID", "p")
            .with("Form", "tatu")
    };
    let cognate = |form: &str| {
        Row::new()
            .with("ID", "c1")
            .with("Form_ID", form)
            .with("Cognateset_ID", "s1")
    };

    // cognates.csv -> forms.csv -> languages.csv, broken in the middle
    ds.write([
        ("LanguageTable", vec![language("l1")]),
        ("FormTable", vec![form("gone")]),
        ("CognateTable", vec![cognate("f1")]),
    ])
    .unwrap();
    let mut log = ValidationLog::new();
    assert!(!ds.validate(Some(&mut log)).unwrap());
    assert_eq!(log.errors().count(), 1);
    let obs = log.errors().next().unwrap();
    assert_eq!(obs.observation_type, ObservationType::DanglingReference);
    assert_eq!(obs.table.as_deref(), Some("forms.csv"));
    assert_eq!(obs.column.as_deref(), Some("Language_ID"));
    assert_eq!(obs.line, Some(2));

    ds.write([("FormTable", vec![form("l1")])]).unwrap();
    assert!(ds.validate(None).unwrap());

    ds.write([("CognateTable", vec![cognate("f2")])]).unwrap();
    let obs = first_error(&ds);
    assert_eq!(obs.observation_type, ObservationType::DanglingReference);
    assert_eq!(obs.table.as_deref(), Some("cognates.csv"));
}

#[test]
fn test_missing_table_file_warns() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    ds.write([("ValueTable", Vec::<Row>::new())]).unwrap();

    let mut log = ValidationLog::new();
    assert!(ds.validate(Some(&mut log)).unwrap());
    let warning = log.warnings().next().unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.table.as_deref(), Some("languages.csv"));
}

#[test]
fn test_zipped_table_validates() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    ds.write([
        ("ValueTable", vec![value("1", "abc")]),
        ("LanguageTable", vec![language("abc")]),
    ])
    .unwrap();

    let csv = dir.path().join("languages.csv");
    let content = fs::read(&csv).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(dir.path().join("languages.csv.zip")).unwrap());
    zip.start_file("languages.csv", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(&content).unwrap();
    zip.finish().unwrap();
    fs::remove_file(&csv).unwrap();

    assert!(ds.validate(None).unwrap());
    assert!(ds.get_row("LanguageTable", "abc").unwrap().is_some());
}

// =============================================================================
// Persistence and Access
// =============================================================================

#[test]
fn test_metadata_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    ds.set_property("dc:title", "A test dataset");
    ds.write([
        ("ValueTable", vec![value("1", "abc")]),
        ("LanguageTable", vec![language("abc")]),
    ])
    .unwrap();

    let loaded = Dataset::from_metadata(ds.metadata_path()).unwrap();
    assert_eq!(loaded.tablegroup(), ds.tablegroup());
    assert_eq!(loaded.module(), "StructureDataset");
    assert_eq!(loaded.version().as_deref(), Some("v1.0"));
    assert_eq!(loaded.primary_table().as_deref(), Some("ValueTable"));
    assert!(loaded.validate(None).unwrap());
}

#[test]
fn test_rows_reflect_file_changes() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    ds.write([("LanguageTable", vec![language("a")])]).unwrap();
    assert_eq!(ds.iter_rows("LanguageTable").unwrap().count(), 1);
    assert!(ds.get_row("LanguageTable", "a").unwrap().is_some());

    ds.write([("LanguageTable", vec![language("a"), language("b")])])
        .unwrap();
    assert_eq!(ds.iter_rows("LanguageTable").unwrap().count(), 2);
    assert!(ds.get_row("LanguageTable", "b").unwrap().is_some());
}

#[test]
fn test_stats() {
    let dir = TempDir::new().unwrap();
    let mut ds = structure_dataset(dir.path());
    ds.sources.add(Source::new("book", "meier2005")).unwrap();
    ds.write([
        ("ValueTable", vec![value("1", "a"), value("2", "a")]),
        ("LanguageTable", vec![language("a")]),
    ])
    .unwrap();

    let stats = ds.stats().unwrap();
    let counts: Vec<(&str, usize)> = stats.iter().map(|s| (s.name.as_str(), s.rows)).collect();
    assert_eq!(
        counts,
        vec![("values.csv", 2), ("languages.csv", 1), ("sources.bib", 1)]
    );
}

#[test]
fn test_from_data() {
    let dir = TempDir::new().unwrap();
    let values = dir.path().join("values.csv");
    fs::write(&values, "ID,Language_ID,Parameter_ID,Value\n1,abc,p,x\n").unwrap();
    let ds = Dataset::from_data(&values).unwrap();
    assert_eq!(ds.module(), "StructureDataset");
    assert_eq!(ds.iter_rows("ValueTable").unwrap().count(), 1);

    let forms = dir.path().join("forms.csv");
    fs::write(&forms, "ID,Language_ID,Form\n1,abc,x\n").unwrap();
    let err = Dataset::from_data(&forms).unwrap_err();
    assert!(err.to_string().contains("Parameter_ID"));

    assert!(Dataset::from_data(dir.path().join("other.csv")).is_err());
}

// tests/definitions_tests.rs
use std::io::Write;

use gstgraph::{Catalog, CatalogEntry, ConfigError, GraphDefinitions, SignalError};
use tempfile::NamedTempFile;

const DEFINITIONS: &str = r#"
extractors:
  latency:
    match_include: [mysrc.c, "latency is"]
    source_token: -4
    fields:
      latency:
        description: Source latency
        unit: s
        parse: { kind: clock_time, token: -1 }
groups:
  mysrc:
    chain:
      match_include: [mysrc_chain]
      fields:
        size:
          description: Chain size
          parse: { kind: integer, token: -1 }
figures:
  - name: Latency
    signals: [latency.latency, latency.latency.running_average(2)]
    split: true
  - name: Sizes
    signals: [mysrc.chain.size.cumulative()]
"#;

#[test]
fn test_load_and_register() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(DEFINITIONS.as_bytes()).unwrap();

    let definitions = GraphDefinitions::load(file.path()).unwrap();
    assert_eq!(definitions.extractors.len(), 1);
    assert_eq!(definitions.figures.len(), 2);
    assert_eq!(definitions.figures[1].split_key, "source");

    let mut catalog = Catalog::builtin().unwrap();
    catalog.extend_from(&definitions).unwrap();

    match catalog.get("latency") {
        Some(CatalogEntry::Extractor(extractor)) => assert_eq!(extractor.name(), "latency"),
        other => panic!("unexpected entry {:?}", other),
    }
    match catalog.get("mysrc") {
        Some(CatalogEntry::Group(group)) => {
            assert_eq!(group.sub("chain").unwrap().name(), "mysrc.chain")
        }
        other => panic!("unexpected entry {:?}", other),
    }
    assert!(catalog
        .fields()
        .iter()
        .any(|f| f.path == "latency.latency" && f.unit.as_deref() == Some("s")));

    let figures = definitions.figures(&catalog).unwrap();
    assert_eq!(figures[0].name(), "Latency");
    assert_eq!(figures[0].signals().len(), 2);
    assert_eq!(figures[0].signals()[1].label(), "avg(2) Source latency");
    assert_eq!(figures[1].signals()[0].label(), "cumulative of Chain size");
    // both latency signals read the same store
    assert_eq!(figures[0].extractors().len(), 1);
}

#[test]
fn test_extracted_through_definitions() {
    let definitions = GraphDefinitions::from_yaml(DEFINITIONS).unwrap();
    let mut catalog = Catalog::new();
    catalog.extend_from(&definitions).unwrap();

    let latency = match catalog.get("latency") {
        Some(CatalogEntry::Extractor(extractor)) => extractor.clone(),
        other => panic!("unexpected entry {:?}", other),
    };
    let line = "0:00:01.000000000 1 0x1 DEBUG mysrc mysrc.c:42:report:<mysrc0> latency is 0:00:00.250000000";
    assert!(latency.analyze_line(line).unwrap());

    let store = latency.store().borrow();
    assert_eq!(store.records()[0].source(), Some("mysrc0"));
}

#[test]
fn test_duplicate_names() {
    let definitions = GraphDefinitions::from_yaml(
        r#"
extractors:
  vdec:
    match_include: [something]
    fields:
      n: { description: N, parse: { kind: integer, token: -1 } }
"#,
    )
    .unwrap();
    let mut catalog = Catalog::builtin().unwrap();
    let err = catalog.extend_from(&definitions).unwrap_err();
    assert!(matches!(err, ConfigError::Duplicate(ref name) if name == "vdec"));
}

#[test]
fn test_bad_figure_signal() {
    let definitions = GraphDefinitions::from_yaml(
        r#"
figures:
  - name: Broken
    signals: [vdec.chain.pts.smooth()]
"#,
    )
    .unwrap();
    let catalog = Catalog::builtin().unwrap();
    let err = definitions.figures(&catalog).unwrap_err();
    match err {
        ConfigError::Signal { figure, source } => {
            assert_eq!(figure, "Broken");
            assert!(matches!(source, SignalError::UnknownTransform(ref name) if name == "smooth"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_invalid_documents() {
    assert!(matches!(
        GraphDefinitions::from_yaml("figure: []"),
        Err(ConfigError::Yaml(_))
    ));

    let misconfigured = GraphDefinitions::from_yaml(
        r#"
extractors:
  empty:
    fields:
      n: { description: N, parse: { kind: integer, token: -1 } }
"#,
    )
    .unwrap();
    assert!(matches!(
        misconfigured.extractors(),
        Err(ConfigError::Extract(_))
    ));

    // misspelled keys inside extractor, field and token definitions
    for typo in [
        "source_tokn: -4\n    fields:\n      n: { description: N, parse: { kind: integer, token: -1 } }",
        "fields:\n      n: { description: N, unitt: s, parse: { kind: integer, token: -1 } }",
        "fields:\n      n: { description: N, parse: { kind: integer, token: { index: -1, strip_sufix: 1 } } }",
    ] {
        let yaml = format!("extractors:\n  typo:\n    match_include: [x]\n    {}\n", typo);
        assert!(
            matches!(GraphDefinitions::from_yaml(&yaml), Err(ConfigError::Yaml(_))),
            "accepted:\n{}",
            yaml
        );
    }

    assert!(matches!(
        GraphDefinitions::load(std::path::Path::new("/nonexistent/graphs.yaml")),
        Err(ConfigError::Read { .. })
    ));
}

// tests/extractor_tests.rs
use gstgraph::{
    Catalog, CatalogEntry, CompositeExtractor, ExtractError, ExtractorDefinition, FieldParse,
    FieldSpec, Filter, LineExtractor, TokenRef, Value,
};

const VDEC_CHAIN: &str = "0:00:01.234567890 12345 0x55d5c0a0 LOG videodecoder gstvideodecoder.c:2213:gst_video_decoder_chain:<avdec_h264-0> chain PTS 0:00:01.000000000, DTS 0:00:00.960000000 dur 0:00:00.040000000 size 4096";

fn group(catalog: &Catalog, name: &str) -> CompositeExtractor {
    match catalog.get(name) {
        Some(CatalogEntry::Group(group)) => group.clone(),
        other => panic!("expected group {}, got {:?}", name, other),
    }
}

fn counter(name: &str, include: &str) -> LineExtractor {
    LineExtractor::new(
        ExtractorDefinition::new(name)
            .include([include])
            .field("n", FieldSpec::new("Counter", FieldParse::integer(TokenRef::at(-1)))),
    )
    .unwrap()
}

#[test]
fn test_video_decoder_chain() {
    let catalog = Catalog::builtin().unwrap();
    let vdec = group(&catalog, "vdec");

    assert!(vdec.analyze_line(VDEC_CHAIN).unwrap());

    let chain = vdec.sub("chain").unwrap();
    assert_eq!(chain.len(), 1);
    let store = chain.store().borrow();
    let record = &store.records()[0];
    assert_eq!(record.walltime(), 1.23456789);
    assert_eq!(record.source(), Some("avdec_h264-0"));
    assert_eq!(record.get("pts"), Some(&Value::Time(1.0)));
    assert_eq!(record.get("dts"), Some(&Value::Time(0.96)));
    assert_eq!(record.get("size"), Some(&Value::Integer(4096)));

    // only the chain sub-extractor took the line
    assert!(vdec.sub("push").unwrap().is_empty());
}

#[test]
fn test_unknown_pts_falls_back_to_dts() {
    let catalog = Catalog::builtin().unwrap();
    let vdec = group(&catalog, "vdec");
    let line = VDEC_CHAIN.replace("PTS 0:00:01.000000000,", "PTS 99:99:99.999999999,");

    assert!(vdec.analyze_line(&line).unwrap());

    let pts = vdec.field("chain", "pts").unwrap();
    let dts = vdec.field("chain", "dts").unwrap();
    assert_eq!(pts.values(&Filter::new()), vec![0.96]);
    assert_eq!(dts.values(&Filter::new()), vec![0.96]);
}

#[test]
fn test_reverse_playback_is_excluded() {
    let catalog = Catalog::builtin().unwrap();
    let vdec = group(&catalog, "vdec");
    let line = format!("{} reverse", VDEC_CHAIN);
    assert!(!vdec.matches(&line));
    assert!(!vdec.analyze_line(&line).unwrap());
}

#[test]
fn test_base_sink_qos_scales_jitter() {
    let catalog = Catalog::builtin().unwrap();
    let basesink = group(&catalog, "basesink");
    let line = "0:00:02.500000000 12345 0x55d5c0a0 DEBUG basesink gstbasesink.c:3196:gst_base_sink_send_qos:<xvimagesink0> send event qos: proportion 1.000000, diff -5000000, timestamp 0:00:02.000000000";

    assert!(basesink.analyze_line(line).unwrap());

    let store = basesink.sub("qos").unwrap().store().borrow();
    let record = &store.records()[0];
    assert_eq!(record.source(), Some("xvimagesink0"));
    assert_eq!(record.get("proportion"), Some(&Value::Float(1.0)));
    let diff = record.get("diff").and_then(Value::as_f64).unwrap();
    assert!((diff + 0.005).abs() < 1e-12);
    assert_eq!(record.get("timestamp"), Some(&Value::Time(2.0)));
}

#[test]
fn test_base_sink_stop_falls_back_to_start() {
    let catalog = Catalog::builtin().unwrap();
    let basesink = group(&catalog, "basesink");
    let line = "0:00:03.000000000 1 0x1 LOG basesink gstbasesink.c:3500:gst_base_sink_chain_unlocked:<fakesink0> got times start: 0:00:01.000000000, stop: 99:99:99.999999999";

    assert!(basesink.analyze_line(line).unwrap());

    let stop = basesink.field("chain", "stop").unwrap();
    assert_eq!(stop.values(&Filter::new()), vec![1.0]);
}

#[test]
fn test_queue2_time_level_difference() {
    let catalog = Catalog::builtin().unwrap();
    let queue2 = group(&catalog, "queue2");
    let line = "0:00:06.000000000 12345 0x55d5c0a0 LOG queue2 gstqueue2.c:1050:update_time_level:<queue2-0> sink 0:00:05.000000000, src 0:00:03.000000000";

    assert!(queue2.analyze_line(line).unwrap());

    let store = queue2.sub("time_level").unwrap().store().borrow();
    let record = &store.records()[0];
    assert_eq!(record.source(), Some("queue2-0"));
    assert_eq!(record.get("sink_time"), Some(&Value::Time(5.0)));
    assert_eq!(record.get("src_time"), Some(&Value::Time(3.0)));
    assert_eq!(record.get("time_level"), Some(&Value::Time(2.0)));
}

#[test]
fn test_unknown_fragment_timestamp_is_skipped() {
    let catalog = Catalog::builtin().unwrap();
    let demux = group(&catalog, "adaptivedemux");
    let line = "0:00:01.000000000 1 0x1 DEBUG adaptivedemux gstadaptivedemux.c:3000:gst_adaptive_demux_stream_download_fragment:<dashdemux0> Requested fragment timestamp 99:99:99.999999999";

    assert!(demux.analyze_line(line).unwrap());
    assert!(demux.sub("fragment_request_time").unwrap().is_empty());
    assert!(!demux.has_updates());
}

#[test]
fn test_malformed_field() {
    let catalog = Catalog::builtin().unwrap();
    let vdec = group(&catalog, "vdec");
    let line = VDEC_CHAIN.replace("size 4096", "size lots");

    let err = vdec.analyze_line(&line).unwrap_err();
    assert!(matches!(err, ExtractError::FieldParseFailure { ref field, .. } if field == "size"));
    assert!(err.is_line_local());
    assert!(vdec.sub("chain").unwrap().is_empty());
}

#[test]
fn test_bad_walltime() {
    let extractor = counter("ticks", "tick");
    let err = extractor.analyze_line("yesterday tick 5").unwrap_err();
    assert!(matches!(err, ExtractError::Walltime { .. }));
}

#[test]
fn test_misconfigured_definitions() {
    let no_match = LineExtractor::new(
        ExtractorDefinition::new("empty")
            .field("n", FieldSpec::new("n", FieldParse::integer(TokenRef::at(-1)))),
    );
    assert!(matches!(
        no_match,
        Err(ExtractError::ExtractorMisconfigured { .. })
    ));

    let reserved = LineExtractor::new(
        ExtractorDefinition::new("reserved")
            .include(["x"])
            .field("walltime", FieldSpec::new("t", FieldParse::integer(TokenRef::at(-1)))),
    );
    assert!(matches!(
        reserved,
        Err(ExtractError::ExtractorMisconfigured { .. })
    ));

    let forward = LineExtractor::new(
        ExtractorDefinition::new("forward")
            .include(["x"])
            .field(
                "d",
                FieldSpec::new(
                    "d",
                    FieldParse::Difference {
                        minuend: "a".to_string(),
                        subtrahend: "b".to_string(),
                    },
                ),
            )
            .field("a", FieldSpec::new("a", FieldParse::integer(TokenRef::at(-2))))
            .field("b", FieldSpec::new("b", FieldParse::integer(TokenRef::at(-1)))),
    );
    assert!(matches!(
        forward,
        Err(ExtractError::ExtractorMisconfigured { .. })
    ));

    let duplicate = LineExtractor::new(
        ExtractorDefinition::new("duplicate")
            .include(["x"])
            .field("v", FieldSpec::new("v", FieldParse::integer(TokenRef::at(-1))))
            .field("v", FieldSpec::new("v", FieldParse::float(TokenRef::at(-2)))),
    );
    match duplicate {
        Err(ExtractError::ExtractorMisconfigured { reason, .. }) => {
            assert!(reason.contains("'v'"), "{}", reason)
        }
        other => panic!("duplicate field accepted: {:?}", other.map(|e| e.name().to_string())),
    }
}

#[test]
fn test_exclude_only_extractor_matches_everything_else() {
    let extractor = LineExtractor::new(
        ExtractorDefinition::new("not_noise")
            .exclude(["noise"])
            .field("n", FieldSpec::new("n", FieldParse::integer(TokenRef::at(-1)))),
    )
    .unwrap();
    assert!(extractor.matches("0:00:01.000000000 value 3"));
    assert!(!extractor.matches("0:00:01.000000000 noise 3"));
}

#[test]
fn test_composite_first_match_wins() {
    let first = counter("first", "tick");
    let second = counter("second", "tick");
    let group = CompositeExtractor::new("both", [("a", first.clone()), ("b", second.clone())])
        .unwrap();

    assert!(group.analyze_line("0:00:01.000000000 tick 1").unwrap());
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 0);
    assert!(group.has_updates());

    group.reset_updates();
    assert!(!first.has_updates());
}

#[test]
fn test_unknown_names() {
    let catalog = Catalog::builtin().unwrap();
    let vdec = group(&catalog, "vdec");
    assert!(matches!(
        vdec.sub("encoder"),
        Err(ExtractError::UnknownSubExtractor { .. })
    ));
    assert!(matches!(
        vdec.field("chain", "bitrate"),
        Err(ExtractError::UnknownField { .. })
    ));
    assert!(CompositeExtractor::new("empty", Vec::<(String, LineExtractor)>::new()).is_err());
}

#[test]
fn test_source_filter() {
    let extractor = LineExtractor::new(
        ExtractorDefinition::new("levels")
            .include(["level"])
            .source_token(1)
            .field("n", FieldSpec::new("Level", FieldParse::integer(TokenRef::at(-1)))),
    )
    .unwrap();
    for line in [
        "0:00:01.000000000 <q0> level 1",
        "0:00:02.000000000 <q1> level 2",
        "0:00:03.000000000 <q0> level 3",
    ] {
        extractor.analyze_line(line).unwrap();
    }

    let level = extractor.field("n").unwrap();
    assert_eq!(level.values(&Filter::new().with("source", "q0")), vec![1.0, 3.0]);
    assert_eq!(level.walltime(&Filter::new().with("source", "q1")), vec![2.0]);
    assert_eq!(
        level.key_values("source"),
        vec![Value::from("q0"), Value::from("q1")]
    );
}

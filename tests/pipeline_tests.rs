// tests/pipeline_tests.rs
use std::fs::OpenOptions;
use std::io::{Cursor, Write};
use std::path::Path;
use std::time::Duration;

use gstgraph::{
    Catalog, ErrorStrategy, ExtractorDefinition, FieldParse, FieldSpec, Figure, FigureSnapshot,
    LineExtractor, PipelineConfig, ProcessingError, StopSignal, StreamPipeline, TokenRef, Value,
};
use tempfile::NamedTempFile;

fn sampler(tag: &str) -> LineExtractor {
    LineExtractor::new(
        ExtractorDefinition::new(tag)
            .include([tag])
            .source_token(1)
            .field("v", FieldSpec::new("Level", FieldParse::integer(TokenRef::at(-1)))),
    )
    .unwrap()
}

fn pipeline_with(config: PipelineConfig, extractor: &LineExtractor) -> StreamPipeline {
    let mut pipeline = StreamPipeline::new(config);
    pipeline.add_figure(Figure::new("Levels", vec![extractor.field("v").unwrap()]));
    pipeline
}

fn fail_fast() -> PipelineConfig {
    PipelineConfig {
        error_strategy: ErrorStrategy::FailFast,
        ..PipelineConfig::default()
    }
}

#[test]
fn test_bounded_stream() {
    let extractor = sampler("level");
    let mut pipeline = pipeline_with(PipelineConfig::default(), &extractor);
    assert_eq!(pipeline.extractors().len(), 1);

    let input = "0:00:01.000000000 <q0> level 1\n\
                 0:00:01.500000000 <q0> unrelated chatter\n\
                 0:00:02.000000000 <q0> level 2\n\
                 0:00:03.000000000 <q0> level 3\n";
    let mut seen: Vec<Vec<FigureSnapshot>> = Vec::new();
    let mut renderer = |figures: &[FigureSnapshot]| -> Result<(), ProcessingError> {
        seen.push(figures.to_vec());
        Ok(())
    };
    let stats = pipeline
        .process_stream(Cursor::new(input), &mut renderer)
        .unwrap();

    assert_eq!(stats.lines_read, 4);
    assert_eq!(stats.lines_matched, 3);
    assert_eq!(stats.records_appended, 3);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.refreshes, 1);

    assert_eq!(seen.len(), 1);
    let figure = &seen[0][0];
    assert_eq!(figure.figure, "Levels");
    let series = &figure.panels[0].series[0];
    assert_eq!(series.key, Some(Value::from("q0")));
    assert_eq!(series.snapshot.label, "Level q0");
    assert_eq!(series.snapshot.walltime, vec![1.0, 2.0, 3.0]);
    assert_eq!(series.snapshot.values, vec![1.0, 2.0, 3.0]);

    assert!(!extractor.has_updates());
}

#[test]
fn test_skip_strategy_records_errors() {
    let extractor = sampler("level");
    let config = PipelineConfig {
        max_parse_errors: 1,
        ..PipelineConfig::default()
    };
    let mut pipeline = pipeline_with(config, &extractor);

    let input = "0:00:01.000000000 <q0> level 1\n\
                 0:00:02.000000000 <q0> level many\n\
                 0:00:03.000000000 <q0> level lots\n\
                 0:00:04.000000000 <q0> level 4\n";
    let mut renderer = |_: &[FigureSnapshot]| -> Result<(), ProcessingError> { Ok(()) };
    let stats = pipeline
        .process_stream(Cursor::new(input), &mut renderer)
        .unwrap();

    assert_eq!(stats.lines_matched, 4);
    assert_eq!(stats.records_appended, 2);
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.parse_errors.len(), 1);
    assert_eq!(stats.parse_errors[0].line_number, 2);
    assert_eq!(stats.parse_errors[0].extractor, "level");
    assert_eq!(extractor.len(), 2);
}

#[test]
fn test_fail_fast_reports_line_number() {
    let extractor = sampler("level");
    let mut pipeline = pipeline_with(fail_fast(), &extractor);

    let input = "0:00:01.000000000 <q0> level 1\n\
                 0:00:02.000000000 <q0> level many\n\
                 0:00:03.000000000 <q0> level 3\n";
    let mut renderer = |_: &[FigureSnapshot]| -> Result<(), ProcessingError> { Ok(()) };
    let err = pipeline
        .process_stream(Cursor::new(input), &mut renderer)
        .unwrap_err();

    match err {
        ProcessingError::Extract { line_number, .. } => assert_eq!(line_number, 2),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(extractor.len(), 1);
}

#[test]
fn test_line_too_long() {
    let extractor = sampler("level");
    let long_line = format!("0:00:01.000000000 <q0> level {}\n", "9".repeat(64));

    let config = PipelineConfig {
        max_line_length: 40,
        ..PipelineConfig::default()
    };
    let mut pipeline = pipeline_with(config, &extractor);
    let mut renderer = |_: &[FigureSnapshot]| -> Result<(), ProcessingError> { Ok(()) };
    let stats = pipeline
        .process_stream(Cursor::new(long_line.clone()), &mut renderer)
        .unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.lines_matched, 0);

    let config = PipelineConfig {
        max_line_length: 40,
        ..fail_fast()
    };
    let mut pipeline = pipeline_with(config, &extractor);
    let err = pipeline
        .process_stream(Cursor::new(long_line), &mut renderer)
        .unwrap_err();
    assert!(matches!(err, ProcessingError::LineTooLong { .. }));
}

#[test]
fn test_trailing_partial_line_is_processed() {
    let extractor = sampler("level");
    let mut pipeline = pipeline_with(PipelineConfig::default(), &extractor);

    let input = "0:00:01.000000000 <q0> level 1\r\n0:00:02.000000000 <q0> level 2";
    let mut renderer = |_: &[FigureSnapshot]| -> Result<(), ProcessingError> { Ok(()) };
    let stats = pipeline
        .process_stream(Cursor::new(input), &mut renderer)
        .unwrap();

    assert_eq!(stats.lines_read, 2);
    assert_eq!(stats.records_appended, 2);
    assert_eq!(extractor.field("v").unwrap().values(&Default::default()), vec![1.0, 2.0]);
}

#[test]
fn test_renderer_called_without_updates() {
    let extractor = sampler("level");
    let mut pipeline = pipeline_with(PipelineConfig::default(), &extractor);

    let mut calls = Vec::new();
    let mut renderer = |figures: &[FigureSnapshot]| -> Result<(), ProcessingError> {
        calls.push(figures.len());
        Ok(())
    };
    let stats = pipeline
        .process_stream(Cursor::new("0:00:01.000000000 nothing to see\n"), &mut renderer)
        .unwrap();

    assert_eq!(stats.lines_matched, 0);
    assert_eq!(calls, vec![0]);
}

#[test]
fn test_refresh_only_sends_updated_figures() {
    let first = sampler("first");
    let second = sampler("second");
    let mut pipeline = StreamPipeline::new(PipelineConfig::default());
    pipeline.add_figure(Figure::new("First", vec![first.field("v").unwrap()]));
    pipeline.add_figure(Figure::new("Second", vec![second.field("v").unwrap()]));

    let mut names: Vec<Vec<String>> = Vec::new();
    let mut renderer = |figures: &[FigureSnapshot]| -> Result<(), ProcessingError> {
        names.push(figures.iter().map(|f| f.figure.clone()).collect());
        Ok(())
    };

    pipeline.analyze_line("0:00:01.000000000 <a> first 1").unwrap();
    pipeline.analyze_line("0:00:01.000000000 <a> second 1").unwrap();
    pipeline.refresh(&mut renderer).unwrap();
    pipeline.analyze_line("0:00:02.000000000 <a> second 2").unwrap();
    pipeline.refresh(&mut renderer).unwrap();

    assert_eq!(
        names,
        vec![
            vec!["First".to_string(), "Second".to_string()],
            vec!["Second".to_string()],
        ]
    );
    assert_eq!(pipeline.get_stats().refreshes, 2);
}

#[test]
fn test_unknown_time_skips_record() {
    let catalog = Catalog::builtin().unwrap();
    let signal = catalog
        .resolve("adaptivedemux.fragment_request_time.timestamp")
        .unwrap();
    let mut pipeline = StreamPipeline::new(PipelineConfig::default());
    pipeline.add_figure(Figure::new("Requests", vec![signal]));

    let input = "0:00:01.000000000 1 0x1 DEBUG adaptivedemux gstadaptivedemux.c:3000:gst_adaptive_demux_stream_download_fragment:<dashdemux0> Requested fragment timestamp 99:99:99.999999999\n\
                 0:00:02.000000000 1 0x1 DEBUG adaptivedemux gstadaptivedemux.c:3000:gst_adaptive_demux_stream_download_fragment:<dashdemux0> Requested fragment timestamp 0:00:04.000000000\n";
    let mut renderer = |_: &[FigureSnapshot]| -> Result<(), ProcessingError> { Ok(()) };
    let stats = pipeline
        .process_stream(Cursor::new(input), &mut renderer)
        .unwrap();

    assert_eq!(stats.lines_matched, 2);
    assert_eq!(stats.records_skipped, 1);
    assert_eq!(stats.records_appended, 1);
    assert_eq!(stats.errors, 0);
}

#[test]
fn test_overlap_detection() {
    let first = sampler("tick");
    let second = LineExtractor::new(
        ExtractorDefinition::new("tock")
            .include(["tick"])
            .field("v", FieldSpec::new("Tock", FieldParse::integer(TokenRef::at(-1)))),
    )
    .unwrap();

    let config = PipelineConfig {
        detect_overlaps: true,
        ..PipelineConfig::default()
    };
    let mut pipeline = StreamPipeline::new(config);
    pipeline.add_extractor(first.clone());
    pipeline.add_extractor(second.clone());
    pipeline.add_extractor(first.clone());
    assert_eq!(pipeline.extractors().len(), 2);

    let mut renderer = |_: &[FigureSnapshot]| -> Result<(), ProcessingError> { Ok(()) };
    let stats = pipeline
        .process_stream(Cursor::new("0:00:01.000000000 <a> tick 1\n"), &mut renderer)
        .unwrap();

    assert_eq!(stats.overlaps, 1);
    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn test_split_and_shared_panels() {
    let extractor = sampler("level");
    for line in [
        "0:00:01.000000000 <a> level 1",
        "0:00:02.000000000 <b> level 2",
        "0:00:03.000000000 <a> level 3",
    ] {
        extractor.analyze_line(line).unwrap();
    }
    let signal = extractor.field("v").unwrap();

    let shared = Figure::new("Levels", vec![signal.clone()]).snapshot();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].title, "Levels");
    let labels: Vec<&str> = shared[0]
        .series
        .iter()
        .map(|s| s.snapshot.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Level a", "Level b"]);

    let split = Figure::new("Levels", vec![signal]).split(true).snapshot();
    let titles: Vec<&str> = split.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Levels a", "Levels b"]);
    assert_eq!(split[0].series[0].snapshot.values, vec![1.0, 3.0]);
    assert_eq!(split[1].series[0].snapshot.walltime, vec![2.0]);
}

#[test]
fn test_missing_file() {
    let extractor = sampler("level");
    let mut pipeline = pipeline_with(PipelineConfig::default(), &extractor);
    let mut renderer = |_: &[FigureSnapshot]| -> Result<(), ProcessingError> { Ok(()) };
    let err = pipeline
        .analyze_file(Path::new("/nonexistent/gst.log"), &mut renderer)
        .unwrap_err();
    assert!(matches!(err, ProcessingError::Open { .. }));
}

#[test]
fn test_follow_picks_up_appended_lines() {
    let mut log = NamedTempFile::new().unwrap();
    writeln!(log, "0:00:01.000000000 <q0> level 1").unwrap();
    log.flush().unwrap();
    let mut appender = OpenOptions::new().append(true).open(log.path()).unwrap();

    let extractor = sampler("level");
    let config = PipelineConfig {
        poll_interval: Duration::from_millis(10),
        ..PipelineConfig::default()
    };
    let mut pipeline = pipeline_with(config, &extractor);

    let stop = StopSignal::new();
    let mut calls = Vec::new();
    let mut stored = Vec::new();
    let mut renderer = |figures: &[FigureSnapshot]| -> Result<(), ProcessingError> {
        let points = figures
            .first()
            .map(|f| f.panels[0].series[0].snapshot.values.len());
        calls.push(points);
        stored.push(extractor.len());
        if calls.len() == 1 {
            writeln!(appender, "0:00:02.000000000 <q0> level 2")?;
            appender.flush()?;
        } else {
            stop.stop();
        }
        Ok(())
    };
    let stats = pipeline
        .follow_file(log.path(), &mut renderer, &stop)
        .unwrap();

    assert_eq!(calls, vec![Some(1), Some(2)]);
    // an empty read refreshes without adding records
    assert_eq!(stored, vec![1, 2]);
    assert_eq!(stats.records_appended, 2);
    assert_eq!(stats.refreshes, 2);
}

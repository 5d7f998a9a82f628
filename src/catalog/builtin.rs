//! Extractors for the GStreamer elements the grapher knows out of the box.
//!
//! Token positions count from the end of the line so that they survive the
//! variable-width prefix (thread, category, level) of the debug log format.

use crate::error::ExtractError;
use crate::extractor::{
    CompositeExtractor, ExtractorDefinition, FieldParse, FieldSpec, LineExtractor,
    TimestampRole, TokenRef, UnknownTime,
};

/// Fresh instances of every built-in group, each with its own stores
pub fn groups() -> Result<Vec<CompositeExtractor>, ExtractError> {
    Ok(vec![
        video_decoder()?,
        audio_decoder()?,
        base_sink()?,
        queue2()?,
        adaptive_demux()?,
        dash_demux()?,
    ])
}

fn tok(index: isize) -> TokenRef {
    TokenRef::at(index)
}

fn time(token: TokenRef) -> FieldParse {
    FieldParse::clock_time(token, UnknownTime::Fail)
}

fn time_or(token: TokenRef, default: f64) -> FieldParse {
    FieldParse::clock_time(token, UnknownTime::Default(default))
}

fn group<const N: usize>(
    name: &str,
    children: [(&str, ExtractorDefinition); N],
) -> Result<CompositeExtractor, ExtractError> {
    let children = children
        .into_iter()
        .map(|(sub, mut definition)| {
            definition.name = format!("{}.{}", name, sub);
            LineExtractor::new(definition).map(|extractor| (sub, extractor))
        })
        .collect::<Result<Vec<_>, _>>()?;
    CompositeExtractor::new(name, children)
}

fn video_decoder() -> Result<CompositeExtractor, ExtractError> {
    let pts_or_dts = |take| FieldParse::PtsOrDts {
        pts: tok(-7).strip_suffix(1),
        dts: tok(-5),
        default: 0.0,
        take,
    };
    group(
        "vdec",
        [
            (
                "chain",
                ExtractorDefinition::new("")
                    .include(["gst_video_decoder_chain", "PTS"])
                    .exclude(["reverse"])
                    .source_token(-10)
                    .field(
                        "pts",
                        FieldSpec::new("Input PTS", pts_or_dts(TimestampRole::Pts)).marker("x"),
                    )
                    .field(
                        "dts",
                        FieldSpec::new("Input DTS", pts_or_dts(TimestampRole::Dts)).marker("x"),
                    )
                    .field(
                        "size",
                        FieldSpec::new("Input buffer size", FieldParse::integer(tok(-1)))
                            .unit("bytes"),
                    ),
            ),
            (
                "push",
                ExtractorDefinition::new("")
                    .include(["gst_video_decoder_clip_and_push_buf", "pushing buffer "])
                    .source_token(-11)
                    .field(
                        "pts",
                        FieldSpec::new("Output PTS", time(tok(-3).strip_suffix(1))).marker("x"),
                    )
                    .field(
                        "size",
                        FieldSpec::new(
                            "Output buffer size",
                            FieldParse::integer(tok(-5).strip_suffix(1)),
                        ),
                    )
                    .field(
                        "duration",
                        FieldSpec::new("Output buffer duration", time_or(tok(-1), 0.0)),
                    ),
            ),
            (
                "qos",
                ExtractorDefinition::new("")
                    .include(["gst_video_decoder_src_event_default", "got QoS"])
                    .source_token(-6)
                    .field(
                        "runtime",
                        FieldSpec::new("QoS runtime", time(tok(-3).strip_suffix(1))),
                    )
                    .field(
                        "jitter",
                        FieldSpec::new("QoS Jitter", time(tok(-2).strip_suffix(1))),
                    )
                    .field("rate", FieldSpec::new("QoS rate", FieldParse::float(tok(-1)))),
            ),
            (
                "dropped",
                ExtractorDefinition::new("")
                    .include(["gst_video_decoder_clip_and_push", "dropping buffer"])
                    .source_token(-13)
                    .field(
                        "pts",
                        FieldSpec::new("Dropped PTS", time(tok(-8)))
                            .marker("o")
                            .linestyle(""),
                    ),
            ),
            (
                "qos_dropped",
                ExtractorDefinition::new("")
                    .include(["gst_video_decoder_clip_and_push", "Dropping frame"])
                    .source_token(-9)
                    .field(
                        "pts",
                        FieldSpec::new("Dropped PTS (QoS)", time(tok(-3).strip_prefix(6)))
                            .marker("o")
                            .linestyle(""),
                    ),
            ),
        ],
    )
}

fn audio_decoder() -> Result<CompositeExtractor, ExtractError> {
    group(
        "adec",
        [
            (
                "chain",
                ExtractorDefinition::new("")
                    .include(["audio_decoder_chain", "received buffer"])
                    .source_token(-11)
                    .field(
                        "pts",
                        FieldSpec::new("Input PTS", time_or(tok(-3).strip_suffix(1), 0.0)),
                    )
                    .field(
                        "size",
                        FieldSpec::new("Input buffer size", FieldParse::integer(tok(-6))),
                    )
                    .field(
                        "duration",
                        FieldSpec::new("Input buffer duration", time_or(tok(-1), 0.0)),
                    ),
            ),
            (
                "push",
                ExtractorDefinition::new("")
                    .include(["gst_audio_decoder_push_forward", "pushing buffer of size"])
                    .field(
                        "pts",
                        FieldSpec::new("Output PTS", time(tok(-3).strip_suffix(1))),
                    )
                    .field(
                        "size",
                        FieldSpec::new("Output buffer size", FieldParse::integer(tok(-6))),
                    ),
            ),
        ],
    )
}

fn base_sink() -> Result<CompositeExtractor, ExtractError> {
    group(
        "basesink",
        [
            (
                "chain",
                ExtractorDefinition::new("")
                    .include(["gst_base_sink_chain_unlocked", "got times"])
                    .source_token(-7)
                    .field(
                        "start",
                        FieldSpec::new("Input buffer start time", time(tok(-3).strip_suffix(1)))
                            .marker("x"),
                    )
                    .field(
                        "stop",
                        FieldSpec::new(
                            "Input buffer stop time",
                            FieldParse::clock_time(
                                tok(-1),
                                UnknownTime::Fallback("start".to_string()),
                            ),
                        ),
                    ),
            ),
            (
                "qos",
                ExtractorDefinition::new("")
                    .include(["base_sink_send_qos"])
                    .source_token(-10)
                    .field(
                        "proportion",
                        FieldSpec::new("Proportion", FieldParse::float(tok(-5).strip_suffix(1)))
                            .marker("o"),
                    )
                    .field(
                        "diff",
                        FieldSpec::new(
                            "Jitter",
                            FieldParse::Float {
                                token: tok(-3).strip_suffix(1),
                                scale: Some(1e-9),
                            },
                        )
                        .unit("s"),
                    )
                    .field("timestamp", FieldSpec::new("Timestamp", time_or(tok(-1), 0.0))),
            ),
            (
                "perform_qos",
                ExtractorDefinition::new("")
                    .include(["gst_base_sink_perform_qos", "entered", "pt", "jitter"])
                    .source_token(-14)
                    .field(
                        "pt",
                        FieldSpec::new("Processing Time", time_or(tok(-4).strip_suffix(1), 0.0)),
                    ),
            ),
            (
                "position",
                ExtractorDefinition::new("")
                    .include(["gst_base_sink_get_position", "res:"])
                    .source_token(-5)
                    .field(
                        "position",
                        FieldSpec::new("Current position", time_or(tok(-1), 0.0)),
                    ),
            ),
        ],
    )
}

fn queue2() -> Result<CompositeExtractor, ExtractError> {
    group(
        "queue2",
        [
            (
                "chain",
                ExtractorDefinition::new("")
                    .include(["gst_queue2_chain", "received buffer"])
                    .source_token(-11)
                    .field(
                        "size",
                        FieldSpec::new(
                            "Input buffer size",
                            FieldParse::integer(tok(-5).strip_suffix(1)),
                        ),
                    )
                    .field(
                        "pts",
                        FieldSpec::new("Input buffer PTS", time_or(tok(-3).strip_suffix(1), 0.0)),
                    )
                    .field(
                        "duration",
                        FieldSpec::new("Input buffer duration", time_or(tok(-1), 0.0)),
                    ),
            ),
            (
                "input_rate",
                ExtractorDefinition::new("")
                    .include(["update_in_rates"])
                    .exclude(["global period"])
                    .source_token(-6)
                    .field(
                        "rate",
                        FieldSpec::new(
                            "Average input rate",
                            FieldParse::float(tok(-3).strip_suffix(1)),
                        ),
                    ),
            ),
            (
                "time_level",
                ExtractorDefinition::new("")
                    .include(["update_time_level", "gstqueue2.c"])
                    .source_token(-5)
                    .field(
                        "sink_time",
                        FieldSpec::new("Incoming time", time_or(tok(-3).strip_suffix(1), 0.0)),
                    )
                    .field(
                        "src_time",
                        FieldSpec::new("Outgoing time", time_or(tok(-1), 0.0)),
                    )
                    .field(
                        "time_level",
                        FieldSpec::new(
                            "Time level",
                            FieldParse::Difference {
                                minuend: "sink_time".to_string(),
                                subtrahend: "src_time".to_string(),
                            },
                        ),
                    ),
            ),
        ],
    )
}

fn adaptive_demux() -> Result<CompositeExtractor, ExtractError> {
    group(
        "adaptivedemux",
        [
            (
                "chain",
                ExtractorDefinition::new("")
                    .include(["adaptivedemux.c", "_src_chain", "Received buffer of size"])
                    .source_token(-6)
                    .field(
                        "size",
                        FieldSpec::new("Downloaded buffer size", FieldParse::integer(tok(-1))),
                    ),
            ),
            (
                "chainfirstbuf",
                ExtractorDefinition::new("")
                    .include(["adaptivedemux.c", "_src_chain", "set fragment pts"])
                    .source_token(-4)
                    .field(
                        "pts",
                        FieldSpec::new(
                            "PTS of initial buffer",
                            time_or(tok(-1).split_after("="), 0.0),
                        )
                        .marker("x"),
                    ),
            ),
            (
                "bitrate",
                ExtractorDefinition::new("")
                    .include([
                        "gst_adaptive_demux_stream_update_current_bitrate",
                        "last fragment bitrate was",
                    ])
                    .field(
                        "bitrate",
                        FieldSpec::new("Last fragment bitrate", FieldParse::integer(tok(-1))),
                    ),
            ),
            (
                "position",
                ExtractorDefinition::new("")
                    .include([
                        "demux_stream_advance_fragment",
                        "segment_timestamp",
                        "earliest_position",
                    ])
                    .source_token(-3)
                    .field(
                        "position",
                        FieldSpec::new("Fragment position", time(tok(-2).strip_prefix(18)))
                            .marker("x"),
                    )
                    .field(
                        "deadline",
                        FieldSpec::new("QoS deadline (corrected)", time(tok(-1).strip_prefix(18))),
                    ),
            ),
            (
                "deadline",
                ExtractorDefinition::new("")
                    .include(["gst_adaptive_demux_src_event", "deadline", "proportion"])
                    .field("deadline", FieldSpec::new("QoS Deadline", time(tok(-2)))),
            ),
            (
                "stream_deadline",
                ExtractorDefinition::new("")
                    .include(["gst_adaptive_demux_src_event", "Earliest stream time"])
                    .field("deadline", FieldSpec::new("QoS Stream Deadline", time(tok(-1)))),
            ),
            (
                "request_latency",
                ExtractorDefinition::new("")
                    .include(["gstadaptivedemux.c", "_src_chain", "Request latency"])
                    .field("latency", FieldSpec::new("Request Latency", time(tok(-1)))),
            ),
            (
                "fragment_request_time",
                ExtractorDefinition::new("")
                    .include([
                        "gst_adaptive_demux_stream_download_fragment",
                        "Requested fragment timestamp",
                    ])
                    .source_token(-5)
                    .field(
                        "timestamp",
                        FieldSpec::new(
                            "Requested Timestamp",
                            FieldParse::clock_time(tok(-1), UnknownTime::Skip),
                        ),
                    ),
            ),
        ],
    )
}

fn dash_demux() -> Result<CompositeExtractor, ExtractError> {
    group(
        "dashdemux",
        [
            (
                "download_time",
                ExtractorDefinition::new("")
                    .include(["gstdashdemux.c", "advance_fragment", "Download time"])
                    .source_token(-5)
                    .field(
                        "download_time",
                        FieldSpec::new("Keyframe download time", time(tok(-3))).marker("o"),
                    )
                    .field(
                        "average",
                        FieldSpec::new("Average Keyframe download time", time(tok(-1))),
                    ),
            ),
            (
                "advance_position",
                ExtractorDefinition::new("")
                    .include([
                        "gstdashdemux.c",
                        "dash_demux_stream_advance_fragment",
                        "Actual position",
                    ])
                    .source_token(-4)
                    .field("position", FieldSpec::new("position", time(tok(-1)))),
            ),
            (
                "target_time",
                ExtractorDefinition::new("")
                    .include([
                        "gstdashdemux.c",
                        "dash_demux_stream_advance_fragment",
                        "target_time",
                    ])
                    .source_token(-3)
                    .field("target", FieldSpec::new("Target timestamp", time_or(tok(-1), 0.0))),
            ),
            (
                "get_target_time",
                ExtractorDefinition::new("")
                    .include(["gstdashdemux.c", "get_target_time", "diff", "average_download"])
                    .source_token(-7)
                    .field("diff", FieldSpec::new("difference vs qos time", time(tok(-3)))),
            ),
            (
                "fragment_position",
                ExtractorDefinition::new("")
                    .include(["gstdashdemux.c", "update_fragment_info", "Actual position"])
                    .source_token(-4)
                    .field(
                        "position",
                        FieldSpec::new("Fragment position", time(tok(-1)))
                            .linestyle("--")
                            .marker("o"),
                    ),
            ),
        ],
    )
}

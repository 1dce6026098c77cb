//! asciicast v1 and v2 codec.
//!
//! Reads both record formats into one uniform event stream and writes
//! v2. Reading is permissive (unknown header fields and unknown event
//! kinds are ignored); writing is strict (only documented fields are
//! emitted, header first, one event per line, flushed line by line).
//!
//! - v1 is a single JSON object: `{version:1, width, height, duration,
//!   stdout: [[dt, data], ...]}` with `dt` in delta seconds.
//! - v2 is one JSON header line followed by one JSON array per event:
//!   `[t, "o"|"i"|"r", data]` with `t` in absolute seconds.

use std::io::{self, Write};

use serde::Deserialize;
use svgcast_core::Theme;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CastError {
    #[error("unsupported cast version {0}")]
    UnsupportedVersion(u64),

    #[error("malformed cast header: {0}")]
    MalformedHeader(String),

    #[error("invalid cast geometry {cols}x{rows}")]
    InvalidGeometry { cols: i64, rows: i64 },

    #[error("invalid cast event on line {line}: {reason}")]
    InvalidEvent { line: usize, reason: String },

    #[error("cast I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Cast header: initial geometry plus optional metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: u8,
    pub cols: u16,
    pub rows: u16,
    pub timestamp: Option<u64>,
    pub idle_time_limit: Option<f64>,
    pub theme: Option<Theme>,
}

impl Header {
    pub fn new(cols: u16, rows: u16) -> Self {
        Header {
            version: 2,
            cols,
            rows,
            timestamp: None,
            idle_time_limit: None,
            theme: None,
        }
    }
}

/// Payload of a cast event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    Output(Vec<u8>),
    Input(Vec<u8>),
    Resize { cols: u16, rows: u16 },
}

/// One timestamped event; times are milliseconds from session start
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time_ms: u64,
    pub data: EventData,
}

/// A fully decoded cast
#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub header: Header,
    pub events: Vec<Event>,
}

#[derive(Deserialize)]
struct RawV2Header {
    version: u64,
    width: i64,
    height: i64,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    idle_time_limit: Option<f64>,
    #[serde(default)]
    theme: Option<RawTheme>,
}

#[derive(Deserialize)]
struct RawTheme {
    fg: String,
    bg: String,
    palette: String,
}

#[derive(Deserialize)]
struct RawV1Cast {
    version: u64,
    width: i64,
    height: i64,
    #[serde(default)]
    #[allow(dead_code)]
    duration: Option<f64>,
    stdout: Vec<(f64, String)>,
}

fn validate_geometry(cols: i64, rows: i64) -> Result<(u16, u16), CastError> {
    if cols < 1 || rows < 1 || cols > u16::MAX as i64 || rows > u16::MAX as i64 {
        return Err(CastError::InvalidGeometry { cols, rows });
    }
    Ok((cols as u16, rows as u16))
}

fn seconds_to_ms(t: f64) -> Option<u64> {
    if !t.is_finite() || t < 0.0 {
        return None;
    }
    Some((t * 1000.0).round() as u64)
}

/// Decode a cast from its full text, auto-detecting v1 versus v2.
pub fn parse_cast(input: &str) -> Result<Cast, CastError> {
    // v1 is one JSON document; a v2 file with events is not valid JSON as
    // a whole, so a whole-document parse distinguishes the two. A bare v2
    // header with no events also parses whole and is routed by version.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(input) {
        match value.get("version").and_then(|v| v.as_u64()) {
            Some(1) => return parse_v1(input),
            Some(2) => {
                let header = parse_v2_header(input.trim())?;
                return Ok(Cast {
                    header,
                    events: Vec::new(),
                });
            }
            Some(other) => return Err(CastError::UnsupportedVersion(other)),
            None => {
                return Err(CastError::MalformedHeader(
                    "missing version field".to_string(),
                ))
            }
        }
    }
    parse_v2(input)
}

fn parse_v1(input: &str) -> Result<Cast, CastError> {
    let raw: RawV1Cast =
        serde_json::from_str(input).map_err(|e| CastError::MalformedHeader(e.to_string()))?;
    if raw.version != 1 {
        return Err(CastError::UnsupportedVersion(raw.version));
    }
    let (cols, rows) = validate_geometry(raw.width, raw.height)?;

    let mut events = Vec::with_capacity(raw.stdout.len());
    let mut elapsed = 0.0f64;
    for (index, (dt, data)) in raw.stdout.into_iter().enumerate() {
        if !dt.is_finite() || dt < 0.0 {
            return Err(CastError::InvalidEvent {
                line: index + 1,
                reason: format!("negative or non-finite delay {}", dt),
            });
        }
        elapsed += dt;
        let time_ms = seconds_to_ms(elapsed).ok_or(CastError::InvalidEvent {
            line: index + 1,
            reason: "time overflow".to_string(),
        })?;
        events.push(Event {
            time_ms,
            data: EventData::Output(data.into_bytes()),
        });
    }

    Ok(Cast {
        header: Header {
            version: 1,
            cols,
            rows,
            timestamp: None,
            idle_time_limit: None,
            theme: None,
        },
        events,
    })
}

fn parse_v2_header(line: &str) -> Result<Header, CastError> {
    let raw: RawV2Header =
        serde_json::from_str(line).map_err(|e| CastError::MalformedHeader(e.to_string()))?;
    if raw.version != 2 {
        return Err(CastError::UnsupportedVersion(raw.version));
    }
    let (cols, rows) = validate_geometry(raw.width, raw.height)?;

    if let Some(limit) = raw.idle_time_limit {
        if !limit.is_finite() || limit < 0.0 {
            return Err(CastError::MalformedHeader(format!(
                "idle_time_limit must be non-negative, got {}",
                limit
            )));
        }
    }

    let theme = match raw.theme {
        Some(t) => Some(
            Theme::from_strings(&t.fg, &t.bg, &t.palette)
                .ok_or_else(|| CastError::MalformedHeader("invalid theme colors".to_string()))?,
        ),
        None => None,
    };

    Ok(Header {
        version: 2,
        cols,
        rows,
        timestamp: raw.timestamp.map(|t| t as u64),
        idle_time_limit: raw.idle_time_limit,
        theme,
    })
}

fn parse_v2(input: &str) -> Result<Cast, CastError> {
    let mut lines = input.lines().enumerate();
    let (_, header_line) = lines
        .next()
        .ok_or_else(|| CastError::MalformedHeader("empty cast".to_string()))?;
    let header = parse_v2_header(header_line)?;

    let mut events = Vec::new();
    let mut last_ms = 0u64;
    for (index, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;
        let (time, kind, payload): (f64, String, String) =
            serde_json::from_str(line).map_err(|e| CastError::InvalidEvent {
                line: line_no,
                reason: e.to_string(),
            })?;
        let mut time_ms = seconds_to_ms(time).ok_or(CastError::InvalidEvent {
            line: line_no,
            reason: format!("negative or non-finite time {}", time),
        })?;
        // The renderer assumes a non-decreasing clock; clamp stragglers
        if time_ms < last_ms {
            log::debug!(
                "event on line {} goes back in time ({}ms < {}ms), clamping",
                line_no,
                time_ms,
                last_ms
            );
            time_ms = last_ms;
        }
        last_ms = time_ms;

        let data = match kind.as_str() {
            "o" => EventData::Output(payload.into_bytes()),
            "i" => EventData::Input(payload.into_bytes()),
            "r" => {
                let (cols, rows) = parse_resize(&payload).ok_or(CastError::InvalidEvent {
                    line: line_no,
                    reason: format!("invalid resize payload {:?}", payload),
                })?;
                EventData::Resize { cols, rows }
            }
            other => {
                log::debug!("ignoring unknown event kind {:?} on line {}", other, line_no);
                continue;
            }
        };
        events.push(Event { time_ms, data });
    }

    Ok(Cast { header, events })
}

fn parse_resize(payload: &str) -> Option<(u16, u16)> {
    let (cols, rows) = payload.split_once('x')?;
    let cols: u16 = cols.parse().ok()?;
    let rows: u16 = rows.parse().ok()?;
    if cols == 0 || rows == 0 {
        return None;
    }
    Some((cols, rows))
}

fn header_to_json(header: &Header) -> String {
    let mut line = format!(
        "{{\"version\": 2, \"width\": {}, \"height\": {}",
        header.cols, header.rows
    );
    if let Some(ts) = header.timestamp {
        line.push_str(&format!(", \"timestamp\": {}", ts));
    }
    if let Some(limit) = header.idle_time_limit {
        line.push_str(&format!(", \"idle_time_limit\": {}", limit));
    }
    if let Some(theme) = &header.theme {
        let palette: Vec<String> = theme.palette.iter().map(|c| c.to_hex()).collect();
        line.push_str(&format!(
            ", \"theme\": {{\"fg\": \"{}\", \"bg\": \"{}\", \"palette\": \"{}\"}}",
            theme.foreground.to_hex(),
            theme.background.to_hex(),
            palette.join(":")
        ));
    }
    line.push('}');
    line
}

fn event_to_json(event: &Event) -> Option<String> {
    let (kind, data) = match &event.data {
        EventData::Output(bytes) => ("o", String::from_utf8_lossy(bytes).into_owned()),
        EventData::Input(bytes) => ("i", String::from_utf8_lossy(bytes).into_owned()),
        EventData::Resize { cols, rows } => ("r", format!("{}x{}", cols, rows)),
    };
    let escaped = serde_json::to_string(&data).ok()?;
    Some(format!(
        "[{:.6}, \"{}\", {}]",
        event.time_ms as f64 / 1000.0,
        kind,
        escaped
    ))
}

/// Encode a cast in v2 format
pub fn encode_cast(cast: &Cast) -> String {
    let mut out = header_to_json(&cast.header);
    out.push('\n');
    for event in &cast.events {
        if let Some(line) = event_to_json(event) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Streaming v2 writer: header first, one event per line, each line
/// flushed so a crash or SIGINT leaves a readable partial cast.
pub struct CastWriter<W: Write> {
    out: W,
}

impl<W: Write> CastWriter<W> {
    pub fn new(out: W) -> Self {
        CastWriter { out }
    }

    pub fn header(&mut self, header: &Header) -> io::Result<()> {
        writeln!(self.out, "{}", header_to_json(header))?;
        self.out.flush()
    }

    pub fn output(&mut self, time_ms: u64, data: &[u8]) -> io::Result<()> {
        self.event(time_ms, EventData::Output(data.to_vec()))
    }

    pub fn input(&mut self, time_ms: u64, data: &[u8]) -> io::Result<()> {
        self.event(time_ms, EventData::Input(data.to_vec()))
    }

    fn event(&mut self, time_ms: u64, data: EventData) -> io::Result<()> {
        let event = Event { time_ms, data };
        if let Some(line) = event_to_json(&event) {
            writeln!(self.out, "{}", line)?;
            self.out.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v2_basic() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24}\n[0.0, \"o\", \"hi\"]\n";
        let cast = parse_cast(input).unwrap();
        assert_eq!(cast.header.cols, 80);
        assert_eq!(cast.header.rows, 24);
        assert_eq!(cast.events.len(), 1);
        assert_eq!(cast.events[0].time_ms, 0);
        assert_eq!(cast.events[0].data, EventData::Output(b"hi".to_vec()));
    }

    #[test]
    fn test_parse_v2_header_only() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24}\n";
        let cast = parse_cast(input).unwrap();
        assert!(cast.events.is_empty());
    }

    #[test]
    fn test_parse_v2_unknown_fields_ignored() {
        let input =
            "{\"version\": 2, \"width\": 80, \"height\": 24, \"env\": {\"SHELL\": \"zsh\"}}\n[1.5, \"o\", \"x\"]\n";
        let cast = parse_cast(input).unwrap();
        assert_eq!(cast.events[0].time_ms, 1500);
    }

    #[test]
    fn test_parse_v2_input_and_resize() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24}\n\
                     [0.1, \"i\", \"ls\\n\"]\n\
                     [0.2, \"r\", \"100x30\"]\n";
        let cast = parse_cast(input).unwrap();
        assert_eq!(cast.events[0].data, EventData::Input(b"ls\n".to_vec()));
        assert_eq!(
            cast.events[1].data,
            EventData::Resize {
                cols: 100,
                rows: 30
            }
        );
    }

    #[test]
    fn test_parse_v2_theme() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24, \"theme\": {\"fg\": \"#aaaaaa\", \"bg\": \"#000000\", \"palette\": \"#000000:#cd0000:#00cd00:#cdcd00:#0000ee:#cd00cd:#00cdcd:#e5e5e5\"}}\n";
        let cast = parse_cast(input).unwrap();
        let theme = cast.header.theme.unwrap();
        assert_eq!(theme.palette.len(), 8);
    }

    #[test]
    fn test_parse_v1() {
        let input = "{\"version\": 1, \"width\": 80, \"height\": 24, \"duration\": 0.3, \
                     \"stdout\": [[0.1, \"a\"], [0.2, \"b\"]]}";
        let cast = parse_cast(input).unwrap();
        assert_eq!(cast.header.version, 1);
        assert_eq!(cast.events.len(), 2);
        // v1 delays are deltas, so the second event is at 100 + 200 ms
        assert_eq!(cast.events[0].time_ms, 100);
        assert_eq!(cast.events[1].time_ms, 300);
    }

    #[test]
    fn test_parse_v1_multiline() {
        let input = "{\n  \"version\": 1,\n  \"width\": 80,\n  \"height\": 24,\n  \"duration\": 0.1,\n  \"stdout\": [\n    [0.1, \"a\"]\n  ]\n}\n";
        let cast = parse_cast(input).unwrap();
        assert_eq!(cast.header.version, 1);
        assert_eq!(cast.events.len(), 1);
    }

    #[test]
    fn test_unknown_version() {
        let err = parse_cast("{\"version\": 5, \"width\": 80, \"height\": 24}").unwrap_err();
        assert!(matches!(err, CastError::UnsupportedVersion(5)));
    }

    #[test]
    fn test_invalid_geometry() {
        let err =
            parse_cast("{\"version\": 2, \"width\": 0, \"height\": 24}\n[0.0, \"o\", \"x\"]\n")
                .unwrap_err();
        assert!(matches!(err, CastError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_invalid_event_line() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24}\nnot json\n";
        let err = parse_cast(input).unwrap_err();
        assert!(matches!(err, CastError::InvalidEvent { line: 2, .. }));
    }

    #[test]
    fn test_negative_event_time() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24}\n[-1.0, \"o\", \"x\"]\n";
        let err = parse_cast(input).unwrap_err();
        assert!(matches!(err, CastError::InvalidEvent { line: 2, .. }));
    }

    #[test]
    fn test_decreasing_time_clamped() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24}\n\
                     [1.0, \"o\", \"a\"]\n[0.5, \"o\", \"b\"]\n";
        let cast = parse_cast(input).unwrap();
        assert_eq!(cast.events[0].time_ms, 1000);
        assert_eq!(cast.events[1].time_ms, 1000);
    }

    #[test]
    fn test_unknown_event_kind_skipped() {
        let input = "{\"version\": 2, \"width\": 80, \"height\": 24}\n\
                     [0.1, \"m\", \"marker\"]\n[0.2, \"o\", \"x\"]\n";
        let cast = parse_cast(input).unwrap();
        assert_eq!(cast.events.len(), 1);
        assert_eq!(cast.events[0].time_ms, 200);
    }

    #[test]
    fn test_roundtrip() {
        let cast = Cast {
            header: Header {
                version: 2,
                cols: 80,
                rows: 24,
                timestamp: Some(1700000000),
                idle_time_limit: Some(2.5),
                theme: None,
            },
            events: vec![
                Event {
                    time_ms: 0,
                    data: EventData::Output(b"hello \"world\"\n".to_vec()),
                },
                Event {
                    time_ms: 1234,
                    data: EventData::Input(b"q".to_vec()),
                },
            ],
        };
        let encoded = encode_cast(&cast);
        let decoded = parse_cast(&encoded).unwrap();
        assert_eq!(decoded, cast);
        // Canonical form is a fixed point
        assert_eq!(encode_cast(&decoded), encoded);
    }

    #[test]
    fn test_theme_roundtrip() {
        let theme = Theme::from_strings(
            "#aaaaaa",
            "#000000",
            "#000000:#cd0000:#00cd00:#cdcd00:#0000ee:#cd00cd:#00cdcd:#e5e5e5",
        )
        .unwrap();
        let cast = Cast {
            header: Header {
                theme: Some(theme),
                ..Header::new(80, 24)
            },
            events: Vec::new(),
        };
        let decoded = parse_cast(&encode_cast(&cast)).unwrap();
        assert_eq!(decoded.header.theme, cast.header.theme);
    }

    #[test]
    fn test_writer_lines() {
        let mut buf = Vec::new();
        {
            let mut writer = CastWriter::new(&mut buf);
            writer.header(&Header::new(80, 24)).unwrap();
            writer.output(100, b"hi").unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("{\"version\": 2"));
        assert_eq!(lines.next().unwrap(), "[0.100000, \"o\", \"hi\"]");
    }
}

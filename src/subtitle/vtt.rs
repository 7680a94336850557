//! WebVTT encoding/decoding. Grounded in the teacher's `VttFormatter`,
//! extended to operate on `project::Segment` and support bilingual cues and
//! round-trip parsing. Timestamp grammar differs from SRT only by the
//! decimal separator (`.` instead of `,`) and the `WEBVTT` file header.

use crate::project::{Project, Segment};

pub fn render(project: &Project, bilingual: bool) -> String {
    let mut output = String::from("WEBVTT\n\n");
    for seg in &project.segments {
        let text = cue_text(seg, bilingual);
        output.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_timestamp(seg.start_sec),
            format_timestamp(seg.end_sec),
            text
        ));
    }
    output
}

fn cue_text(seg: &Segment, bilingual: bool) -> String {
    match (bilingual, &seg.translated) {
        (true, Some(translated)) => format!("{}\n{}", seg.text, translated),
        _ => super::display_text(seg).to_string(),
    }
}

fn format_timestamp(total_secs: f64) -> String {
    let total_millis = (total_secs * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

fn parse_timestamp(s: &str) -> Option<f64> {
    let (hms, millis) = s.trim().split_once('.')?;
    let mut parts = hms.split(':');
    let a: f64 = parts.next()?.parse().ok()?;
    let b: f64 = parts.next()?.parse().ok()?;
    let c = parts.next();
    let millis: f64 = millis.parse().ok()?;
    // VTT allows an `MM:SS.mmm` short form with no hours component.
    match c {
        Some(c) => {
            let seconds: f64 = c.parse().ok()?;
            Some(a * 3600.0 + b * 60.0 + seconds + millis / 1000.0)
        }
        None => Some(a * 60.0 + b + millis / 1000.0),
    }
}

/// Parse a `.vtt` document back into bare `Segment`s, skipping the `WEBVTT`
/// header, any `NOTE` blocks, and cue identifier lines.
///
/// `bilingual` must agree with whatever `render` was called with when the
/// file was written: when `true`, a cue's first line becomes `text` and its
/// second line (if any) becomes `translated`, mirroring `cue_text`'s
/// `"{source}\n{translated}"` layout so write-then-read is idempotent. When
/// `false`, the whole cue body (all lines) is kept as `text`.
pub fn parse(content: &str, bilingual: bool) -> Vec<Segment> {
    let mut segments = Vec::new();
    let normalized = content.replace("\r\n", "\n");
    let mut blocks = normalized.split("\n\n").peekable();

    while let Some(block) = blocks.next() {
        let mut lines = block.lines();
        let mut line = match lines.next() {
            Some(l) => l.trim(),
            None => continue,
        };
        if line.is_empty() || line.starts_with("WEBVTT") || line.starts_with("NOTE") {
            continue;
        }

        // An identifier line (no `-->`) precedes the timing line.
        if !line.contains("-->") {
            line = match lines.next() {
                Some(l) => l,
                None => continue,
            };
        }

        let Some((start_str, rest)) = line.split_once("-->") else {
            continue;
        };
        let end_str = rest.split_whitespace().next().unwrap_or(rest);
        let (Some(start), Some(end)) = (parse_timestamp(start_str), parse_timestamp(end_str)) else {
            continue;
        };

        let body_lines: Vec<&str> = lines.collect();
        if body_lines.iter().all(|l| l.trim().is_empty()) {
            continue;
        }

        let (text, translated): (String, Option<String>) = if bilingual && body_lines.len() >= 2 {
            (body_lines[0].trim().to_string(), Some(body_lines[1..].join("\n")))
        } else {
            (body_lines.join("\n").trim().to_string(), None)
        };
        if text.is_empty() {
            continue;
        }

        if let Ok(mut seg) = Segment::new(start, end, text.as_str(), Vec::new()) {
            seg.translated = translated;
            segments.push(seg);
        }
    }

    segments
}

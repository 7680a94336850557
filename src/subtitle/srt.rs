//! SRT encoding/decoding. Grounded in the teacher's `SrtFormatter`, extended
//! to operate on `project::Segment` and to support bilingual cues and
//! round-trip parsing.

use crate::project::{Project, Segment};

/// Render `project`'s segments as SRT. In bilingual mode each cue carries the
/// source line followed by the translated line; a single blank line still
/// separates consecutive cues.
pub fn render(project: &Project, bilingual: bool) -> String {
    project
        .segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let text = cue_text(seg, bilingual);
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_timestamp(seg.start_sec),
                format_timestamp(seg.end_sec),
                text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
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
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

fn parse_timestamp(s: &str) -> Option<f64> {
    let (hms, millis) = s.trim().split_once(',')?;
    let mut parts = hms.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    let millis: f64 = millis.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

/// Parse an `.srt` document back into bare `Segment`s. Used by
/// `--proofread-only` to load an existing subtitle file as a `Project`.
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
        let first = match lines.next() {
            Some(l) => l.trim(),
            None => continue,
        };
        if first.is_empty() {
            continue;
        }

        let timing_line = if first.contains("-->") {
            first
        } else {
            match lines.next() {
                Some(l) => l,
                None => continue,
            }
        };

        let Some((start_str, end_str)) = timing_line.split_once("-->") else {
            continue;
        };
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

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_timestamp(3661.123), "01:01:01,123");
    }

    #[test]
    fn test_render_monolingual() {
        let mut project = Project::new("clip.mp4", now());
        project.segments.push(Segment::new(1.5, 4.0, "Hello, world!", vec![]).unwrap());
        let output = render(&project, false);
        assert!(output.contains("1\n00:00:01,500 --> 00:00:04,000\nHello, world!"));
    }

    #[test]
    fn test_render_bilingual_puts_source_before_translated() {
        let mut project = Project::new("clip.mp4", now());
        let mut seg = Segment::new(0.0, 1.0, "Hello", vec![]).unwrap();
        seg.translated = Some("Hola".to_string());
        project.segments.push(seg);
        let output = render(&project, true);
        assert!(output.contains("Hello\nHola"));
    }

    #[test]
    fn test_render_bilingual_falls_back_to_source_only_without_translation() {
        let mut project = Project::new("clip.mp4", now());
        project.segments.push(Segment::new(0.0, 1.0, "Hello", vec![]).unwrap());
        let output = render(&project, true);
        let parsed = parse(&output, true);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "Hello");
        assert_eq!(parsed[0].translated, None);
    }

    #[test]
    fn test_parse_bilingual_splits_source_and_translated() {
        let mut project = Project::new("clip.mp4", now());
        let mut seg = Segment::new(0.0, 1.0, "Hello", vec![]).unwrap();
        seg.translated = Some("Hola".to_string());
        project.segments.push(seg);

        let rendered = render(&project, true);
        let parsed = parse(&rendered, true);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "Hello");
        assert_eq!(parsed[0].translated.as_deref(), Some("Hola"));
    }

    #[test]
    fn test_parse_bilingual_roundtrip_is_idempotent() {
        let mut project = Project::new("clip.mp4", now());
        let mut seg1 = Segment::new(1.5, 4.0, "Hello, world!", vec![]).unwrap();
        seg1.translated = Some("Bonjour le monde !".to_string());
        let mut seg2 = Segment::new(4.5, 7.0, "This is a test.", vec![]).unwrap();
        seg2.translated = Some("Ceci est un test.".to_string());
        project.segments.push(seg1);
        project.segments.push(seg2);

        let rendered_once = render(&project, true);
        let parsed = parse(&rendered_once, true);

        let mut reparsed_project = Project::new("clip.mp4", now());
        reparsed_project.segments = parsed;
        let rendered_twice = render(&reparsed_project, true);

        assert_eq!(rendered_once, rendered_twice);
        assert_eq!(reparsed_project.segments[0].text, "Hello, world!");
        assert_eq!(
            reparsed_project.segments[0].translated.as_deref(),
            Some("Bonjour le monde !")
        );
        assert_eq!(reparsed_project.segments[1].text, "This is a test.");
        assert_eq!(
            reparsed_project.segments[1].translated.as_deref(),
            Some("Ceci est un test.")
        );
    }

    #[test]
    fn test_parse_roundtrips_rendered_output() {
        let mut project = Project::new("clip.mp4", now());
        project.segments.push(Segment::new(1.5, 4.0, "Hello, world!", vec![]).unwrap());
        project.segments.push(Segment::new(4.5, 7.0, "This is a test.", vec![]).unwrap());

        let rendered = render(&project, false);
        let parsed = parse(&rendered, false);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].text, "Hello, world!");
        assert!((parsed[0].start_sec - 1.5).abs() < 1e-6);
        assert!((parsed[0].end_sec - 4.0).abs() < 1e-6);
        assert_eq!(parsed[1].text, "This is a test.");
    }

    #[test]
    fn test_parse_multiline_cue_preserves_both_lines_when_not_bilingual() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\nHello\nHola\n";
        let parsed = parse(srt, false);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "Hello\nHola");
    }

    #[test]
    fn test_parse_ignores_malformed_blocks() {
        let srt = "not a cue at all\n\n1\n00:00:00,000 --> 00:00:01,000\nReal cue\n";
        let parsed = parse(srt, false);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "Real cue");
    }
}

//! ASS (Advanced SubStation Alpha) encoding (§4.6, new). Grounded in the
//! teacher's SRT/VTT formatter shape but built from scratch: this format
//! doesn't exist in the teacher, so the header section follows the standard
//! `[Script Info]` / `[V4+ Styles]` / `[Events]` layout and derives its two
//! `Style` lines from `StyleProfile` via `style::hex_to_ass`.

use crate::error::Result;
use crate::project::{Project, Segment};
use crate::style::StyleProfile;

const SCRIPT_TYPE: &str = "v4.00+";

pub fn render(project: &Project, bilingual: bool) -> Result<String> {
    project.style.validate()?;

    let mut out = String::new();
    out.push_str(&script_info(&project.style));
    out.push('\n');
    out.push_str(&styles_section(&project.style)?);
    out.push('\n');
    out.push_str("[Events]\n");
    out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    for seg in &project.segments {
        out.push_str(&dialogue_line(seg, bilingual));
    }

    Ok(out)
}

fn script_info(style: &StyleProfile) -> String {
    format!(
        "[Script Info]\n\
         ScriptType: {SCRIPT_TYPE}\n\
         PlayResX: {}\n\
         PlayResY: {}\n\
         WrapStyle: 0\n\
         ScaledBorderAndShadow: yes\n",
        style.play_res_x, style.play_res_y
    )
}

fn styles_section(style: &StyleProfile) -> Result<String> {
    let mut out = String::from("[V4+ Styles]\n");
    out.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
         Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
         Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    out.push_str(&style_line("Primary", &style.primary, style)?);
    out.push_str(&style_line("Secondary", &style.secondary, style)?);
    Ok(out)
}

fn style_line(name: &str, font: &crate::style::FontStyle, style: &StyleProfile) -> Result<String> {
    let primary_colour = crate::style::hex_to_ass(&font.primary_color)?;
    let outline_colour = crate::style::hex_to_ass(&font.outline_color)?;
    Ok(format!(
        "Style: {name},{font_name},{size},{primary_colour},&H000000FF,{outline_colour},&H00000000,\
         {bold},{italic},0,0,100,100,0,0,1,{outline},{shadow},{alignment},{margin_l},{margin_r},{margin_v},1\n",
        name = name,
        font_name = font.font_name,
        size = font.point_size as i32,
        primary_colour = primary_colour,
        outline_colour = outline_colour,
        bold = if font.bold { -1 } else { 0 },
        italic = if font.italic { -1 } else { 0 },
        outline = font.outline_width,
        shadow = font.shadow_width,
        alignment = style.alignment.ass_value(),
        margin_l = style.margin_left,
        margin_r = style.margin_right,
        margin_v = style.margin_vertical,
    ))
}

/// `{\rSecondary}source{\r}\Ntranslated` for bilingual cues: the source line
/// is rendered in the Secondary style via an inline override, then reset to
/// the Dialogue's own (Primary) style for the translated line.
fn dialogue_line(seg: &Segment, bilingual: bool) -> String {
    let text = match (bilingual, &seg.translated) {
        (true, Some(translated)) => format!("{{\\rSecondary}}{}{{\\r}}\\N{}", escape(&seg.text), escape(translated)),
        _ => escape(super::display_text(seg)),
    };
    format!(
        "Dialogue: 0,{},{},Primary,,0,0,0,,{}\n",
        format_timestamp(seg.start_sec),
        format_timestamp(seg.end_sec),
        text
    )
}

/// ASS text fields treat `\n`/`{`/`}` specially; line breaks become the
/// literal `\N` override and brace characters are escaped so source text
/// containing them can't be mistaken for an override block.
fn escape(text: &str) -> String {
    text.replace('{', "\\{").replace('}', "\\}").replace('\n', "\\N")
}

fn format_timestamp(total_secs: f64) -> String {
    let total_centis = (total_secs * 100.0).round() as u64;
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let seconds = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;
    format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StylePreset;

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1.5), "0:00:01.50");
        assert_eq!(format_timestamp(3661.23), "1:01:01.23");
    }

    #[test]
    fn test_render_contains_script_info_and_styles() {
        let mut project = Project::new("clip.mp4", now());
        project.segments.push(Segment::new(0.0, 1.0, "Hello", vec![]).unwrap());
        let output = render(&project, false).unwrap();
        assert!(output.contains("[Script Info]"));
        assert!(output.contains("[V4+ Styles]"));
        assert!(output.contains("Style: Primary,"));
        assert!(output.contains("Style: Secondary,"));
        assert!(output.contains("[Events]"));
        assert!(output.contains("Dialogue: 0,0:00:00.00,0:00:01.00,Primary,,0,0,0,,Hello"));
    }

    #[test]
    fn test_render_bilingual_uses_inline_style_override() {
        let mut project = Project::new("clip.mp4", now());
        let mut seg = Segment::new(0.0, 1.0, "Hello", vec![]).unwrap();
        seg.translated = Some("Hola".to_string());
        project.segments.push(seg);
        let output = render(&project, true).unwrap();
        assert!(output.contains("{\\rSecondary}Hello{\\r}\\NHola"));
    }

    #[test]
    fn test_render_escapes_braces_and_newlines() {
        let mut project = Project::new("clip.mp4", now());
        project.segments.push(Segment::new(0.0, 1.0, "a{b}\nc", vec![]).unwrap());
        let output = render(&project, false).unwrap();
        assert!(output.contains("a\\{b\\}\\Nc"));
    }

    #[test]
    fn test_render_uses_project_style_preset() {
        let mut project = Project::new("clip.mp4", now());
        project.style = StyleProfile::preset(StylePreset::Netflix);
        project.segments.push(Segment::new(0.0, 1.0, "Hello", vec![]).unwrap());
        let output = render(&project, false).unwrap();
        assert!(output.contains("Netflix Sans"));
    }
}

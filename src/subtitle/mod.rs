//! Subtitle Encoders (§4.6): render a `Project`'s segments into SRT, VTT or
//! ASS text, in either monolingual (translated only, or source only if
//! untranslated) or bilingual mode (source line first, translated line
//! second). `srt`/`vtt` also support round-trip parsing back into bare
//! segments, needed by `--proofread-only` to operate on a plain `.srt` file.

pub mod ass;
pub mod srt;
pub mod vtt;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::project::Project;

/// Render `project` to `format`, bilingual if `bilingual` is true and the
/// project has translations.
pub fn render(project: &Project, format: OutputFormat, bilingual: bool) -> Result<String> {
    match format {
        OutputFormat::Srt => Ok(srt::render(project, bilingual)),
        OutputFormat::Vtt => Ok(vtt::render(project, bilingual)),
        OutputFormat::Ass => ass::render(project, bilingual),
    }
}

/// Pick the text to display for one segment in monolingual mode: the
/// translation if present, otherwise the source text.
pub(crate) fn display_text(segment: &crate::project::Segment) -> &str {
    segment.translated.as_deref().unwrap_or(&segment.text)
}

//! Translation rules loading (§4.2.5): plain-text instructions loaded by
//! target language code, with exact > family > default fallback. The
//! language code is validated before it ever touches a path, so a malformed
//! or hostile `target_lang` can't be used to read files outside the rules
//! directory.

use crate::error::{Result, SubgenError};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

fn language_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,4})?$").unwrap())
}

/// Exposed for callers (the pipeline's `Run` entry point) that must reject a
/// malformed target language before any file or network I/O happens at all,
/// not just before the rules directory is touched.
pub fn validate_language_code(code: &str) -> Result<()> {
    if language_code_pattern().is_match(code) {
        Ok(())
    } else {
        Err(SubgenError::BadInput(format!(
            "invalid language code '{code}'"
        )))
    }
}

/// Resolve `<rules_dir>/<code>.md`, falling back to the language family file
/// and then `default.md`. Returns `Ok(None)` if none of the three exist.
fn resolve_rules_path(rules_dir: &Path, target_lang: &str) -> Result<Option<PathBuf>> {
    validate_language_code(target_lang)?;

    let exact = rules_dir.join(format!("{target_lang}.md"));
    if exact.is_file() {
        return Ok(Some(exact));
    }

    if let Some((family, _)) = target_lang.split_once('-') {
        let family_path = rules_dir.join(format!("{family}.md"));
        if family_path.is_file() {
            return Ok(Some(family_path));
        }
    }

    let default_path = rules_dir.join("default.md");
    if default_path.is_file() {
        return Ok(Some(default_path));
    }

    Ok(None)
}

/// Load the rules text for `target_lang`, or an empty string if no rules
/// file exists at any priority level.
pub fn load_rules(rules_dir: &Path, target_lang: &str) -> Result<String> {
    match resolve_rules_path(rules_dir, target_lang)? {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(String::new()),
    }
}

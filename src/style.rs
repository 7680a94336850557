//! Named subtitle style presets and hex-color <-> ASS-color conversion.
//!
//! `StyleProfile` is pure data; it stores hex colors and lets the ASS encoder
//! (`subtitle::ass`) derive the `&H..` color fields at export time, per the
//! "two colors are derived at export time" rule.

use crate::error::{Result, SubgenError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    Default,
    Netflix,
    Fansub,
    Minimal,
}

impl std::str::FromStr for StylePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(StylePreset::Default),
            "netflix" => Ok(StylePreset::Netflix),
            "fansub" => Ok(StylePreset::Fansub),
            "minimal" => Ok(StylePreset::Minimal),
            _ => Err(format!("unknown style preset: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontStyle {
    pub font_name: String,
    pub point_size: f32,
    pub primary_color: String,
    pub outline_color: String,
    pub outline_width: f32,
    pub shadow_width: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontStyle {
    pub fn validate(&self) -> Result<()> {
        if self.point_size <= 0.0 {
            return Err(SubgenError::InvalidProject(
                "font point_size must be > 0".to_string(),
            ));
        }
        if self.outline_width < 0.0 || self.shadow_width < 0.0 {
            return Err(SubgenError::InvalidProject(
                "outline/shadow width must be >= 0".to_string(),
            ));
        }
        hex_to_ass(&self.primary_color)?;
        hex_to_ass(&self.outline_color)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    BottomLeft,
    BottomCenter,
    BottomRight,
    TopCenter,
}

impl Alignment {
    /// ASS numpad-style `Alignment` value used in the `[V4+ Styles]` line.
    pub fn ass_value(&self) -> u8 {
        match self {
            Alignment::BottomLeft => 1,
            Alignment::BottomCenter => 2,
            Alignment::BottomRight => 3,
            Alignment::TopCenter => 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProfile {
    pub preset: StylePreset,
    pub primary: FontStyle,
    pub secondary: FontStyle,
    pub alignment: Alignment,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_vertical: u32,
    pub line_spacing: f32,
    pub play_res_x: u32,
    pub play_res_y: u32,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self::preset(StylePreset::Default)
    }
}

impl StyleProfile {
    pub fn preset(preset: StylePreset) -> Self {
        let base = FontStyle {
            font_name: "Arial".to_string(),
            point_size: 28.0,
            primary_color: "#FFFFFF".to_string(),
            outline_color: "#000000".to_string(),
            outline_width: 2.0,
            shadow_width: 0.0,
            bold: false,
            italic: false,
        };
        let secondary = FontStyle {
            primary_color: "#FFFF00".to_string(),
            point_size: 22.0,
            italic: true,
            ..base.clone()
        };

        match preset {
            StylePreset::Default => Self {
                preset,
                primary: base,
                secondary,
                alignment: Alignment::BottomCenter,
                margin_left: 20,
                margin_right: 20,
                margin_vertical: 24,
                line_spacing: 1.0,
                play_res_x: 1920,
                play_res_y: 1080,
            },
            StylePreset::Netflix => Self {
                preset,
                primary: FontStyle {
                    font_name: "Netflix Sans".to_string(),
                    point_size: 32.0,
                    bold: true,
                    ..base
                },
                secondary,
                alignment: Alignment::BottomCenter,
                margin_left: 40,
                margin_right: 40,
                margin_vertical: 40,
                line_spacing: 1.1,
                play_res_x: 1920,
                play_res_y: 1080,
            },
            StylePreset::Fansub => Self {
                preset,
                primary: FontStyle {
                    font_name: "Comic Sans MS".to_string(),
                    outline_width: 3.0,
                    shadow_width: 1.0,
                    ..base
                },
                secondary,
                alignment: Alignment::TopCenter,
                margin_left: 10,
                margin_right: 10,
                margin_vertical: 10,
                line_spacing: 1.0,
                play_res_x: 1280,
                play_res_y: 720,
            },
            StylePreset::Minimal => Self {
                preset,
                primary: FontStyle {
                    point_size: 24.0,
                    outline_width: 0.0,
                    ..base
                },
                secondary,
                alignment: Alignment::BottomCenter,
                margin_left: 20,
                margin_right: 20,
                margin_vertical: 16,
                line_spacing: 1.0,
                play_res_x: 1920,
                play_res_y: 1080,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.primary.validate()?;
        self.secondary.validate()?;
        Ok(())
    }
}

fn parse_hex_pair(s: &str, idx: usize) -> Result<u8> {
    u8::from_str_radix(&s[idx..idx + 2], 16)
        .map_err(|_| SubgenError::BadColor(s.to_string()))
}

/// `#RRGGBB` -> ASS `&H00BBGGRR`; `#AARRGGBB` -> ASS `&HAABBGGRR`.
pub fn hex_to_ass(hex: &str) -> Result<String> {
    let body = hex.strip_prefix('#').ok_or_else(|| SubgenError::BadColor(hex.to_string()))?;
    match body.len() {
        6 => {
            let r = parse_hex_pair(body, 0)?;
            let g = parse_hex_pair(body, 2)?;
            let b = parse_hex_pair(body, 4)?;
            Ok(format!("&H00{b:02X}{g:02X}{r:02X}"))
        }
        8 => {
            let a = parse_hex_pair(body, 0)?;
            let r = parse_hex_pair(body, 2)?;
            let g = parse_hex_pair(body, 4)?;
            let b = parse_hex_pair(body, 6)?;
            Ok(format!("&H{a:02X}{b:02X}{g:02X}{r:02X}"))
        }
        _ => Err(SubgenError::BadColor(hex.to_string())),
    }
}

/// Inverse of `hex_to_ass`. Accepts both the `&H00BBGGRR` and `&HAABBGGRR`
/// shapes and always returns the 8-digit `#AARRGGBB` form with `A=00` for
/// inputs that carried no alpha, so `ass_to_hex(hex_to_ass(c)) == c` holds
/// for 6-digit inputs once both sides are compared case-insensitively on the
/// RRGGBB tail.
pub fn ass_to_hex(ass: &str) -> Result<String> {
    let body = ass
        .strip_prefix("&H")
        .or_else(|| ass.strip_prefix("&h"))
        .ok_or_else(|| SubgenError::BadColor(ass.to_string()))?;
    let body = body.trim_end_matches('&');
    if body.len() != 8 {
        return Err(SubgenError::BadColor(ass.to_string()));
    }
    let a = parse_hex_pair(body, 0)?;
    let b = parse_hex_pair(body, 2)?;
    let g = parse_hex_pair(body, 4)?;
    let r = parse_hex_pair(body, 6)?;
    if a == 0 {
        Ok(format!("#{r:02X}{g:02X}{b:02X}"))
    } else {
        Ok(format!("#{a:02X}{r:02X}{g:02X}{b:02X}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_ass_rgb() {
        assert_eq!(hex_to_ass("#FF0000").unwrap(), "&H000000FF");
        assert_eq!(hex_to_ass("#00FF00").unwrap(), "&H0000FF00");
        assert_eq!(hex_to_ass("#0000FF").unwrap(), "&H00FF0000");
    }

    #[test]
    fn test_color_roundtrip_rgb() {
        for c in ["#FFFFFF", "#000000", "#1A2B3C", "#ABCDEF"] {
            let ass = hex_to_ass(c).unwrap();
            let back = ass_to_hex(&ass).unwrap();
            assert_eq!(back, c, "roundtrip failed for {c}");
        }
    }

    #[test]
    fn test_color_roundtrip_argb() {
        let c = "#80FF0000";
        let ass = hex_to_ass(c).unwrap();
        let back = ass_to_hex(&ass).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(hex_to_ass("FF0000").is_err());
        assert!(hex_to_ass("#ZZZZZZ").is_err());
        assert!(hex_to_ass("#FFF").is_err());
    }

    #[test]
    fn test_preset_validate() {
        for preset in [
            StylePreset::Default,
            StylePreset::Netflix,
            StylePreset::Fansub,
            StylePreset::Minimal,
        ] {
            assert!(StyleProfile::preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("netflix".parse::<StylePreset>().unwrap(), StylePreset::Netflix);
        assert!("bogus".parse::<StylePreset>().is_err());
    }
}

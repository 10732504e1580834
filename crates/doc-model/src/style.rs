//! Typography and color values for signature marks.
//!
//! Every type here validates on construction so that a `SignatureStyle`
//! can never hold a value the signing server would reject.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Font size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct FontSize(u16);

impl FontSize {
    pub const MAX: FontSize = FontSize(144);
    pub const DEFAULT: FontSize = FontSize(16);

    /// Zero is rejected, anything above [`FontSize::MAX`] is clamped.
    pub fn new(value: u16) -> Result<Self, ModelError> {
        if value == 0 {
            return Err(ModelError::InvalidFontSize(value.to_string()));
        }

        Ok(Self(value.min(Self::MAX.0)))
    }

    /// Parse raw text from a numeric input field.
    ///
    /// Fractional input is rounded. Empty, non-numeric, non-finite and
    /// non-positive input is rejected instead of being coerced to zero.
    pub fn parse_input(raw: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidFontSize(raw.to_owned());
        let value: f64 = raw.trim().parse().map_err(|_| invalid())?;

        if !value.is_finite() || value.round() < 1.0 {
            return Err(invalid());
        }

        Ok(Self(value.round().min(f64::from(Self::MAX.0)) as u16))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u16> for FontSize {
    type Error = ModelError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FontSize> for u16 {
    fn from(size: FontSize) -> Self {
        size.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
    Bolder,
    Lighter,
}

impl FontWeight {
    pub const ALL: [FontWeight; 4] =
        [FontWeight::Normal, FontWeight::Bold, FontWeight::Bolder, FontWeight::Lighter];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
            Self::Bolder => "bolder",
            Self::Lighter => "lighter",
        }
    }
}

impl FromStr for FontWeight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|weight| weight.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown font weight '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub const ALL: [FontStyle; 3] = [FontStyle::Normal, FontStyle::Italic, FontStyle::Oblique];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
            Self::Oblique => "oblique",
        }
    }
}

impl FromStr for FontStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown font style '{s}'"))
    }
}

/// Font family offered by the style panel, or free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FontFamily {
    #[default]
    Arial,
    Georgia,
    CourierNew,
    TimesNewRoman,
    Verdana,
    Cursive,
    Monospace,
    LucidaConsole,
    Fantasy,
    Custom(String),
}

impl FontFamily {
    /// The fixed choices, in panel order.
    pub const BUILT_IN: [FontFamily; 9] = [
        FontFamily::Arial,
        FontFamily::Georgia,
        FontFamily::CourierNew,
        FontFamily::TimesNewRoman,
        FontFamily::Verdana,
        FontFamily::Cursive,
        FontFamily::Monospace,
        FontFamily::LucidaConsole,
        FontFamily::Fantasy,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Arial => "Arial",
            Self::Georgia => "Georgia",
            Self::CourierNew => "Courier New",
            Self::TimesNewRoman => "Times New Roman",
            Self::Verdana => "Verdana",
            Self::Cursive => "Cursive",
            Self::Monospace => "Monospace",
            Self::LucidaConsole => "Lucida Console",
            Self::Fantasy => "Fantasy",
            Self::Custom(name) => name,
        }
    }

    pub fn is_built_in(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<String> for FontFamily {
    fn from(name: String) -> Self {
        let trimmed = name.trim();
        Self::BUILT_IN
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(trimmed))
            .unwrap_or(Self::Custom(name))
    }
}

impl From<&str> for FontFamily {
    fn from(name: &str) -> Self {
        Self::from(name.to_owned())
    }
}

impl From<FontFamily> for String {
    fn from(family: FontFamily) -> Self {
        match family {
            FontFamily::Custom(name) => name,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    /// Translucent green used behind a mark while it is being edited.
    pub const HIGHLIGHT: Color = Color { r: 0, g: 255, b: 0, a: 0x55 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn parse_hex(input: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidColor(input.to_owned());
        let digits = input.trim().trim_start_matches('#');

        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(invalid());
        }

        let channel = |index: usize| {
            u8::from_str_radix(&digits[index * 2..index * 2 + 2], 16).map_err(|_| invalid())
        };

        let a = if digits.len() == 8 { channel(3)? } else { 255 };
        Ok(Self { r: channel(0)?, g: channel(1)?, b: channel(2)?, a })
    }

    /// `#rrggbb` when opaque, `#rrggbbaa` otherwise.
    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
}

/// Foreground color of a signature mark. Always opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TextColor(Color);

impl TextColor {
    pub const BLACK: TextColor = TextColor(Color::BLACK);

    /// Only the 6-digit form is accepted; alpha is not part of the wire format.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let color = Color::parse_hex(input)?;
        if input.trim().trim_start_matches('#').len() != 6 {
            return Err(ModelError::InvalidColor(input.to_owned()));
        }
        Ok(Self(color))
    }

    pub fn color(&self) -> Color {
        self.0
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<TextColor> for String {
    fn from(color: TextColor) -> Self {
        color.0.to_hex()
    }
}

impl TryFrom<String> for TextColor {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

pub const DEFAULT_SIGNATURE_TEXT: &str = "Signature";
pub const RECIPIENT_SIGNATURE_TEXT: &str = "Signed by Recipient";

/// Persisted typography of one signature mark.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureStyle {
    pub text: String,
    pub font_size: FontSize,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub underline: bool,
    pub font_family: FontFamily,
    pub color: TextColor,
}

impl SignatureStyle {
    /// Default mark a guest recipient starts from.
    pub fn recipient() -> Self {
        Self {
            text: RECIPIENT_SIGNATURE_TEXT.to_owned(),
            font_size: FontSize(18),
            font_weight: FontWeight::Bold,
            font_style: FontStyle::Italic,
            underline: false,
            font_family: FontFamily::Cursive,
            color: TextColor::BLACK,
        }
    }

    /// Fixed mark used when the guest does no placement at all.
    pub fn minimal_recipient() -> Self {
        Self { font_size: FontSize::DEFAULT, ..Self::recipient() }
    }
}

impl Default for SignatureStyle {
    fn default() -> Self {
        Self {
            text: DEFAULT_SIGNATURE_TEXT.to_owned(),
            font_size: FontSize::DEFAULT,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            underline: false,
            font_family: FontFamily::Arial,
            color: TextColor::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_input_rejects_garbage_and_clamps_large_values() {
        assert_eq!(FontSize::parse_input("24").unwrap().get(), 24);
        assert_eq!(FontSize::parse_input(" 17.6 ").unwrap().get(), 18);
        assert_eq!(FontSize::parse_input("9000").unwrap(), FontSize::MAX);

        assert!(FontSize::parse_input("").is_err());
        assert!(FontSize::parse_input("abc").is_err());
        assert!(FontSize::parse_input("0").is_err());
        assert!(FontSize::parse_input("-4").is_err());
        assert!(FontSize::parse_input("NaN").is_err());
    }

    #[test]
    fn font_size_zero_is_rejected() {
        assert!(FontSize::new(0).is_err());
        assert_eq!(FontSize::new(500).unwrap(), FontSize::MAX);
    }

    #[test]
    fn font_family_recognizes_built_ins_case_insensitively() {
        assert_eq!(FontFamily::from("courier new"), FontFamily::CourierNew);
        assert_eq!(FontFamily::from("Cursive"), FontFamily::Cursive);
        assert_eq!(
            FontFamily::from("Brush Script MT"),
            FontFamily::Custom("Brush Script MT".to_owned())
        );
        assert_eq!(String::from(FontFamily::TimesNewRoman), "Times New Roman");
    }

    #[test]
    fn color_parses_rgb_and_rgba() {
        assert_eq!(Color::parse_hex("#ff8000").unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(Color::parse_hex("00ff0055").unwrap(), Color::HIGHLIGHT);
        assert_eq!(Color::HIGHLIGHT.to_hex(), "#00ff0055");
        assert!(Color::parse_hex("#fff").is_err());
        assert!(Color::parse_hex("#gg0000").is_err());
    }

    #[test]
    fn text_color_rejects_alpha() {
        assert_eq!(TextColor::parse("#1A2b3C").unwrap().to_string(), "#1a2b3c");
        assert!(TextColor::parse("#00000080").is_err());
    }

    #[test]
    fn style_serializes_as_wire_strings() {
        let json = serde_json::to_value(FontWeight::Bolder).unwrap();
        assert_eq!(json, "bolder");

        let json = serde_json::to_value(FontFamily::LucidaConsole).unwrap();
        assert_eq!(json, "Lucida Console");

        let size: FontSize = serde_json::from_str("20").unwrap();
        assert_eq!(size.get(), 20);
        assert!(serde_json::from_str::<FontSize>("0").is_err());
    }

    #[test]
    fn recipient_presets_differ_only_in_size() {
        let interactive = SignatureStyle::recipient();
        let minimal = SignatureStyle::minimal_recipient();

        assert_eq!(interactive.font_size.get(), 18);
        assert_eq!(minimal.font_size.get(), 16);
        assert_eq!(minimal.font_family, FontFamily::Cursive);
        assert_eq!(minimal.text, RECIPIENT_SIGNATURE_TEXT);
    }
}

//! Style configuration and the resolver that turns it into paint instructions.
//!
//! `StyleConfig` is what the user edits: the outer card background, the
//! optional inner text panel background and the box metrics. [`resolve`]
//! maps a config plus the light/dark mode to concrete paints and the text
//! color. It is pure: the same inputs always produce the same output.

use crate::Mode;
use serde::{Deserialize, Serialize};

/// Text color used on dark backgrounds
pub const WHITE: &str = "#ffffff";
/// Text color used on light backgrounds
pub const BLACK: &str = "#000000";

/// Brightness threshold in luma units. Strictly brighter selects black text.
pub const BRIGHTNESS_THRESHOLD: u32 = 128;

const FALLBACK_PRESET_COLOR: &str = "#3b82f6";

/// One of the eight fixed gradient directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GradientDirection {
    #[default]
    #[serde(rename = "to-r")]
    ToRight,
    #[serde(rename = "to-l")]
    ToLeft,
    #[serde(rename = "to-t")]
    ToTop,
    #[serde(rename = "to-b")]
    ToBottom,
    #[serde(rename = "to-br")]
    ToBottomRight,
    #[serde(rename = "to-tr")]
    ToTopRight,
    #[serde(rename = "to-bl")]
    ToBottomLeft,
    #[serde(rename = "to-tl")]
    ToTopLeft,
}

impl GradientDirection {
    /// Parse the short token used in configs and Tailwind classes (`to-br`)
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "to-r" => Self::ToRight,
            "to-l" => Self::ToLeft,
            "to-t" => Self::ToTop,
            "to-b" => Self::ToBottom,
            "to-br" => Self::ToBottomRight,
            "to-tr" => Self::ToTopRight,
            "to-bl" => Self::ToBottomLeft,
            "to-tl" => Self::ToTopLeft,
            _ => return None,
        })
    }

    pub fn css(self) -> &'static str {
        match self {
            Self::ToRight => "to right",
            Self::ToLeft => "to left",
            Self::ToTop => "to top",
            Self::ToBottom => "to bottom",
            Self::ToBottomRight => "to bottom right",
            Self::ToTopRight => "to top right",
            Self::ToBottomLeft => "to bottom left",
            Self::ToTopLeft => "to top left",
        }
    }

    /// CSS angle in degrees: 0 points up, angles grow clockwise.
    pub fn angle_deg(self) -> f32 {
        match self {
            Self::ToTop => 0.0,
            Self::ToTopRight => 45.0,
            Self::ToRight => 90.0,
            Self::ToBottomRight => 135.0,
            Self::ToBottom => 180.0,
            Self::ToBottomLeft => 225.0,
            Self::ToLeft => 270.0,
            Self::ToTopLeft => 315.0,
        }
    }
}

/// Two-stop custom gradient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gradient {
    pub from: String,
    pub to: String,
    pub direction: GradientDirection,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            from: "#3b82f6".to_string(),
            to: "#9333ea".to_string(),
            direction: GradientDirection::ToRight,
        }
    }
}

/// Paint for a surface: a named preset or a custom gradient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Background {
    Preset { preset: String },
    Custom {
        #[serde(default)]
        gradient: Gradient,
    },
}

impl Default for Background {
    fn default() -> Self {
        Background::Preset {
            preset: "bg-gradient-to-r from-blue-500 to-purple-600".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBackground {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub paint: Background,
}

impl Default for TextBackground {
    fn default() -> Self {
        Self {
            enabled: false,
            paint: Background::Preset {
                preset: "bg-gradient-to-r from-blue-100 to-purple-200".to_string(),
            },
        }
    }
}

/// Box-model parameters of the text panel, in CSS pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub width: u32,
    pub padding: u32,
    pub margin: u32,
    pub font_size: u32,
    #[serde(alias = "spacing")]
    pub line_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 800,
            padding: 40,
            margin: 20,
            font_size: 16,
            line_spacing: 1.5,
        }
    }
}

/// The user's visual configuration
///
/// # Examples
///
/// ```
/// let cfg: markpic::StyleConfig = serde_json::from_str(
///     r#"{"background":{"type":"custom"},"layout":{"width":600,"spacing":1.8}}"#,
/// ).unwrap();
/// assert_eq!(cfg.layout.width, 600);
/// assert_eq!(cfg.layout.line_spacing, 1.8);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    pub background: Background,
    pub text_background: TextBackground,
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub angle_deg: f32,
    pub from: String,
    pub to: String,
}

/// A concrete paint instruction for a rectangle
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    /// Named preset token (Tailwind class vocabulary)
    Preset(String),
    Linear(LinearGradient),
    Solid { color: String, alpha: f32 },
}

/// A paint with every color resolved to RGBA
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Rgba),
    Linear { angle_deg: f32, from: Rgba, to: Rgba },
}

impl Paint {
    fn from_background(bg: &Background) -> Self {
        match bg {
            Background::Preset { preset } => Paint::Preset(preset.clone()),
            Background::Custom { gradient } => Paint::Linear(LinearGradient {
                angle_deg: gradient.direction.angle_deg(),
                from: gradient.from.clone(),
                to: gradient.to.clone(),
            }),
        }
    }

    /// CSS value for an inline `background` declaration. Presets are carried as
    /// class tokens instead and return `None`.
    pub fn to_css(&self) -> Option<String> {
        match self {
            Paint::Preset(_) => None,
            Paint::Linear(g) => Some(format!(
                "linear-gradient({}deg, {}, {})",
                g.angle_deg, g.from, g.to
            )),
            Paint::Solid { color, alpha } => {
                let c = Rgba::parse(color)?;
                Some(format!("rgba({}, {}, {}, {})", c.r, c.g, c.b, alpha))
            }
        }
    }

    /// Parse an inline `background` value produced by [`Paint::to_css`] or a
    /// plain color.
    pub fn from_css(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(inner) = value
            .strip_prefix("linear-gradient(")
            .and_then(|s| s.strip_suffix(')'))
        {
            let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return None;
            }
            let angle_deg = match parts[0].strip_suffix("deg") {
                Some(deg) => deg.trim().parse::<f32>().ok()?,
                None => {
                    let token = parts[0].replace(' ', "-");
                    direction_from_phrase(&token)?.angle_deg()
                }
            };
            return Some(Paint::Linear(LinearGradient {
                angle_deg,
                from: parts[1].to_string(),
                to: parts[2].to_string(),
            }));
        }
        let c = Rgba::parse(value)?;
        Some(Paint::Solid {
            color: c.hex(),
            alpha: c.a as f32 / 255.0,
        })
    }

    /// Resolve presets and color strings. `None` when nothing paintable remains.
    pub fn fill(&self) -> Option<Fill> {
        match self {
            Paint::Preset(token) => preset_fill(token),
            Paint::Linear(g) => Some(Fill::Linear {
                angle_deg: g.angle_deg,
                from: Rgba::parse(&g.from)?,
                to: Rgba::parse(&g.to)?,
            }),
            Paint::Solid { color, alpha } => {
                let mut c = Rgba::parse(color)?;
                c.a = (alpha.clamp(0.0, 1.0) * c.a as f32).round() as u8;
                Some(Fill::Solid(c))
            }
        }
    }
}

fn direction_from_phrase(token: &str) -> Option<GradientDirection> {
    match token {
        "to-right" => Some(GradientDirection::ToRight),
        "to-left" => Some(GradientDirection::ToLeft),
        "to-top" => Some(GradientDirection::ToTop),
        "to-bottom" => Some(GradientDirection::ToBottom),
        "to-bottom-right" => Some(GradientDirection::ToBottomRight),
        "to-top-right" => Some(GradientDirection::ToTopRight),
        "to-bottom-left" => Some(GradientDirection::ToBottomLeft),
        "to-top-left" => Some(GradientDirection::ToTopLeft),
        _ => None,
    }
}

/// Resolve a Tailwind-style class list into a fill.
///
/// Understands `bg-gradient-<dir> from-<c> to-<c>` and `bg-<c>[/<alpha>]`.
pub fn preset_fill(classes: &str) -> Option<Fill> {
    let mut direction = None;
    let mut from = None;
    let mut to = None;
    let mut solid = None;
    for class in classes.split_whitespace() {
        if let Some(dir) = class.strip_prefix("bg-gradient-") {
            direction = GradientDirection::from_token(dir);
        } else if let Some(c) = class.strip_prefix("from-") {
            from = palette_color(c);
        } else if let Some(c) = class.strip_prefix("to-") {
            to = palette_color(c);
        } else if let Some(c) = class.strip_prefix("bg-") {
            solid = palette_color(c).or(solid);
        }
    }
    match (direction, from, to) {
        (Some(d), Some(from), to) => Some(Fill::Linear {
            angle_deg: d.angle_deg(),
            from,
            to: to.unwrap_or(from),
        }),
        _ => solid.map(Fill::Solid),
    }
}

/// Look up `blue-500`, `white`, `gray-800/95` in the palette
fn palette_color(name: &str) -> Option<Rgba> {
    let (name, alpha) = match name.split_once('/') {
        Some((n, a)) => (n, a.parse::<u32>().ok()?.min(100)),
        None => (name, 100),
    };
    let hex = match name {
        "white" => "#ffffff",
        "black" => "#000000",
        _ => TAILWIND_PALETTE
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)?,
    };
    let mut c = Rgba::parse(hex)?;
    c.a = ((alpha * 255 + 50) / 100) as u8;
    Some(c)
}

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`/`rgba()` and a few keywords.
    pub fn parse(text: &str) -> Option<Self> {
        let s = text.trim().to_ascii_lowercase();
        match s.as_str() {
            "transparent" => return Some(Self { r: 0, g: 0, b: 0, a: 0 }),
            "white" => return Some(Self::rgb(255, 255, 255)),
            "black" => return Some(Self::rgb(0, 0, 0)),
            _ => {}
        }
        if let Some(hex) = s.strip_prefix('#') {
            let bytes = hex.as_bytes();
            let h1 = |i: usize| -> Option<u8> {
                let v = (bytes[i] as char).to_digit(16)? as u8;
                Some((v << 4) | v)
            };
            let h2 = |i: usize| -> Option<u8> { u8::from_str_radix(hex.get(i..i + 2)?, 16).ok() };
            return match bytes.len() {
                3 => Some(Self::rgb(h1(0)?, h1(1)?, h1(2)?)),
                6 => Some(Self::rgb(h2(0)?, h2(2)?, h2(4)?)),
                8 => Some(Self { r: h2(0)?, g: h2(2)?, b: h2(4)?, a: h2(6)? }),
                _ => None,
            };
        }
        let inner = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let channel = |p: &str| p.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
        let a = match parts.get(3) {
            Some(p) => (p.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
            None => 255,
        };
        Some(Self { r: channel(parts[0])?, g: channel(parts[1])?, b: channel(parts[2])?, a })
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Opacity in `0.0..=1.0`
    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Luma in thousandths (0.299R + 0.587G + 0.114B, scaled by 1000)
    fn luma_milli(&self) -> u32 {
        299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32
    }
}

/// Perceptual brightness of a hex color in `0.0..=255.0`.
///
/// Unparsable colors count as black.
pub fn brightness(color: &str) -> f32 {
    luma_milli(color) as f32 / 1000.0
}

fn luma_milli(color: &str) -> u32 {
    Rgba::parse(color).map(|c| c.luma_milli()).unwrap_or(0)
}

/// Black text on bright backgrounds, white otherwise. Exactly 128 is white.
pub fn text_color_for_background(color: &str) -> &'static str {
    pick_text_color(luma_milli(color))
}

fn pick_text_color(luma_milli: u32) -> &'static str {
    if luma_milli > BRIGHTNESS_THRESHOLD * 1000 {
        BLACK
    } else {
        WHITE
    }
}

/// Representative color of a preset: its `from-<color>` stop
pub fn extract_main_color(preset: &str) -> String {
    preset
        .split_whitespace()
        .find_map(|class| class.strip_prefix("from-"))
        .and_then(|name| {
            TAILWIND_PALETTE
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
        .unwrap_or_else(|| FALLBACK_PRESET_COLOR.to_string())
}

/// Presets built from the 100..300 shades
fn is_light_preset(preset: &str) -> bool {
    ["-100", "-200", "-300"].iter().any(|shade| preset.contains(shade))
}

/// Box metrics of the text panel
#[derive(Debug, Clone, PartialEq)]
pub struct BoxMetrics {
    pub width: u32,
    pub padding: u32,
    pub margin: u32,
    pub font_size: u32,
    pub line_height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub background: Paint,
    pub text_color: &'static str,
    pub text_background: Paint,
    pub metrics: BoxMetrics,
}

/// Map a config and the current mode to concrete paint instructions
pub fn resolve(config: &StyleConfig, mode: Mode) -> ResolvedStyle {
    ResolvedStyle {
        background: Paint::from_background(&config.background),
        text_color: text_color(config, mode),
        text_background: text_background(config, mode),
        metrics: BoxMetrics {
            width: config.layout.width,
            padding: config.layout.padding,
            margin: config.layout.margin,
            font_size: config.layout.font_size,
            line_height: config.layout.line_spacing,
        },
    }
}

fn text_color(config: &StyleConfig, mode: Mode) -> &'static str {
    let tb = &config.text_background;
    if !tb.enabled {
        return if mode.is_dark() { WHITE } else { BLACK };
    }
    match &tb.paint {
        Background::Preset { preset } => {
            if mode.is_dark() && is_light_preset(preset) {
                return WHITE;
            }
            text_color_for_background(&extract_main_color(preset))
        }
        Background::Custom { gradient } => {
            let sum = luma_milli(&gradient.from) + luma_milli(&gradient.to);
            // average > 128  <=>  sum > 256
            if sum > 2 * BRIGHTNESS_THRESHOLD * 1000 {
                BLACK
            } else {
                WHITE
            }
        }
    }
}

fn text_background(config: &StyleConfig, mode: Mode) -> Paint {
    let tb = &config.text_background;
    if !tb.enabled {
        let color = if mode.is_dark() { "#1f2937" } else { "#ffffff" };
        return Paint::Solid { color: color.to_string(), alpha: 0.95 };
    }
    match &tb.paint {
        Background::Preset { preset } if mode.is_dark() && is_light_preset(preset) => {
            Paint::Preset("bg-blue-200/30".to_string())
        }
        other => Paint::from_background(other),
    }
}

/// Tailwind v3 palette shades 100..900 for the families the presets use
pub static TAILWIND_PALETTE: &[(&str, &str)] = &[
    ("blue-100", "#dbeafe"), ("blue-200", "#bfdbfe"), ("blue-300", "#93c5fd"), ("blue-400", "#60a5fa"), ("blue-500", "#3b82f6"),
    ("blue-600", "#2563eb"), ("blue-700", "#1d4ed8"), ("blue-800", "#1e40af"), ("blue-900", "#1e3a8a"),
    ("green-100", "#dcfce7"), ("green-200", "#bbf7d0"), ("green-300", "#86efac"), ("green-400", "#4ade80"), ("green-500", "#22c55e"),
    ("green-600", "#16a34a"), ("green-700", "#15803d"), ("green-800", "#166534"), ("green-900", "#14532d"),
    ("red-100", "#fee2e2"), ("red-200", "#fecaca"), ("red-300", "#fca5a5"), ("red-400", "#f87171"), ("red-500", "#ef4444"),
    ("red-600", "#dc2626"), ("red-700", "#b91c1c"), ("red-800", "#991b1b"), ("red-900", "#7f1d1d"),
    ("yellow-100", "#fef9c3"), ("yellow-200", "#fef08a"), ("yellow-300", "#fde047"), ("yellow-400", "#facc15"), ("yellow-500", "#eab308"),
    ("yellow-600", "#ca8a04"), ("yellow-700", "#a16207"), ("yellow-800", "#854d0e"), ("yellow-900", "#713f12"),
    ("purple-100", "#f3e8ff"), ("purple-200", "#e9d5ff"), ("purple-300", "#d8b4fe"), ("purple-400", "#c084fc"), ("purple-500", "#a855f7"),
    ("purple-600", "#9333ea"), ("purple-700", "#7e22ce"), ("purple-800", "#6b21a8"), ("purple-900", "#581c87"),
    ("pink-100", "#fce7f3"), ("pink-200", "#fbcfe8"), ("pink-300", "#f9a8d4"), ("pink-400", "#f472b6"), ("pink-500", "#ec4899"),
    ("pink-600", "#db2777"), ("pink-700", "#be185d"), ("pink-800", "#9d174d"), ("pink-900", "#831843"),
    ("gray-100", "#f3f4f6"), ("gray-200", "#e5e7eb"), ("gray-300", "#d1d5db"), ("gray-400", "#9ca3af"), ("gray-500", "#6b7280"),
    ("gray-600", "#4b5563"), ("gray-700", "#374151"), ("gray-800", "#1f2937"), ("gray-900", "#111827"),
    ("cyan-100", "#cffafe"), ("cyan-200", "#a5f3fc"), ("cyan-300", "#67e8f9"), ("cyan-400", "#22d3ee"), ("cyan-500", "#06b6d4"),
    ("cyan-600", "#0891b2"), ("cyan-700", "#0e7490"), ("cyan-800", "#155e75"), ("cyan-900", "#164e63"),
    ("indigo-100", "#e0e7ff"), ("indigo-200", "#c7d2fe"), ("indigo-300", "#a5b4fc"), ("indigo-400", "#818cf8"), ("indigo-500", "#6366f1"),
    ("indigo-600", "#4f46e5"), ("indigo-700", "#4338ca"), ("indigo-800", "#3730a3"), ("indigo-900", "#312e81"),
    ("orange-100", "#ffedd5"), ("orange-200", "#fed7aa"), ("orange-300", "#fdba74"), ("orange-400", "#fb923c"), ("orange-500", "#f97316"),
    ("orange-600", "#ea580c"), ("orange-700", "#c2410c"), ("orange-800", "#9a3412"), ("orange-900", "#7c2d12"),
    ("teal-100", "#ccfbf1"), ("teal-200", "#99f6e4"), ("teal-300", "#5eead4"), ("teal-400", "#2dd4bf"), ("teal-500", "#14b8a6"),
    ("teal-600", "#0d9488"), ("teal-700", "#0f766e"), ("teal-800", "#115e59"), ("teal-900", "#134e4a"),
    ("amber-100", "#fef3c7"), ("amber-200", "#fde68a"), ("amber-300", "#fcd34d"), ("amber-400", "#fbbf24"), ("amber-500", "#f59e0b"),
    ("amber-600", "#d97706"), ("amber-700", "#b45309"), ("amber-800", "#92400e"), ("amber-900", "#78350f"),
    ("lime-100", "#ecfccb"), ("lime-200", "#d9f99d"), ("lime-300", "#bef264"), ("lime-400", "#a3e635"), ("lime-500", "#84cc16"),
    ("lime-600", "#65a30d"), ("lime-700", "#4d7c0f"), ("lime-800", "#3f6212"), ("lime-900", "#365314"),
    ("emerald-100", "#d1fae5"), ("emerald-200", "#a7f3d0"), ("emerald-300", "#6ee7b7"), ("emerald-400", "#34d399"), ("emerald-500", "#10b981"),
    ("emerald-600", "#059669"), ("emerald-700", "#047857"), ("emerald-800", "#065f46"), ("emerald-900", "#064e3b"),
    ("rose-100", "#ffe4e6"), ("rose-200", "#fecdd3"), ("rose-300", "#fda4af"), ("rose-400", "#fb7185"), ("rose-500", "#f43f5e"),
    ("rose-600", "#e11d48"), ("rose-700", "#be123c"), ("rose-800", "#9f1239"), ("rose-900", "#881337"),
    ("violet-100", "#ede9fe"), ("violet-200", "#ddd6fe"), ("violet-300", "#c4b5fd"), ("violet-400", "#a78bfa"), ("violet-500", "#8b5cf6"),
    ("violet-600", "#7c3aed"), ("violet-700", "#6d28d9"), ("violet-800", "#5b21b6"), ("violet-900", "#4c1d95"),
    ("slate-100", "#f1f5f9"), ("slate-200", "#e2e8f0"), ("slate-300", "#cbd5e1"), ("slate-400", "#94a3b8"), ("slate-500", "#64748b"),
    ("slate-600", "#475569"), ("slate-700", "#334155"), ("slate-800", "#1e293b"), ("slate-900", "#0f172a"),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_text(from: &str, to: &str) -> StyleConfig {
        StyleConfig {
            text_background: TextBackground {
                enabled: true,
                paint: Background::Custom {
                    gradient: Gradient {
                        from: from.into(),
                        to: to.into(),
                        direction: GradientDirection::ToBottom,
                    },
                },
            },
            ..Default::default()
        }
    }

    #[test]
    fn disabled_text_background_follows_mode() {
        let cfg = StyleConfig::default();
        assert_eq!(resolve(&cfg, Mode::Light).text_color, BLACK);
        assert_eq!(resolve(&cfg, Mode::Dark).text_color, WHITE);
    }

    #[test]
    fn brightness_boundary_is_exact() {
        // luma 128 exactly is not "brighter than 128"
        assert_eq!(resolve(&custom_text("#808080", "#808080"), Mode::Light).text_color, WHITE);
        assert_eq!(resolve(&custom_text("#7f7f7f", "#818181"), Mode::Light).text_color, WHITE);
        assert_eq!(resolve(&custom_text("#7f7f7f", "#7f7f7f"), Mode::Light).text_color, WHITE);
        assert_eq!(resolve(&custom_text("#818181", "#818181"), Mode::Light).text_color, BLACK);
    }

    #[test]
    fn text_color_is_black_or_white_and_stable() {
        let colors = ["#000", "#fff", "#3b82f6", "#fde047", "#1e293b", "#f3f4f6", "nonsense"];
        for from in colors {
            for to in colors {
                for mode in [Mode::Light, Mode::Dark] {
                    let cfg = custom_text(from, to);
                    let a = resolve(&cfg, mode).text_color;
                    let b = resolve(&cfg, mode).text_color;
                    assert!(a == BLACK || a == WHITE);
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn light_preset_in_dark_mode_uses_white_and_tinted_panel() {
        let mut cfg = StyleConfig::default();
        cfg.text_background.enabled = true;
        let dark = resolve(&cfg, Mode::Dark);
        assert_eq!(dark.text_color, WHITE);
        assert_eq!(dark.text_background, Paint::Preset("bg-blue-200/30".into()));

        // blue-100 is bright, so light mode picks black
        let light = resolve(&cfg, Mode::Light);
        assert_eq!(light.text_color, BLACK);
    }

    #[test]
    fn preset_without_from_falls_back_to_blue() {
        assert_eq!(extract_main_color("bg-red-500"), "#3b82f6");
        assert_eq!(extract_main_color("bg-gradient-to-r from-gray-900 to-black"), "#111827");
    }

    #[test]
    fn custom_background_becomes_angled_gradient() {
        let cfg = StyleConfig {
            background: Background::Custom {
                gradient: Gradient {
                    from: "#ff0000".into(),
                    to: "#0000ff".into(),
                    direction: GradientDirection::ToBottomRight,
                },
            },
            ..Default::default()
        };
        let resolved = resolve(&cfg, Mode::Light);
        assert_eq!(
            resolved.background.to_css().as_deref(),
            Some("linear-gradient(135deg, #ff0000, #0000ff)")
        );
        assert_eq!(Paint::from_css("linear-gradient(135deg, #ff0000, #0000ff)"), Some(resolved.background));
    }

    #[test]
    fn custom_without_gradient_is_defaulted() {
        let bg: Background = serde_json::from_str(r#"{"type":"custom"}"#).unwrap();
        assert_eq!(bg, Background::Custom { gradient: Gradient::default() });
    }

    #[test]
    fn preset_fill_parses_tailwind_classes() {
        let fill = preset_fill("bg-gradient-to-r from-blue-500 to-purple-600").unwrap();
        assert_eq!(
            fill,
            Fill::Linear {
                angle_deg: 90.0,
                from: Rgba::rgb(0x3b, 0x82, 0xf6),
                to: Rgba::rgb(0x93, 0x33, 0xea),
            }
        );
        match preset_fill("bg-gray-800/95").unwrap() {
            Fill::Solid(c) => {
                assert_eq!(c.hex(), "#1f2937");
                assert_eq!(c.a, 242);
            }
            other => panic!("unexpected fill {:?}", other),
        }
    }

    #[test]
    fn rgba_parses_common_forms() {
        assert_eq!(Rgba::parse("#fff"), Some(Rgba::rgb(255, 255, 255)));
        assert_eq!(Rgba::parse("rgba(31, 41, 55, 0.5)").map(|c| c.a), Some(128));
        assert_eq!(Rgba::parse("#12345"), None);
        assert_eq!(brightness("#ffffff"), 255.0);
    }
}

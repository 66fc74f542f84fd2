//! Configuration management for the PDF core

use serde::{Deserialize, Serialize};
use std::env;

use crate::engine::{no_op_alert, FormCallbacks};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub render: RenderConfig,
    pub form: FormConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// DPI used when a caller does not pick one (CLI)
    pub default_dpi: i32,
    /// Draw annotations unless a request says otherwise (CLI)
    pub render_annotations: bool,
    /// Canvas fill outside the draw rectangle, 0xRRGGBBAA
    pub margin_color: u32,
    /// Fill of the draw rectangle before content, 0xRRGGBBAA
    pub page_color: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormConfig {
    /// Widget highlight color, 0xRRGGBB
    pub highlight_color: u32,
    pub highlight_alpha: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub backend: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            default_dpi: 72,
            render_annotations: true,
            margin_color: 0x848484FF,
            page_color: 0xFFFFFFFF,
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig {
            highlight_color: 0xFFFFFF,
            highlight_alpha: 100,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            backend: "mupdf".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            render: RenderConfig::default(),
            form: FormConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl FormConfig {
    /// Engine-facing form settings with the no-op alert handler
    pub fn callbacks(&self) -> FormCallbacks {
        FormCallbacks {
            highlight_color: self.highlight_color,
            highlight_alpha: self.highlight_alpha,
            alert: no_op_alert,
        }
    }
}

impl Config {
    /// Read `PDF_CORE_*` variables; unset or malformed values keep defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        Config {
            render: RenderConfig {
                default_dpi: lookup("PDF_CORE_DPI")
                    .and_then(|v| v.parse().ok())
                    .filter(|dpi: &i32| *dpi > 0)
                    .unwrap_or(defaults.render.default_dpi),
                render_annotations: lookup("PDF_CORE_RENDER_ANNOTATIONS")
                    .and_then(|v| parse_bool(&v))
                    .unwrap_or(defaults.render.render_annotations),
                margin_color: lookup("PDF_CORE_MARGIN_COLOR")
                    .and_then(|v| parse_hex(&v))
                    .unwrap_or(defaults.render.margin_color),
                page_color: lookup("PDF_CORE_PAGE_COLOR")
                    .and_then(|v| parse_hex(&v))
                    .unwrap_or(defaults.render.page_color),
            },
            form: FormConfig {
                highlight_color: lookup("PDF_CORE_FORM_HIGHLIGHT_COLOR")
                    .and_then(|v| parse_hex(&v))
                    .unwrap_or(defaults.form.highlight_color),
                highlight_alpha: lookup("PDF_CORE_FORM_HIGHLIGHT_ALPHA")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.form.highlight_alpha),
            },
            engine: EngineConfig {
                backend: lookup("PDF_CORE_ENGINE").unwrap_or(defaults.engine.backend),
            },
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_hex(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .or_else(|| value.strip_prefix('#'))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16).ok()
}

//! Plotly-compatible figure documents.
//!
//! A [`Figure`] serializes to the JSON structure expected by plotly
//! (`{"data": [...], "layout": {...}}`), so it can be handed directly to any
//! plotly front-end.

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

use crate::MAX_DECIMALS;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: JSValue,
}

impl Figure {
    pub fn traces_named(&self, name: &str) -> Vec<&Trace> {
        self.data.iter().filter(|t| t.name() == name).collect()
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Choropleth(ChoroplethTrace),
    Scattergeo(ScatterGeoTrace),
    Bar(BarTrace),
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Trace::Choropleth(t) => &t.name,
            Trace::Scattergeo(t) => &t.name,
            Trace::Bar(t) => &t.name,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ChoroplethTrace {
    pub name: String,
    pub locations: Vec<String>,
    pub z: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geojson: Option<JSValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locationmode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<JSValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customdata: Option<Vec<Vec<JSValue>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<JSValue>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ScatterGeoTrace {
    pub name: String,
    pub locations: Vec<String>,
    pub locationmode: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<JSValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BarTrace {
    pub name: String,
    pub x: Vec<JSValue>,
    pub y: Vec<JSValue>,
    pub orientation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<JSValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insidetextanchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texttemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customdata: Option<Vec<Vec<JSValue>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offsetgroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
}

impl BarTrace {
    /// A horizontal bar trace with all the optional attributes unset.
    pub fn horizontal(name: &str, x: Vec<JSValue>, y: Vec<JSValue>) -> BarTrace {
        BarTrace {
            name: name.to_string(),
            x,
            y,
            orientation: "h".to_string(),
            marker: None,
            text: None,
            textposition: None,
            insidetextanchor: None,
            texttemplate: None,
            customdata: None,
            hoverinfo: None,
            hovertemplate: None,
            xaxis: None,
            yaxis: None,
            offsetgroup: None,
            showlegend: None,
        }
    }
}

// ******** Text and numbers *********

/// Rounds to the given number of decimals.
/// Rounds to at most `MAX_DECIMALS` decimals.
pub fn round_to(x: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    (x * factor).round() / factor
}

pub fn format_decimals(x: f64, decimals: usize) -> String {
    format!("{:.*}", decimals.min(MAX_DECIMALS), x)
}

/// Formats a count with thousands separators: `12345` -> `12,345`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut res = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            res.push(',');
        }
        res.push(c);
    }
    res
}

/// Greedy word wrapping joined with plotly line breaks.
///
/// Words longer than the width are kept whole.
pub fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("<br>")
}

// ******** Colour scales *********

const VIRIDIS: [&str; 10] = [
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];

const OR_RD: [&str; 9] = [
    "#fff7ec", "#fee8c8", "#fdd49e", "#fdbb84", "#fc8d59", "#ef6548", "#d7301f", "#b30000",
    "#7f0000",
];

const BLUES: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

fn colorscale_stops(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "Viridis" | "viridis" => Some(&VIRIDIS),
        "OrRd" | "orrd" => Some(&OR_RD),
        "Blues" | "blues" => Some(&BLUES),
        _ => None,
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let c = color.strip_prefix('#')?;
    if c.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&c[0..2], 16).ok()?;
    let g = u8::from_str_radix(&c[2..4], 16).ok()?;
    let b = u8::from_str_radix(&c[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Samples a named colour scale at position `t` in [0, 1] (clamped), with
/// linear interpolation between the stops. Returns `None` for an unknown
/// scale.
pub fn sample_colorscale(name: &str, t: f64) -> Option<String> {
    let stops = colorscale_stops(name)?;
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let pos = t * (stops.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(stops.len() - 1);
    let frac = pos - lo as f64;
    let (r1, g1, b1) = parse_hex(stops[lo])?;
    let (r2, g2, b2) = parse_hex(stops[hi])?;
    let mix = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * frac).round() as u8 };
    Some(format!(
        "rgb({}, {}, {})",
        mix(r1, r2),
        mix(g1, g2),
        mix(b1, b2)
    ))
}

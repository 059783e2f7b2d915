//! Stacked horizontal bar charts of the responses to a question.

use log::{debug, warn};
use serde_json::{json, Value as JSValue};

use crate::figure::{format_decimals, round_to, wrap_text, BarTrace, Figure, Trace};
use crate::selector::{select_opinions, Axis, OpinionQuery, OpinionSlice};
use crate::*;

/// The bar charts are requested with the same parameters as the selection.
pub type BarRequest = OpinionQuery;

fn axis_suffix(facet_idx: usize) -> String {
    if facet_idx == 0 {
        String::new()
    } else {
        format!("{}", facet_idx + 1)
    }
}

/// The vertical extent of each facet, from the top, in paper coordinates.
fn facet_domains(num_facets: usize, spacing: f64) -> Vec<(f64, f64)> {
    let n = num_facets.max(1) as f64;
    let spacing = if num_facets > 1 { spacing } else { 0.0 };
    let h = (1.0 - (n - 1.0) * spacing) / n;
    (0..num_facets)
        .map(|i| {
            let top = 1.0 - i as f64 * (h + spacing);
            ((top - h).max(0.0), top.min(1.0))
        })
        .collect()
}

/// The text drawn inside a segment: the outcome, wrapped when the segment
/// is too narrow, and the percentage.
fn segment_label(full_text: &str, value: f64, settings: &BarSettings) -> String {
    let text = if value < 50.0 {
        wrap_text(full_text, settings.text_wrap)
    } else {
        full_text.to_string()
    };
    format!("{}<br>{}%", text, format_decimals(value, settings.decimals))
}

fn hover_template(axis: Axis, decimals: usize) -> String {
    let base = format!(
        "Outcome: %{{customdata[0]}}<br>Percentage: %{{x:.{}f}}%<br><extra></extra>",
        decimals
    );
    match axis {
        Axis::Question => base,
        Axis::Party => format!("<b>%{{customdata[1]}}</b><br>{}", base),
    }
}

/// Makes the stacked bars of a question.
///
/// The percentages are rounded once, and both the bar lengths and the labels
/// use the rounded values.
pub fn make_stacked_bar(
    data: &SurveyData,
    request: &BarRequest,
    settings: &BarSettings,
) -> SurveyResult<Figure> {
    let slice = select_opinions(data, request)?;
    let palette: Option<&[&str]> = match request.threshold {
        Some(_) => Some(&BINARY_PALETTE),
        None => {
            let p = palette_for(slice.outcomes.len());
            if p.is_none() {
                warn!(
                    "make_stacked_bar: no palette for {} outcomes ({:?}), using the default colours",
                    slice.outcomes.len(),
                    slice.outcomes
                );
            }
            p
        }
    };

    let num_facets = slice.facets.len();
    let mut height = settings.height * num_facets as f64;
    if slice.axis == Axis::Party {
        height *= settings.stratified_height_factor;
    }
    let spacing = settings.facet_row_spacing / height;
    let domains = facet_domains(num_facets, spacing);
    debug!(
        "make_stacked_bar: {} facets, height {}, domains {:?}",
        num_facets, height, domains
    );

    let traces = bar_traces(data, &request.question, &slice, palette, settings)?;

    let m = settings.margins;
    let mut layout = json!({
        "barmode": "stack",
        "template": PLOTLY_THEME,
        "height": height,
        "margin": { "l": m.l, "r": m.r, "t": m.t, "b": m.b },
        "uniformtext": { "minsize": settings.font_size, "mode": "hide" },
        "showlegend": false,
        "dragmode": false,
    });
    let mut annotations: Vec<JSValue> = Vec::new();
    for (idx, (facet, (bottom, top))) in slice.facets.iter().zip(domains.iter()).enumerate() {
        let suffix = axis_suffix(idx);
        layout[format!("xaxis{}", suffix)] = json!({
            "range": [0, 100],
            "domain": [0.0, 1.0],
            "anchor": format!("y{}", suffix),
            "showgrid": false,
            "zeroline": false,
            "showticklabels": false,
            "title": { "text": null },
        });
        layout[format!("yaxis{}", suffix)] = json!({
            "domain": [bottom, top],
            "anchor": format!("x{}", suffix),
            "showgrid": false,
            "showticklabels": slice.categories.len() > 1,
            "categoryorder": "array",
            // Plotly draws the first category at the bottom.
            "categoryarray": slice.categories.iter().rev().collect::<Vec<&String>>(),
            "title": { "text": null },
        });
        // A single facet has no title.
        if num_facets > 1 {
            let title = data.sub_question_text(&request.question, facet)?;
            annotations.push(json!({
                "text": wrap_text(title, settings.title_wrap),
                "font": { "size": settings.title_font_size },
                "showarrow": false,
                "x": 0,
                "xref": "paper",
                "xanchor": "left",
                "align": "left",
                "y": top,
                "yref": "paper",
                "yanchor": "bottom",
            }));
        }
    }
    layout["annotations"] = JSValue::Array(annotations);

    Ok(Figure {
        data: traces,
        layout,
    })
}

fn bar_traces(
    data: &SurveyData,
    question: &str,
    slice: &OpinionSlice,
    palette: Option<&[&str]>,
    settings: &BarSettings,
) -> SurveyResult<Vec<Trace>> {
    let hovertemplate = hover_template(slice.axis, settings.decimals);
    let mut traces: Vec<Trace> = Vec::new();
    for (facet_idx, facet) in slice.facets.iter().enumerate() {
        let suffix = axis_suffix(facet_idx);
        for (outcome_idx, outcome) in slice.outcomes.iter().enumerate() {
            let full_text = data.outcome_text(question, outcome)?;
            let mut x: Vec<JSValue> = Vec::new();
            let mut y: Vec<JSValue> = Vec::new();
            let mut text: Vec<String> = Vec::new();
            let mut customdata: Vec<Vec<JSValue>> = Vec::new();
            for category in slice.categories.iter() {
                let row = match slice.find(facet, category, outcome) {
                    Some(r) => r,
                    None => continue,
                };
                let value = round_to(row.percentage * 100.0, settings.decimals);
                x.push(json!(value));
                y.push(json!(category));
                text.push(segment_label(full_text, value, settings));
                let mut custom = vec![json!(full_text)];
                if slice.axis == Axis::Party {
                    custom.push(json!(category));
                }
                customdata.push(custom);
            }
            if x.is_empty() {
                continue;
            }
            let mut trace = BarTrace::horizontal(outcome, x, y);
            trace.marker = palette
                .and_then(|p| p.get(outcome_idx))
                .map(|c| json!({ "color": c }));
            trace.text = Some(text);
            trace.texttemplate = Some("%{text}".to_string());
            trace.textposition = Some("inside".to_string());
            trace.insidetextanchor = Some("middle".to_string());
            trace.customdata = Some(customdata);
            trace.hovertemplate = Some(hovertemplate.clone());
            trace.xaxis = Some(format!("x{}", suffix));
            trace.yaxis = Some(format!("y{}", suffix));
            trace.showlegend = Some(false);
            traces.push(Trace::Bar(trace));
        }
    }
    Ok(traces)
}

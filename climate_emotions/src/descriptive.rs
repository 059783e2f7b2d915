//! Description of the sample: who answered the survey, and how many of them
//! were exposed to each severe weather impact.

use log::debug;
use serde_json::{json, Value as JSValue};
use snafu::ensure;

use crate::figure::{format_decimals, BarTrace, Figure, Trace};
use crate::*;

/// The display order of the categories of the demographic variables.
/// Categories not listed here come last, in table order.
pub const CATEGORY_ORDERS: [(&str, &[&str]); 10] = [
    ("age", &["under 18", "18+"]),
    ("sex", &["Female", "Male"]),
    ("party", &["Democrat", "Independent/Other", "Republican"]),
    ("race", &["Black", "White", "Other"]),
    ("ethnicity", &["Not Hispanic", "Hispanic"]),
    ("student", &["No", "Yes"]),
    (
        "employed",
        &["Not employed", "Employed - part time", "Employed - full time"],
    ),
    ("location", &["Rural", "Suburban", "Urban"]),
    (
        "hh_origin",
        &[
            "Working class",
            "Lower class",
            "Middle class",
            "Upper middle class",
            "Upper class",
        ],
    ),
    (
        "q2",
        &[
            "Very sure it is not happening",
            "Moderately sure it is not happening",
            "Slightly sure it is not happening",
            "Slightly sure it is happening",
            "Moderately sure it is happening",
            "Very sure it is happening",
            "Don't know",
        ],
    ),
];

/// The label of the impact panel in the demographics dictionary.
pub const IMPACTS_LABEL: &str = "impact";

/// The belief in climate change, drawn in its own panel below the impacts.
pub const BELIEF_VARIABLE: &str = "q2";

pub fn category_order(demographic_variable: &str) -> Option<&'static [&'static str]> {
    CATEGORY_ORDERS
        .iter()
        .find(|(v, _)| *v == demographic_variable)
        .map(|(_, order)| *order)
}

fn display_category(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn rank(order: Option<&[&str]>, category: &str) -> usize {
    order
        .and_then(|o| o.iter().position(|c| *c == category))
        .unwrap_or(usize::MAX)
}

fn demographic_trace(
    data: &SurveyData,
    rows: &[&SampleDescriptive],
    variable: &str,
    axis: u8,
    decimals: usize,
) -> Trace {
    let order = category_order(variable);
    let mut selected: Vec<&SampleDescriptive> = rows
        .iter()
        .filter(|r| r.demographic_variable == variable)
        .cloned()
        .collect();
    // Stable: unknown categories keep the table order.
    selected.sort_by_key(|r| rank(order, &r.category));

    let name = data.demographic_text(variable);
    let mut trace = BarTrace::horizontal(
        variable,
        selected.iter().map(|r| json!(r.percentage * 100.0)).collect(),
        selected.iter().map(|_| json!(name)).collect(),
    );
    trace.text = Some(
        selected
            .iter()
            .map(|r| {
                format!(
                    "{}: {}% ({})",
                    display_category(&r.category),
                    format_decimals(r.percentage * 100.0, decimals),
                    r.n
                )
            })
            .collect(),
    );
    trace.textposition = Some("inside".to_string());
    trace.customdata = Some(
        selected
            .iter()
            .map(|r| vec![json!(r.n), json!(display_category(&r.category))])
            .collect(),
    );
    trace.hoverinfo = Some("none".to_string());
    trace.hovertemplate = Some(format!(
        "<b>%{{customdata[1]}}</b>: %{{x:.{}f}}% (%{{customdata[0]}})<extra></extra>",
        decimals
    ));
    trace.offsetgroup = Some("0".to_string());
    trace.xaxis = Some(axis_id("x", axis));
    trace.yaxis = Some(axis_id("y", axis));
    Trace::Bar(trace)
}

fn axis_id(prefix: &str, axis: u8) -> String {
    match axis {
        1 => prefix.to_string(),
        n => format!("{}{}", prefix, n),
    }
}

fn impact_trace(data: &SurveyData, rows: &[&SampleDescriptive], decimals: usize) -> Trace {
    let mut yes: Vec<&SampleDescriptive> = rows
        .iter()
        .filter(|r| data.is_impact(&r.demographic_variable) && r.category == "Yes")
        .cloned()
        .collect();
    yes.sort_by(|a, b| a.demographic_variable.cmp(&b.demographic_variable));

    let mut trace = BarTrace::horizontal(
        "Yes",
        yes.iter()
            .map(|r| json!(data.demographic_text(&r.demographic_variable)))
            .collect(),
        yes.iter().map(|r| json!(r.n)).collect(),
    );
    trace.orientation = "v".to_string();
    trace.customdata = Some(yes.iter().map(|r| vec![json!(r.percentage * 100.0)]).collect());
    trace.hovertemplate = Some(format!(
        "<b>%{{x}}</b><br>Yes: %{{y}} (%{{customdata[0]:.{}f}}%)<extra></extra>",
        decimals
    ));
    trace.xaxis = Some("x2".to_string());
    trace.yaxis = Some("y2".to_string());
    Trace::Bar(trace)
}

/// The sample description of the whole sample, or of one state.
pub fn make_descriptive_plots(
    data: &SurveyData,
    state: Option<&str>,
    decimals: usize,
) -> SurveyResult<Figure> {
    let rows: Vec<&SampleDescriptive> = match state {
        None => data.sample_desc_national.iter().collect(),
        Some(state) => {
            ensure!(
                data.regions().iter().any(|r| r.label == state),
                UnknownStateSnafu { state }
            );
            data.sample_desc_state
                .iter()
                .filter(|r| r.state.as_deref() == Some(state))
                .collect()
        }
    };

    // Demographic variables in dictionary order, then the others.
    let mut variables: Vec<&str> = Vec::new();
    let known = data.demographics.iter().map(|d| d.demographic_variable.as_str());
    let present = rows.iter().map(|r| r.demographic_variable.as_str());
    for v in known.chain(present) {
        let shown = rows.iter().any(|r| r.demographic_variable == v);
        if shown && v != BELIEF_VARIABLE && !data.is_impact(v) && !variables.contains(&v) {
            variables.push(v);
        }
    }
    debug!(
        "make_descriptive_plots: {:?}: {} rows, variables {:?}",
        state,
        rows.len(),
        variables
    );

    let mut traces: Vec<Trace> = variables
        .iter()
        .map(|v| demographic_trace(data, &rows, v, 1, decimals))
        .collect();
    traces.push(impact_trace(data, &rows, decimals));
    traces.push(demographic_trace(data, &rows, BELIEF_VARIABLE, 3, decimals));

    let title = |text: &str, y: f64| -> JSValue {
        json!({
            "text": text,
            "showarrow": false,
            "x": 0.5,
            "xref": "paper",
            "xanchor": "center",
            "y": y,
            "yref": "paper",
            "yanchor": "bottom",
        })
    };
    let layout = json!({
        "template": PLOTLY_THEME,
        "barmode": "stack",
        "showlegend": false,
        "margin": { "l": 30, "r": 30, "t": 30, "b": 30 },
        "xaxis": { "range": [0, 100], "anchor": "y", "domain": [0.0, 1.0] },
        "yaxis": { "domain": [0.45, 1.0], "anchor": "x" },
        "xaxis2": { "anchor": "y2", "domain": [0.0, 1.0] },
        "yaxis2": { "domain": [0.22, 0.37], "anchor": "x2" },
        "xaxis3": { "range": [0, 100], "anchor": "y3", "domain": [0.0, 1.0] },
        "yaxis3": { "domain": [0.0, 0.15], "anchor": "x3" },
        "annotations": [
            title("Demographic information", 1.0),
            title(data.demographic_text(IMPACTS_LABEL), 0.37),
            title(data.demographic_text(BELIEF_VARIABLE), 0.15),
        ],
    });
    Ok(Figure {
        data: traces,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::*;

    fn bar<'a>(fig: &'a Figure, name: &str) -> &'a BarTrace {
        match fig.traces_named(name).first().copied() {
            Some(Trace::Bar(b)) => b,
            x => panic!("no bar {}: {:?}", name, x),
        }
    }

    #[test]
    fn whole_sample() {
        let data = survey();
        let fig = make_descriptive_plots(&data, None, 1).unwrap();
        // sex and party, then the impacts and the belief panels
        assert_eq!(fig.data.len(), 4);
        let demographics = bar(&fig, "sex");
        assert_eq!(demographics.yaxis.as_deref(), Some("y"));
        let party = bar(&fig, "party");
        assert_eq!(
            party.text.as_ref().unwrap(),
            &vec![
                "Democrat: 40.0% (40)",
                "Independent/Other: 30.0% (30)",
                "Republican: 30.0% (30)",
            ]
        );
        assert!(party.y.iter().all(|y| y == "Party affiliation"));

        let impacts = bar(&fig, "Yes");
        assert_eq!(impacts.orientation, "v");
        assert_eq!(impacts.x, vec![json!("Extreme heat"), json!("Wildfire")]);
        assert_eq!(impacts.y, vec![json!(60), json!(25)]);
        assert_eq!(fig.layout["annotations"][1]["text"], "Severe weather impacts");
    }

    #[test]
    fn belief_has_its_own_panel() {
        let data = survey();
        let fig = make_descriptive_plots(&data, None, 1).unwrap();
        let belief = bar(&fig, "q2");
        assert_eq!(belief.xaxis.as_deref(), Some("x3"));
        assert_eq!(belief.yaxis.as_deref(), Some("y3"));
        assert_eq!(
            belief.text.as_ref().unwrap(),
            &vec![
                "Slightly sure it is happening: 20.0% (20)",
                "Very sure it is happening: 70.0% (70)",
                "Don't know: 10.0% (10)",
            ]
        );
        assert!(belief.y.iter().all(|y| y == "Belief in climate change"));
        assert_eq!(fig.layout["yaxis3"]["anchor"], "x3");
        assert_eq!(
            fig.layout["annotations"][2]["text"],
            "Belief in climate change"
        );
        // The belief is not drawn with the demographics.
        assert!(fig
            .data
            .iter()
            .filter_map(|t| match t {
                Trace::Bar(b) => Some(b),
                _ => None,
            })
            .filter(|b| b.name == "sex" || b.name == "party")
            .all(|b| b.yaxis.as_deref() == Some("y")));
    }

    #[test]
    fn one_state() {
        let data = survey();
        let fig = make_descriptive_plots(&data, Some("Texas"), 1).unwrap();
        let impacts = bar(&fig, "Yes");
        assert_eq!(impacts.y, vec![json!(60), json!(20)]);
        assert!(make_descriptive_plots(&data, Some("Atlantis"), 1).is_err());
    }

    #[test]
    fn categories() {
        assert_eq!(axis_id("x", 1), "x");
        assert_eq!(axis_id("y", 3), "y3");
        assert_eq!(display_category("under 18"), "Under 18");
        assert_eq!(display_category(""), "");
        assert_eq!(rank(category_order("sex"), "Male"), 1);
        assert_eq!(rank(category_order("sex"), "Other"), usize::MAX);
        assert!(category_order("shoe size").is_none());
    }
}

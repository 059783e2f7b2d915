//! The choropleth map of the states and clusters.

use log::{debug, warn};
use serde_json::{json, Value as JSValue};
use snafu::{ensure, OptionExt};

use crate::figure::{sample_colorscale, ChoroplethTrace, Figure, ScatterGeoTrace, Trace};
use crate::selector::{select_impact, select_map_opinions};
use crate::*;

/// How a selected impact is drawn.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ImpactDisplay {
    /// The impact replaces the opinion as the colour of the regions.
    Gradient,
    /// The regions keep the opinion colour, the impact is drawn as one
    /// marker per state, sized by its value.
    Markers,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MapRequest {
    pub question: String,
    pub sub_question: String,
    pub outcome: String,
    pub clicked_state: Option<String>,
    pub impact: Option<String>,
    pub impact_display: ImpactDisplay,
}

impl MapRequest {
    pub fn new(question: &str, sub_question: &str, outcome: &str) -> MapRequest {
        MapRequest {
            question: question.to_string(),
            sub_question: sub_question.to_string(),
            outcome: outcome.to_string(),
            clicked_state: None,
            impact: None,
            impact_display: ImpactDisplay::Gradient,
        }
    }

    pub fn with_clicked_state(mut self, state: Option<&str>) -> MapRequest {
        self.clicked_state = state.map(|s| s.to_string());
        self
    }

    pub fn with_impact(mut self, impact: Option<&str>, display: ImpactDisplay) -> MapRequest {
        self.impact = impact.map(|s| s.to_string());
        self.impact_display = display;
        self
    }
}

/// The bounds of the colour scale: the range of the values, clamped to
/// [0, 100], widened by the padding and clamped again.
pub fn color_range(values: &[f64], padding: f64) -> Option<(f64, f64)> {
    let finite = values.iter().cloned().filter(|v| v.is_finite());
    let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let (min, max) = (min.clamp(0.0, 100.0), max.clamp(0.0, 100.0));
    Some((
        (min - padding).clamp(0.0, 100.0),
        (max + padding).clamp(0.0, 100.0),
    ))
}

// One state or cluster, with its percentages.
struct MapRow {
    state: String,
    opinion: f64,
    impact: Option<f64>,
    gradient: f64,
}

fn outline_caption(region_name: &str) -> String {
    format!("You're looking at data for {}", region_name)
}

/// Draws the map for one outcome of a sub-question.
pub fn make_map(
    data: &SurveyData,
    request: &MapRequest,
    settings: &MapSettings,
) -> SurveyResult<Figure> {
    debug!("make_map: {:?}", request);
    let opinions = select_map_opinions(
        data,
        &request.question,
        &request.sub_question,
        &request.outcome,
    )?;
    let impacts = match request.impact.as_ref() {
        Some(impact) => Some(select_impact(data, impact)?),
        None => None,
    };
    let impact_gradient = impacts.is_some() && request.impact_display == ImpactDisplay::Gradient;

    let mut rows: Vec<MapRow> = Vec::new();
    for o in opinions.iter() {
        let state = match o.state.as_ref() {
            Some(s) => s,
            None => continue,
        };
        let impact = match impacts.as_ref() {
            None => None,
            Some(impacts) => match impacts.iter().find(|i| i.state.as_ref() == Some(state)) {
                Some(i) => Some(i.percentage * 100.0),
                // Only the states with both values are drawn.
                None => continue,
            },
        };
        let opinion = o.percentage * 100.0;
        rows.push(MapRow {
            state: state.clone(),
            opinion,
            impact,
            gradient: if impact_gradient {
                impact.unwrap_or(opinion)
            } else {
                opinion
            },
        });
    }
    if let Some(impact) = request.impact.as_ref() {
        ensure!(!rows.is_empty(), NoImpactDataSnafu { impact });
    }

    let (colorscale, gradient_label) = if impact_gradient {
        (settings.impact_colormap.to_string(), "Percentage (impact)")
    } else {
        (settings.opinion_colormap.to_string(), "Percentage (opinion)")
    };
    let gradients: Vec<f64> = rows.iter().map(|r| r.gradient).collect();
    let (zmin, zmax) = color_range(&gradients, settings.colormap_range_padding).context(
        NoOpinionDataSnafu {
            question: request.question.clone(),
            sub_question: request.sub_question.clone(),
            outcome: request.outcome.clone(),
        },
    )?;
    debug!(
        "make_map: {} regions, colour range [{}, {}]",
        rows.len(),
        zmin,
        zmax
    );

    let mut traces: Vec<Trace> = Vec::new();

    // Hover boxes of the geojson layer are misplaced, they are shown by the
    // hover layer instead.
    traces.push(Trace::Choropleth(ChoroplethTrace {
        name: "main_map".to_string(),
        locations: rows.iter().map(|r| r.state.clone()).collect(),
        z: gradients.clone(),
        zmin: Some(zmin),
        zmax: Some(zmax),
        geojson: Some(data.survey_geography().clone()),
        locationmode: Some("geojson-id".to_string()),
        colorscale: Some(colorscale.clone()),
        colorbar: Some(json!({ "title": { "text": gradient_label } })),
        showscale: None,
        hoverinfo: Some("none".to_string()),
        hovertemplate: None,
        customdata: None,
        marker: None,
    }));

    let clicked_region = match request.clicked_state.as_ref() {
        Some(state) => Some(
            data.regions()
                .iter()
                .find(|r| &r.label == state)
                .context(UnknownStateSnafu {
                    state: state.clone(),
                })?,
        ),
        None => None,
    };
    let clicked_rows: Vec<&MapRow> = rows
        .iter()
        .filter(|r| Some(&r.state) == request.clicked_state.as_ref())
        .collect();
    traces.push(Trace::Choropleth(ChoroplethTrace {
        name: "clicked_state".to_string(),
        locations: clicked_rows.iter().map(|r| r.state.clone()).collect(),
        z: clicked_rows.iter().map(|r| r.gradient).collect(),
        zmin: Some(zmin),
        zmax: Some(zmax),
        geojson: Some(data.survey_geography().clone()),
        locationmode: Some("geojson-id".to_string()),
        colorscale: Some(colorscale.clone()),
        colorbar: None,
        showscale: Some(false),
        hoverinfo: Some("skip".to_string()),
        hovertemplate: None,
        customdata: None,
        marker: Some(json!({
            "line": {
                "width": settings.clicked_outline_width,
                "color": settings.clicked_outline_color,
            }
        })),
    }));

    // The hover layer works on the individual states, so that the hover box
    // is centered on each member of a cluster.
    let show_markers = impacts.is_some() && request.impact_display == ImpactDisplay::Markers;
    let mut hover_locations: Vec<String> = Vec::new();
    let mut hover_z: Vec<f64> = Vec::new();
    let mut hover_data: Vec<Vec<JSValue>> = Vec::new();
    let mut marker_values: Vec<(String, f64)> = Vec::new();
    for sr in data.state_rows().iter() {
        let row = match rows.iter().find(|r| r.state == sr.state) {
            Some(r) => r,
            None => continue,
        };
        let n = data.sample_size(&sr.state)?;
        let mut custom = vec![json!(sr.state), json!(n)];
        if impact_gradient {
            custom.push(json!(row.opinion));
        } else if let (true, Some(v)) = (show_markers, row.impact) {
            custom.push(json!(v));
            marker_values.push((sr.state_abbreviated.clone(), v));
        }
        hover_locations.push(sr.state_abbreviated.clone());
        hover_z.push(row.gradient);
        hover_data.push(custom);
    }
    let hover_extra = if impact_gradient {
        format!(
            "<br>Percentage (opinion): %{{customdata[2]:.{}f}}",
            settings.decimals
        )
    } else if show_markers {
        format!(
            "<br>Percentage (impact): %{{customdata[2]:.{}f}}",
            settings.decimals
        )
    } else {
        String::new()
    };
    traces.push(Trace::Choropleth(ChoroplethTrace {
        name: "hover_info".to_string(),
        locations: hover_locations,
        z: hover_z,
        zmin: None,
        zmax: None,
        geojson: None,
        locationmode: Some("USA-states".to_string()),
        colorscale: None,
        colorbar: None,
        showscale: Some(false),
        hoverinfo: None,
        hovertemplate: Some(format!(
            "<b>%{{customdata[0]}}</b><br>Sample size: %{{customdata[1]:,}}<br>{}: %{{z:.{}f}}{}<extra></extra>",
            gradient_label, settings.decimals, hover_extra
        )),
        customdata: Some(hover_data),
        marker: Some(json!({ "opacity": 0 })),
    }));

    if show_markers {
        let values: Vec<f64> = marker_values.iter().map(|(_, v)| *v).collect();
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        for (abbreviation, v) in marker_values.iter() {
            let t = if hi > lo { (v - lo) / (hi - lo) } else { 0.5 };
            let marker = match sample_colorscale(&settings.impact_colormap, t) {
                Some(color) => json!({ "size": v, "color": color }),
                None => {
                    warn!(
                        "make_map: unknown colour scale {:?}, impact markers are not coloured",
                        settings.impact_colormap
                    );
                    json!({ "size": v })
                }
            };
            traces.push(Trace::Scattergeo(ScatterGeoTrace {
                name: "impact_scatter".to_string(),
                locations: vec![abbreviation.clone()],
                locationmode: "USA-states".to_string(),
                mode: "markers".to_string(),
                text: None,
                marker: Some(marker),
                hoverinfo: Some("skip".to_string()),
                showlegend: Some(false),
            }));
        }
    }

    let abbreviations: Vec<String> = data
        .state_rows()
        .iter()
        .map(|sr| sr.state_abbreviated.clone())
        .collect();
    traces.push(Trace::Scattergeo(ScatterGeoTrace {
        name: "abbr_labels".to_string(),
        locations: abbreviations.clone(),
        locationmode: "USA-states".to_string(),
        mode: "text".to_string(),
        text: Some(abbreviations),
        marker: None,
        hoverinfo: Some("skip".to_string()),
        showlegend: Some(false),
    }));

    let m = settings.margins;
    let mut layout = json!({
        "geo": { "scope": "usa", "visible": false },
        "margin": { "l": m.l, "r": m.r, "t": m.t, "b": m.b },
    });
    if let Some(region) = clicked_region {
        layout["title"] = json!({
            "text": outline_caption(&region.display_name()),
            "font": { "size": 18 },
            "x": 0.5,
            "y": 0.05,
            "xanchor": "center",
        });
    }

    Ok(Figure {
        data: traces,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::*;

    fn choropleth<'a>(fig: &'a Figure, name: &str) -> &'a ChoroplethTrace {
        match fig.traces_named(name).first().copied() {
            Some(Trace::Choropleth(c)) => c,
            x => panic!("no choropleth {}: {:?}", name, x),
        }
    }

    #[test]
    fn opinion_map() {
        let data = survey();
        let fig = make_map(
            &data,
            &MapRequest::new("q2", "1", "3+"),
            &MapSettings::DEFAULT,
        )
        .unwrap();
        let expected = data
            .opinions_state
            .iter()
            .filter(|r| r.question == "q2" && r.sub_question == "1" && r.outcome == "3+")
            .count();
        let main = choropleth(&fig, "main_map");
        assert_eq!(main.z.len(), expected);
        assert_eq!(main.z.len(), STATE_ABBREVIATIONS.len());
        let (zmin, zmax) = (main.zmin.unwrap(), main.zmax.unwrap());
        assert!(zmin >= 0.0 && zmax <= 100.0);
        assert!(main.z.iter().all(|z| *z >= zmin && *z <= zmax));
        assert_eq!(main.colorscale.as_deref(), Some("Viridis"));

        // Nothing is clicked.
        assert!(choropleth(&fig, "clicked_state").locations.is_empty());
        assert!(fig.layout.get("title").is_none());

        let hover = choropleth(&fig, "hover_info");
        assert_eq!(hover.locations.len(), data.state_rows().len());
        assert_eq!(fig.traces_named("abbr_labels").len(), 1);
        assert_eq!(fig.traces_named("impact_scatter").len(), 0);
        assert_eq!(fig.layout["geo"]["scope"], "usa");
    }

    #[test]
    fn clicked_cluster_is_outlined() {
        let data = survey();
        let req = MapRequest::new("q2", "1", "3+")
            .with_clicked_state(Some("Idaho, Montana, Wyoming (Cluster B)"));
        let fig = make_map(&data, &req, &MapSettings::DEFAULT).unwrap();
        let clicked = choropleth(&fig, "clicked_state");
        assert_eq!(clicked.locations, vec!["Idaho, Montana, Wyoming (Cluster B)"]);
        assert_eq!(clicked.showscale, Some(false));
        assert_eq!(clicked.marker.as_ref().unwrap()["line"]["color"], "yellow");
        assert_eq!(
            fig.layout["title"]["text"],
            "You're looking at data for Idaho, Montana, and Wyoming (Cluster B)"
        );

        let req = MapRequest::new("q2", "1", "3+").with_clicked_state(Some("Atlantis"));
        assert!(make_map(&data, &req, &MapSettings::DEFAULT).is_err());
    }

    #[test]
    fn impact_as_gradient() {
        let data = survey();
        let req =
            MapRequest::new("q2", "1", "3+").with_impact(Some("wildfire"), ImpactDisplay::Gradient);
        let fig = make_map(&data, &req, &MapSettings::DEFAULT).unwrap();
        let main = choropleth(&fig, "main_map");
        assert_eq!(main.colorscale.as_deref(), Some("OrRd"));
        for (z, expected) in main.z.iter().zip([10.0, 20.0, 30.0, 40.0]) {
            assert!((z - expected).abs() < 1e-9);
        }
        assert!((main.zmin.unwrap() - 5.0).abs() < 1e-9);
        assert!((main.zmax.unwrap() - 45.0).abs() < 1e-9);
        let hover = choropleth(&fig, "hover_info");
        assert!(hover.customdata.as_ref().unwrap().iter().all(|c| c.len() == 3));
    }

    #[test]
    fn impact_as_markers() {
        let data = survey();
        let req =
            MapRequest::new("q2", "1", "3+").with_impact(Some("heat"), ImpactDisplay::Markers);
        let fig = make_map(&data, &req, &MapSettings::DEFAULT).unwrap();
        assert_eq!(choropleth(&fig, "main_map").colorscale.as_deref(), Some("Viridis"));
        assert_eq!(
            fig.traces_named("impact_scatter").len(),
            data.state_rows().len()
        );
        let hover = choropleth(&fig, "hover_info");
        assert!(hover.customdata.as_ref().unwrap().iter().all(|c| c.len() == 3));
    }

    #[test]
    fn missing_data_is_an_error() {
        let data = survey();
        let settings = MapSettings::DEFAULT;
        assert!(matches!(
            make_map(&data, &MapRequest::new("q2", "9", "3+"), &settings),
            Err(SurveyError::NoOpinionData { .. })
        ));
        let req =
            MapRequest::new("q2", "1", "3+").with_impact(Some("flood"), ImpactDisplay::Gradient);
        assert!(matches!(
            make_map(&data, &req, &settings),
            Err(SurveyError::NoImpactData { .. })
        ));
    }

    #[test]
    fn color_range_is_clamped() {
        assert_eq!(color_range(&[1.0, 2.0], 5.0), Some((0.0, 7.0)));
        assert_eq!(color_range(&[98.0, 99.0], 5.0), Some((93.0, 100.0)));
        assert_eq!(color_range(&[-3.0, 120.0], 0.0), Some((0.0, 100.0)));
        assert_eq!(color_range(&[], 5.0), None);
    }
}

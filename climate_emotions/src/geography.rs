//! States, clusters of states and their shapes.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, PolygonType, Value};
use log::debug;
use serde_json::json;
use snafu::{ensure, OptionExt};
use std::collections::HashMap;

use crate::*;

/// Renamings applied to the standard US states file before matching the
/// survey names.
pub const DEFAULT_STATE_NAME_OVERRIDES: [(&str, &str); 1] =
    [("District of Columbia", "Washington DC")];

/// A state or a cluster of states, parsed once from the dictionary.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Region {
    /// The label used in all the survey tables.
    pub label: String,
    /// The member states, in the order of the label.
    pub member_states: Vec<String>,
    /// The abbreviations, positionally matching `member_states`.
    pub abbreviations: Vec<String>,
    /// For example `Cluster E`.
    pub cluster: Option<String>,
}

impl Region {
    /// Parses a dictionary entry.
    ///
    /// Clusters must be written `"StateA, StateB (Cluster X)"`; any label
    /// mentioning a cluster in another form is rejected. Other labels are
    /// split on `", "` the same way, one member per abbreviation.
    pub fn parse(label: &str, abbreviations: &str) -> SurveyResult<Region> {
        let (member_states, cluster): (Vec<String>, Option<String>) = if label.contains("Cluster")
        {
            let (states, rest) = label
                .rsplit_once(" (Cluster ")
                .context(MalformedClusterLabelSnafu { label })?;
            let cluster_id = rest
                .strip_suffix(')')
                .context(MalformedClusterLabelSnafu { label })?;
            ensure!(
                !states.trim().is_empty() && !cluster_id.trim().is_empty(),
                MalformedClusterLabelSnafu { label }
            );
            (
                states.split(", ").map(|s| s.trim().to_string()).collect(),
                Some(format!("Cluster {}", cluster_id)),
            )
        } else {
            (label.split(", ").map(|s| s.trim().to_string()).collect(), None)
        };

        let abbreviations: Vec<String> = abbreviations
            .split(", ")
            .map(|s| s.trim().to_string())
            .collect();
        ensure!(
            abbreviations.len() == member_states.len(),
            AbbreviationMismatchSnafu {
                label,
                num_states: member_states.len(),
                num_abbreviations: abbreviations.len()
            }
        );
        Ok(Region {
            label: label.to_string(),
            member_states,
            abbreviations,
            cluster,
        })
    }

    pub fn is_cluster(&self) -> bool {
        self.cluster.is_some()
    }

    /// A readable name: `"Idaho, Montana, and Wyoming (Cluster B)"`.
    pub fn display_name(&self) -> String {
        let names = match self.member_states.as_slice() {
            [] => String::new(),
            [single] => single.clone(),
            [first, second] => format!("{} and {}", first, second),
            [init @ .., last] => format!("{}, and {}", init.join(", "), last),
        };
        match &self.cluster {
            Some(c) => format!("{} ({})", names, c),
            None => names,
        }
    }
}

/// One individual state, with the label of the region it belongs to.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StateRow {
    pub state: String,
    pub single_state: String,
    pub state_abbreviated: String,
}

/// Flattens the clusters: one row per individual state, still carrying the
/// label of its cluster for joining with the survey tables.
pub fn long_format(regions: &[Region]) -> Vec<StateRow> {
    regions
        .iter()
        .flat_map(|r| {
            r.member_states
                .iter()
                .zip(r.abbreviations.iter())
                .map(move |(s, a)| StateRow {
                    state: r.label.clone(),
                    single_state: s.clone(),
                    state_abbreviated: a.clone(),
                })
        })
        .collect()
}

/// The clusters only, by display name, with the abbreviations of their
/// members.
pub fn clusters(regions: &[Region]) -> Vec<(String, Vec<String>)> {
    regions
        .iter()
        .filter(|r| r.is_cluster())
        .map(|r| (r.display_name(), r.abbreviations.clone()))
        .collect()
}

pub(crate) fn feature_id(f: &Feature) -> Option<String> {
    match &f.id {
        Some(Id::String(s)) => Some(s.clone()),
        Some(Id::Number(n)) => Some(n.to_string()),
        None => None,
    }
}

fn feature_name(f: &Feature) -> Option<String> {
    f.properties
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// The number of linear rings of a (multi-)polygon.
pub fn ring_count(geometry: &Geometry) -> usize {
    match &geometry.value {
        Value::Polygon(p) => p.len(),
        Value::MultiPolygon(mp) => mp.iter().map(|p| p.len()).sum(),
        _ => 0,
    }
}

fn polygons_of(state: &str, f: &Feature) -> SurveyResult<Vec<PolygonType>> {
    let geometry = f
        .geometry
        .as_ref()
        .context(MissingGeometrySnafu { state })?;
    match &geometry.value {
        Value::Polygon(p) => Ok(vec![p.clone()]),
        Value::MultiPolygon(mp) => Ok(mp.clone()),
        _ => UnsupportedGeometrySnafu { state }.fail(),
    }
}

fn relabel(f: &mut Feature, label: &str) {
    f.id = Some(Id::String(label.to_string()));
    if let Some(props) = f.properties.as_mut() {
        props.insert("name".to_string(), json!(label));
        props.remove("density");
    }
}

/// Creates the shapes of the survey regions from the standard US states.
///
/// Single states are passed through with their label as id. The states of
/// a cluster are merged into one multi-polygon named after the cluster.
pub fn build_survey_geography(
    us_states: &FeatureCollection,
    regions: &[Region],
    name_overrides: &[(String, String)],
) -> SurveyResult<FeatureCollection> {
    let mut by_name: HashMap<String, &Feature> = us_states
        .features
        .iter()
        .filter_map(|f| feature_name(f).map(|n| (n, f)))
        .collect();
    for (old_name, new_name) in name_overrides.iter() {
        if let Some(f) = by_name.remove(old_name) {
            by_name.insert(new_name.clone(), f);
        } else {
            debug!(
                "build_survey_geography: no state named {:?} to rename",
                old_name
            );
        }
    }

    let mut features: Vec<Feature> = Vec::new();
    for region in regions.iter() {
        if !region.is_cluster() {
            debug!("build_survey_geography: adding state {}", region.label);
            let mut f = (*by_name
                .get(&region.label)
                .context(MissingGeometrySnafu {
                    state: region.label.clone(),
                })?)
            .clone();
            relabel(&mut f, &region.label);
            features.push(f);
            continue;
        }

        debug!("build_survey_geography: adding cluster {}", region.label);
        let mut merged: Option<(Feature, Vec<PolygonType>)> = None;
        for state in region.member_states.iter() {
            debug!("build_survey_geography: \tadding state {}", state);
            let f = by_name
                .get(state)
                .context(MissingGeometrySnafu { state })?;
            let polygons = polygons_of(state, f)?;
            match merged.as_mut() {
                None => merged = Some(((*f).clone(), polygons)),
                Some((_, acc)) => acc.extend(polygons),
            }
        }
        let (mut f, polygons) = merged.context(MalformedClusterLabelSnafu {
            label: region.label.clone(),
        })?;
        f.geometry = Some(Geometry::new(Value::MultiPolygon(polygons)));
        relabel(&mut f, &region.label);
        features.push(f);
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

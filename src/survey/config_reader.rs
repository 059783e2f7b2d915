use crate::survey::*;

use climate_emotions::geography::DEFAULT_STATE_NAME_OVERRIDES;
use climate_emotions::{BarSettings, MapSettings, Margins, MAX_DECIMALS};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NameOverride {
    pub from: String,
    pub to: String,
}

/// Where the input files are. All the paths are relative to the directory
/// of the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSettings {
    #[serde(rename = "surveyResults")]
    pub survey_results: Option<String>,
    #[serde(rename = "dataDictionaries")]
    pub data_dictionaries: Option<String>,
    #[serde(rename = "usStates")]
    pub us_states: Option<String>,
    #[serde(rename = "surveyStates")]
    pub survey_states: Option<String>,
    #[serde(rename = "prerenderedFigures")]
    pub prerendered_figures: Option<String>,
    #[serde(rename = "nationalSampleSize")]
    pub national_sample_size: Option<u64>,
    #[serde(rename = "stateNameOverrides")]
    pub state_name_overrides: Option<Vec<NameOverride>>,
}

impl DataSettings {
    pub fn survey_results(&self) -> &str {
        self.survey_results.as_deref().unwrap_or("survey_results")
    }

    pub fn data_dictionaries(&self) -> &str {
        self.data_dictionaries
            .as_deref()
            .unwrap_or("data_dictionaries")
    }

    pub fn us_states(&self) -> &str {
        self.us_states.as_deref().unwrap_or("us_states.json")
    }

    pub fn survey_states(&self) -> &str {
        self.survey_states.as_deref().unwrap_or("survey_states.json")
    }

    pub fn prerendered_figures(&self) -> &str {
        self.prerendered_figures
            .as_deref()
            .unwrap_or("prerendered_figures.json")
    }

    pub fn name_overrides(&self) -> Vec<(String, String)> {
        match &self.state_name_overrides {
            Some(l) => l.iter().map(|o| (o.from.clone(), o.to.clone())).collect(),
            None => DEFAULT_STATE_NAME_OVERRIDES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

/// Bounds the number of decimals of the percentages.
pub fn clamp_decimals(decimals: usize) -> usize {
    if decimals > MAX_DECIMALS {
        warn!(
            "{} decimals requested, using {} instead",
            decimals, MAX_DECIMALS
        );
    }
    decimals.min(MAX_DECIMALS)
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(rename = "colormapRangePadding")]
    pub colormap_range_padding: Option<f64>,
    #[serde(rename = "opinionColormap")]
    pub opinion_colormap: Option<String>,
    #[serde(rename = "impactColormap")]
    pub impact_colormap: Option<String>,
    #[serde(rename = "decimals")]
    pub decimals: Option<usize>,
    #[serde(rename = "margins")]
    pub margins: Option<Margins>,
    #[serde(rename = "clickedOutlineWidth")]
    pub clicked_outline_width: Option<u32>,
    #[serde(rename = "clickedOutlineColor")]
    pub clicked_outline_color: Option<String>,
}

impl MapConfig {
    pub fn settings(&self) -> MapSettings {
        let d = MapSettings::DEFAULT;
        MapSettings {
            colormap_range_padding: self
                .colormap_range_padding
                .unwrap_or(d.colormap_range_padding),
            opinion_colormap: self
                .opinion_colormap
                .clone()
                .map(Cow::Owned)
                .unwrap_or(d.opinion_colormap),
            impact_colormap: self
                .impact_colormap
                .clone()
                .map(Cow::Owned)
                .unwrap_or(d.impact_colormap),
            decimals: clamp_decimals(self.decimals.unwrap_or(d.decimals)),
            margins: self.margins.unwrap_or(d.margins),
            clicked_outline_width: self
                .clicked_outline_width
                .unwrap_or(d.clicked_outline_width),
            clicked_outline_color: self
                .clicked_outline_color
                .clone()
                .map(Cow::Owned)
                .unwrap_or(d.clicked_outline_color),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarConfig {
    #[serde(rename = "decimals")]
    pub decimals: Option<usize>,
    #[serde(rename = "fontSize")]
    pub font_size: Option<u32>,
    #[serde(rename = "height")]
    pub height: Option<f64>,
    #[serde(rename = "stratifiedHeightFactor")]
    pub stratified_height_factor: Option<f64>,
    #[serde(rename = "margins")]
    pub margins: Option<Margins>,
    #[serde(rename = "titleFontSize")]
    pub title_font_size: Option<u32>,
    #[serde(rename = "titleWrap")]
    pub title_wrap: Option<usize>,
    #[serde(rename = "facetRowSpacing")]
    pub facet_row_spacing: Option<f64>,
    #[serde(rename = "textWrap")]
    pub text_wrap: Option<usize>,
}

impl BarConfig {
    pub fn settings(&self) -> BarSettings {
        let d = BarSettings::DEFAULT;
        BarSettings {
            decimals: clamp_decimals(self.decimals.unwrap_or(d.decimals)),
            font_size: self.font_size.unwrap_or(d.font_size),
            height: self.height.unwrap_or(d.height),
            stratified_height_factor: self
                .stratified_height_factor
                .unwrap_or(d.stratified_height_factor),
            margins: self.margins.unwrap_or(d.margins),
            title_font_size: self.title_font_size.unwrap_or(d.title_font_size),
            title_wrap: self.title_wrap.unwrap_or(d.title_wrap),
            facet_row_spacing: self.facet_row_spacing.unwrap_or(d.facet_row_spacing),
            text_wrap: self.text_wrap.unwrap_or(d.text_wrap),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "dataSettings", default)]
    pub data_settings: DataSettings,
    #[serde(rename = "mapSettings", default)]
    pub map_settings: MapConfig,
    #[serde(rename = "barSettings", default)]
    pub bar_settings: BarConfig,
}

pub fn read_config(path: &str) -> CliResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: SurveyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a figure stored in JSON format.
pub fn read_reference(path: &str) -> CliResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config() {
        let config: SurveyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.data_settings.survey_results(), "survey_results");
        assert_eq!(config.map_settings.settings(), MapSettings::DEFAULT);
        assert_eq!(config.bar_settings.settings(), BarSettings::DEFAULT);
        assert_eq!(
            config.data_settings.name_overrides(),
            vec![(
                "District of Columbia".to_string(),
                "Washington DC".to_string()
            )]
        );
    }

    #[test]
    fn partial_settings() {
        let config: SurveyConfig = serde_json::from_str(
            r#"{
                "dataSettings": {"nationalSampleSize": 900, "stateNameOverrides": []},
                "mapSettings": {"opinionColormap": "Blues", "margins": {"l": 1, "r": 2, "t": 3, "b": 4}},
                "barSettings": {"decimals": 0, "height": 100}
            }"#,
        )
        .unwrap();
        assert_eq!(config.data_settings.national_sample_size, Some(900));
        assert!(config.data_settings.name_overrides().is_empty());
        let map = config.map_settings.settings();
        assert_eq!(map.opinion_colormap, "Blues");
        assert_eq!(map.margins.t, 3);
        assert_eq!(map.decimals, 1);
        let bars = config.bar_settings.settings();
        assert_eq!(bars.decimals, 0);
        assert_eq!(bars.height, 100.0);
        assert_eq!(bars.text_wrap, BarSettings::DEFAULT.text_wrap);
    }

    #[test]
    fn decimals_are_bounded() {
        let config: SurveyConfig = serde_json::from_str(
            r#"{"mapSettings": {"decimals": 300}, "barSettings": {"decimals": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.map_settings.settings().decimals, MAX_DECIMALS);
        assert_eq!(config.bar_settings.settings().decimals, 4);
        assert_eq!(clamp_decimals(usize::MAX), MAX_DECIMALS);
        assert_eq!(clamp_decimals(0), 0);
    }
}

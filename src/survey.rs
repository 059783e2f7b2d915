use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use climate_emotions::bars::make_stacked_bar;
use climate_emotions::builder::SurveyDataBuilder;
use climate_emotions::cache::FigureCache;
use climate_emotions::descriptive::make_descriptive_plots;
use climate_emotions::geography::{build_survey_geography, Region};
use climate_emotions::handlers::{
    extract_question_subquestion, parse_threshold_control, question_options,
    update_all_question_bars, update_selected_question_bar, SelectionState,
};
use climate_emotions::map::{make_map, ImpactDisplay, MapRequest};
use climate_emotions::selector::{OpinionQuery, SubQuestionSelection};
use climate_emotions::*;

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
pub use crate::survey::config_reader::*;
use crate::survey::io_common::*;
use crate::survey::io_geojson::*;
use crate::survey::io_tsv::read_tsv;

pub mod config_reader;
pub mod io_common;
pub mod io_geojson;
pub mod io_tsv;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error converting to JSON"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error opening table {path}"))]
    OpeningTsv { source: csv::Error, path: String },
    #[snafu(display("Error reading table {path} at line {lineno}"))]
    ParsingTsv {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error parsing GeoJSON file {path}"))]
    ParsingGeoJson {
        source: geojson::Error,
        path: String,
    },
    #[snafu(display("{path} is not a GeoJSON feature collection"))]
    NotAFeatureCollection { path: String },
    #[snafu(display("No parent directory for {path}"))]
    MissingParentDir { path: String },

    #[snafu(context(false), display("{source}"))]
    Survey { source: SurveyError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CliResult<T> = Result<T, CliError>;

/// The tables of the survey results.
pub const RESULT_TABLES: [&str; 7] = [
    "opinions_wholesample.tsv",
    "opinions_state.tsv",
    "opinions_party.tsv",
    "samplesizes_state.tsv",
    "samplesizes_party.tsv",
    "sampledesc_wholesample.tsv",
    "sampledesc_state.tsv",
];

pub const DICTIONARY_TABLES: [&str; 6] = [
    "question_dictionary.tsv",
    "subquestion_dictionary.tsv",
    "outcome_dictionary.tsv",
    "state_abbreviations.tsv",
    "demographics_dictionary.tsv",
    "impacts_list.tsv",
];

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FigureKind {
    Map,
    Bars,
    Descriptive,
    SurveyGeojson,
    Prerender,
}

impl FromStr for FigureKind {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<FigureKind> {
        match s {
            "map" => Ok(FigureKind::Map),
            "bars" => Ok(FigureKind::Bars),
            "descriptive" => Ok(FigureKind::Descriptive),
            "survey-geojson" => Ok(FigureKind::SurveyGeojson),
            "prerender" => Ok(FigureKind::Prerender),
            x => whatever!(
                "Unknown figure {:?}: expected map, bars, descriptive, survey-geojson or prerender",
                x
            ),
        }
    }
}

/// The survey data, with the fingerprint of the tables it was read from.
pub struct LoadedSurvey {
    pub data: SurveyData,
    pub fingerprint: String,
}

fn read_regions(settings: &DataSettings, root: &Path) -> CliResult<Vec<StateAbbreviation>> {
    let dicts = resolve(root, settings.data_dictionaries());
    read_tsv(&dicts.join("state_abbreviations.tsv"))
}

fn parse_regions(abbreviations: &[StateAbbreviation]) -> CliResult<Vec<Region>> {
    let regions = abbreviations
        .iter()
        .map(|sa| Region::parse(&sa.state, &sa.state_abbreviated))
        .collect::<SurveyResult<Vec<Region>>>()?;
    Ok(regions)
}

pub fn load_survey(config: &SurveyConfig, root: &Path) -> CliResult<LoadedSurvey> {
    let ds = &config.data_settings;
    let results = resolve(root, ds.survey_results());
    let dicts = resolve(root, ds.data_dictionaries());
    info!(
        "Loading the survey from {} and {}",
        results.display(),
        dicts.display()
    );
    let r = |name: &str| results.join(name);
    let d = |name: &str| dicts.join(name);

    let state_abbreviations = read_regions(ds, root)?;
    let regions = parse_regions(&state_abbreviations)?;
    let geography = survey_states(ds, root, &regions)?;

    let mut builder = SurveyDataBuilder::new()
        .national_opinions(read_tsv(&r("opinions_wholesample.tsv"))?)
        .state_opinions(read_tsv(&r("opinions_state.tsv"))?)
        .party_opinions(read_tsv(&r("opinions_party.tsv"))?)
        .state_sample_sizes(read_tsv(&r("samplesizes_state.tsv"))?)
        .party_sample_sizes(read_tsv(&r("samplesizes_party.tsv"))?)
        .national_sample_description(read_tsv(&r("sampledesc_wholesample.tsv"))?)
        .state_sample_description(read_tsv(&r("sampledesc_state.tsv"))?)
        .questions(read_tsv(&d("question_dictionary.tsv"))?)
        .sub_questions(read_tsv(&d("subquestion_dictionary.tsv"))?)
        .outcomes(read_tsv(&d("outcome_dictionary.tsv"))?)
        .demographics(read_tsv(&d("demographics_dictionary.tsv"))?)
        .impacts(read_tsv(&d("impacts_list.tsv"))?)
        .state_abbreviations(state_abbreviations)
        .survey_geography(geography);
    if let Some(n) = ds.national_sample_size {
        builder = builder.expected_national_sample_size(n);
    }
    let data = builder.build()?;

    // The figures only depend on the tables, not on the shapes.
    let paths: Vec<PathBuf> = RESULT_TABLES
        .iter()
        .map(|n| r(n))
        .chain(DICTIONARY_TABLES.iter().map(|n| d(n)))
        .collect();
    let fingerprint = fingerprint(&paths)?;
    info!(
        "Loaded the survey: {} respondents, {} questions",
        data.national_sample_size(),
        data.questions().len()
    );
    Ok(LoadedSurvey { data, fingerprint })
}

/// The prerendered figures, if they were computed from the same tables.
pub fn load_cache(path: &Path, fingerprint: &str) -> CliResult<FigureCache> {
    let p = path.display().to_string();
    if !path.exists() {
        info!("No prerendered figures at {}", p);
        return Ok(FigureCache::new());
    }
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path: p.clone() })?;
    let cache: FigureCache =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: p.clone() })?;
    if cache.fingerprint() != Some(fingerprint) {
        warn!(
            "The prerendered figures in {} were computed from other tables, ignoring them",
            p
        );
        return Ok(FigureCache::new());
    }
    info!("Loaded {} prerendered figures from {}", cache.len(), p);
    Ok(cache)
}

pub fn make_survey_geojson(config: &SurveyConfig, root: &Path) -> CliResult<JSValue> {
    let ds = &config.data_settings;
    let regions = parse_regions(&read_regions(ds, root)?)?;
    let us_states = read_feature_collection(&resolve(root, ds.us_states()))?;
    let fc = build_survey_geography(&us_states, &regions, &ds.name_overrides())?;
    info!("Built the survey geography: {} regions", fc.features.len());
    serde_json::to_value(&fc).context(SerializingJsonSnafu {})
}

fn to_json<T: serde::Serialize>(x: &T) -> CliResult<JSValue> {
    serde_json::to_value(x).context(SerializingJsonSnafu {})
}

fn threshold_arg(args: &Args) -> CliResult<Option<Threshold>> {
    match &args.threshold {
        Some(t) => Ok(parse_threshold_control(t)?),
        None => Ok(Some(Threshold::DEFAULT)),
    }
}

/// Produces the requested figure in JSON format.
pub fn make_figure(
    kind: FigureKind,
    args: &Args,
    config: &SurveyConfig,
    root: &Path,
) -> CliResult<JSValue> {
    if kind == FigureKind::SurveyGeojson {
        return make_survey_geojson(config, root);
    }

    let LoadedSurvey { data, fingerprint } = load_survey(config, root)?;
    let mut map_settings = config.map_settings.settings();
    let mut bar_settings = config.bar_settings.settings();
    if let Some(decimals) = args.decimals.map(clamp_decimals) {
        map_settings.decimals = decimals;
        bar_settings.decimals = decimals;
    }

    match kind {
        FigureKind::Map => {
            let question_value = match &args.question {
                Some(q) => q.clone(),
                None => match question_options(&data)
                    .first()
                    .and_then(|g| g.items.first())
                {
                    Some(o) => o.value.clone(),
                    None => whatever!("The survey has no questions"),
                },
            };
            let threshold = match threshold_arg(args)? {
                Some(t) => t,
                None => whatever!("The map shows a single threshold: 3+ or 4+"),
            };
            let (question, sub_question) = extract_question_subquestion(&question_value)?;
            let display = if args.impact_markers {
                ImpactDisplay::Markers
            } else {
                ImpactDisplay::Gradient
            };
            let request = MapRequest::new(&question, &sub_question, threshold.outcome())
                .with_clicked_state(args.state.as_deref())
                .with_impact(args.impact.as_deref(), display);
            debug!("make_figure: {:?}", request);
            to_json(&make_map(&data, &request, &map_settings)?)
        }
        FigureKind::Bars => {
            let threshold = threshold_arg(args)?;
            let selection = SelectionState {
                state: args.state.clone(),
                stratify: args.stratify,
                ..SelectionState::default()
            };
            match &args.question {
                Some(value) => {
                    let (question, sub_question) = extract_question_subquestion(value)?;
                    let figure = match SubQuestionSelection::parse(&sub_question) {
                        SubQuestionSelection::All => {
                            let query = OpinionQuery::all(&question)
                                .with_state(selection.state.as_deref())
                                .stratified(selection.stratify)
                                .with_threshold(threshold);
                            make_stacked_bar(&data, &query, &bar_settings)?
                        }
                        SubQuestionSelection::One(_) => update_selected_question_bar(
                            &data,
                            value,
                            &selection,
                            threshold,
                            &bar_settings,
                        )?,
                    };
                    to_json(&figure)
                }
                None => {
                    let cache_p = resolve(root, config.data_settings.prerendered_figures());
                    let cache = load_cache(&cache_p, &fingerprint)?;
                    let figures = update_all_question_bars(
                        &data,
                        &cache,
                        &selection,
                        threshold,
                        &bar_settings,
                    )?;
                    let mut res: JSMap<String, JSValue> = JSMap::new();
                    for (question, figure) in figures.iter() {
                        res.insert(question.clone(), to_json(figure)?);
                    }
                    Ok(JSValue::Object(res))
                }
            }
        }
        FigureKind::Descriptive => to_json(&make_descriptive_plots(
            &data,
            args.state.as_deref(),
            bar_settings.decimals,
        )?),
        FigureKind::Prerender => {
            let cache = FigureCache::build(&data, &bar_settings)?.with_fingerprint(&fingerprint);
            to_json(&cache)
        }
        FigureKind::SurveyGeojson => make_survey_geojson(config, root),
    }
}

/// Compares a figure with a stored reference, and prints the differences.
pub fn check_reference(reference_path: &str, figure: &JSValue) -> CliResult<()> {
    let reference = read_reference(reference_path)?;
    if &reference != figure {
        let pretty_ref = serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
        let pretty_fig = serde_json::to_string_pretty(figure).context(SerializingJsonSnafu {})?;
        warn!("Found differences with the reference figure");
        print_diff(pretty_ref.as_str(), pretty_fig.as_str(), "\n");
        whatever!(
            "Difference detected between the produced figure and the reference {}",
            reference_path
        )
    }
    Ok(())
}

pub fn run_figure(args: &Args) -> CliResult<()> {
    let kind = match &args.figure {
        Some(f) => f.parse::<FigureKind>()?,
        None => FigureKind::Map,
    };
    let (config, config_root) = match &args.config {
        Some(config_path) => {
            let root = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {
                    path: config_path.clone(),
                })?
                .to_path_buf();
            (read_config(config_path)?, root)
        }
        None => (SurveyConfig::default(), PathBuf::from(".")),
    };
    let root = match &args.data_dir {
        Some(d) => PathBuf::from(d),
        None => config_root,
    };
    info!("Producing {:?} from {}", kind, root.display());

    let figure = make_figure(kind, args, &config, &root)?;

    // The derived files go to their configured location by default.
    let default_out = match kind {
        FigureKind::SurveyGeojson => Some(config.data_settings.survey_states()),
        FigureKind::Prerender => Some(config.data_settings.prerendered_figures()),
        _ => None,
    }
    .map(|p| resolve(&root, p).display().to_string());
    let out = args.out.clone().or(default_out);

    let pretty = serde_json::to_string_pretty(&figure).context(SerializingJsonSnafu {})?;
    write_output(pretty.as_str(), out.as_deref())?;

    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &figure)?;
    }
    Ok(())
}

/*!
Data selection and figure construction for the US climate emotions survey map.

All the survey tables and dictionaries are gathered once in a [`SurveyData`]
context, which is then passed by reference to the selectors and the
renderers. Renderers return plotly-compatible [`figure::Figure`] documents.

```
use climate_emotions::selector::{select_opinions, OpinionQuery};
use climate_emotions::Threshold;
# use climate_emotions::SurveyResult;
# fn run(data: &climate_emotions::SurveyData) -> SurveyResult<()> {
let slice = select_opinions(
    data,
    &OpinionQuery::single("q2", "1").with_threshold(Some(Threshold::ThreePlus)),
)?;
assert_eq!(slice.outcomes.len(), 2);
# Ok(())
# }
```

See the [`manual`] module for the format of the input tables.
*/
mod config;

pub mod bars;
pub mod builder;
pub mod cache;
pub mod descriptive;
pub mod figure;
pub mod geography;
pub mod handlers;
pub mod manual;
pub mod map;
pub mod selector;

use log::{debug, info};
use serde_json::Value as JSValue;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::collections::{HashMap, HashSet};

pub use crate::config::*;
use crate::geography::{Region, StateRow};

/// Errors caused by a mismatch between the requests and the static survey
/// data. None of them is recoverable: they indicate a configuration problem.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SurveyError {
    #[snafu(display(
        "No data found for question {question}, sub-question {sub_question}, outcome {outcome}"
    ))]
    NoOpinionData {
        question: String,
        sub_question: String,
        outcome: String,
    },
    #[snafu(display("No impact data found for {impact}"))]
    NoImpactData { impact: String },
    #[snafu(display("Unknown question {question}"))]
    UnknownQuestion { question: String },
    #[snafu(display("Unknown state or cluster {state}"))]
    UnknownState { state: String },
    #[snafu(display("No full text for sub-question {sub_question} of question {question}"))]
    MissingSubQuestionText {
        question: String,
        sub_question: String,
    },
    #[snafu(display("No full text for outcome {outcome} of question {question}"))]
    MissingOutcomeText { question: String, outcome: String },
    #[snafu(display("Could not parse states in cluster {label}"))]
    MalformedClusterLabel { label: String },
    #[snafu(display(
        "Cluster {label} has {num_states} states but {num_abbreviations} abbreviations"
    ))]
    AbbreviationMismatch {
        label: String,
        num_states: usize,
        num_abbreviations: usize,
    },
    #[snafu(display("No geometry found for {state}"))]
    MissingGeometry { state: String },
    #[snafu(display("The geometry of {state} is neither a polygon nor a multi-polygon"))]
    UnsupportedGeometry { state: String },
    #[snafu(display("Cannot stratify by party when a state is selected ({state})"))]
    StratifyWithState { state: String },
    #[snafu(display("Sample sizes add up to {actual}, expected {expected}"))]
    SampleSizeMismatch { expected: u64, actual: u64 },
    #[snafu(display("Could not understand question selection {value:?}"))]
    MalformedQuestionValue { value: String },
    #[snafu(display("Unknown response threshold {value:?}"))]
    UnknownThreshold { value: String },
    #[snafu(display("Could not serialize the survey geography"))]
    SerializingGeography { source: serde_json::Error },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// The immutable context holding every table of the survey.
///
/// It is created once with [`builder::SurveyDataBuilder`] and never changed
/// afterwards. All the selections return copies of the rows.
#[derive(Debug, Clone)]
pub struct SurveyData {
    pub(crate) opinions_national: Vec<OpinionRecord>,
    pub(crate) opinions_state: Vec<OpinionRecord>,
    pub(crate) opinions_party: Vec<OpinionRecord>,
    pub(crate) sample_sizes_state: Vec<StateSampleSize>,
    pub(crate) sample_sizes_party: Vec<PartySampleSize>,
    pub(crate) sample_desc_national: Vec<SampleDescriptive>,
    pub(crate) sample_desc_state: Vec<SampleDescriptive>,
    pub(crate) questions: Vec<QuestionEntry>,
    pub(crate) sub_questions: Vec<SubQuestionEntry>,
    pub(crate) outcomes: Vec<OutcomeEntry>,
    pub(crate) demographics: Vec<DemographicEntry>,
    pub(crate) impacts: Vec<ImpactEntry>,
    pub(crate) regions: Vec<Region>,
    pub(crate) state_rows: Vec<StateRow>,
    pub(crate) survey_geography: JSValue,
    pub(crate) sub_question_order: HashMap<String, Vec<String>>,
    pub(crate) national_sample_size: u64,
}

/// The tables, before validation.
#[derive(Debug, Clone)]
pub(crate) struct RawTables {
    pub opinions_national: Vec<OpinionRecord>,
    pub opinions_state: Vec<OpinionRecord>,
    pub opinions_party: Vec<OpinionRecord>,
    pub sample_sizes_state: Vec<StateSampleSize>,
    pub sample_sizes_party: Vec<PartySampleSize>,
    pub sample_desc_national: Vec<SampleDescriptive>,
    pub sample_desc_state: Vec<SampleDescriptive>,
    pub questions: Vec<QuestionEntry>,
    pub sub_questions: Vec<SubQuestionEntry>,
    pub outcomes: Vec<OutcomeEntry>,
    pub demographics: Vec<DemographicEntry>,
    pub impacts: Vec<ImpactEntry>,
    pub state_abbreviations: Vec<StateAbbreviation>,
    pub survey_geography: geojson::FeatureCollection,
    pub expected_national_sample_size: Option<u64>,
}

impl SurveyData {
    pub(crate) fn from_tables(tables: RawTables) -> SurveyResult<SurveyData> {
        info!(
            "Building survey data: {} national, {} state, {} party opinion rows",
            tables.opinions_national.len(),
            tables.opinions_state.len(),
            tables.opinions_party.len()
        );
        let regions: Vec<Region> = tables
            .state_abbreviations
            .iter()
            .map(|sa| Region::parse(&sa.state, &sa.state_abbreviated))
            .collect::<SurveyResult<Vec<Region>>>()?;
        let state_rows = geography::long_format(&regions);
        debug!(
            "from_tables: {} regions, {} individual states",
            regions.len(),
            state_rows.len()
        );

        // Every state label used in the survey tables must be a known region.
        let labels: HashSet<&str> = regions.iter().map(|r| r.label.as_str()).collect();
        let used_labels = tables
            .opinions_state
            .iter()
            .filter_map(|r| r.state.as_deref())
            .chain(tables.sample_sizes_state.iter().map(|s| s.state.as_str()))
            .chain(
                tables
                    .sample_desc_state
                    .iter()
                    .filter_map(|s| s.state.as_deref()),
            );
        for label in used_labels {
            ensure!(labels.contains(label), UnknownStateSnafu { state: label });
        }

        // Every region must be drawable.
        let feature_ids: HashSet<String> = tables
            .survey_geography
            .features
            .iter()
            .filter_map(geography::feature_id)
            .collect();
        for r in regions.iter() {
            ensure!(
                feature_ids.contains(&r.label),
                MissingGeometrySnafu {
                    state: r.label.clone()
                }
            );
        }

        let national_sample_size: u64 = tables.sample_sizes_state.iter().map(|s| s.n).sum();
        if let Some(expected) = tables.expected_national_sample_size {
            ensure!(
                expected == national_sample_size,
                SampleSizeMismatchSnafu {
                    expected,
                    actual: national_sample_size
                }
            );
        }

        let sub_question_order =
            compute_sub_question_order(&tables.opinions_national, &tables.sub_questions);
        let survey_geography =
            serde_json::to_value(&tables.survey_geography).context(SerializingGeographySnafu {})?;

        Ok(SurveyData {
            opinions_national: tables.opinions_national,
            opinions_state: tables.opinions_state,
            opinions_party: tables.opinions_party,
            sample_sizes_state: tables.sample_sizes_state,
            sample_sizes_party: tables.sample_sizes_party,
            sample_desc_national: tables.sample_desc_national,
            sample_desc_state: tables.sample_desc_state,
            questions: tables.questions,
            sub_questions: tables.sub_questions,
            outcomes: tables.outcomes,
            demographics: tables.demographics,
            impacts: tables.impacts,
            regions,
            state_rows,
            survey_geography,
            sub_question_order,
            national_sample_size,
        })
    }

    /// The number of respondents over all the states.
    pub fn national_sample_size(&self) -> u64 {
        self.national_sample_size
    }

    pub fn sample_size(&self, state: &str) -> SurveyResult<u64> {
        self.sample_sizes_state
            .iter()
            .find(|s| s.state == state)
            .map(|s| s.n)
            .context(UnknownStateSnafu { state })
    }

    pub fn party_sample_sizes(&self) -> &[PartySampleSize] {
        &self.sample_sizes_party
    }

    /// The states and clusters, in dictionary order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// One row per individual state.
    pub fn state_rows(&self) -> &[StateRow] {
        &self.state_rows
    }

    pub fn questions(&self) -> &[QuestionEntry] {
        &self.questions
    }

    pub fn impacts(&self) -> &[ImpactEntry] {
        &self.impacts
    }

    pub fn survey_geography(&self) -> &JSValue {
        &self.survey_geography
    }

    /// The sub-questions of a question, in descending order of endorsement
    /// at the default threshold.
    pub fn sub_question_order(&self, question: &str) -> SurveyResult<&[String]> {
        self.sub_question_order
            .get(question)
            .map(|v| v.as_slice())
            .context(UnknownQuestionSnafu { question })
    }

    pub fn sub_questions_of<'a>(
        &'a self,
        question: &'a str,
    ) -> impl Iterator<Item = &'a SubQuestionEntry> + 'a {
        self.sub_questions
            .iter()
            .filter(move |sq| sq.question == question)
    }

    pub fn question_text(&self, question: &str) -> SurveyResult<&str> {
        self.questions
            .iter()
            .find(|q| q.question == question)
            .map(|q| q.full_text.as_str())
            .context(UnknownQuestionSnafu { question })
    }

    pub fn sub_question_text(&self, question: &str, sub_question: &str) -> SurveyResult<&str> {
        self.sub_questions
            .iter()
            .find(|sq| sq.question == question && sq.sub_question == sub_question)
            .map(|sq| sq.full_text.as_str())
            .context(MissingSubQuestionTextSnafu {
                question,
                sub_question,
            })
    }

    /// The human readable text of an outcome.
    ///
    /// Threshold keywords and their complements fall back to the labels of
    /// the threshold when the dictionary does not list them.
    pub fn outcome_text(&self, question: &str, outcome: &str) -> SurveyResult<&str> {
        if let Some(o) = self
            .outcomes
            .iter()
            .find(|o| o.question == question && o.outcome == outcome)
        {
            return Ok(o.full_text.as_str());
        }
        for t in Threshold::ALL.iter() {
            if t.outcome() == outcome {
                return Ok(t.label());
            }
            if t.complement_outcome() == outcome {
                return Ok(t.complement_label());
            }
        }
        MissingOutcomeTextSnafu { question, outcome }.fail()
    }

    /// The display name of a demographic variable. Unknown variables are
    /// shown as-is.
    pub fn demographic_text<'a>(&'a self, demographic_variable: &'a str) -> &'a str {
        self.demographics
            .iter()
            .find(|d| d.demographic_variable == demographic_variable)
            .map(|d| d.full_text.as_str())
            .unwrap_or(demographic_variable)
    }

    pub fn is_impact(&self, demographic_variable: &str) -> bool {
        self.impacts.iter().any(|i| i.impact == demographic_variable)
    }
}

/// Orders the sub-questions of every question by decreasing share of
/// respondents at the default threshold, over the whole sample.
/// Sub-questions without a threshold row come last, in dictionary order.
fn compute_sub_question_order(
    national: &[OpinionRecord],
    sub_questions: &[SubQuestionEntry],
) -> HashMap<String, Vec<String>> {
    let mut all: Vec<(String, String)> = sub_questions
        .iter()
        .map(|sq| (sq.question.clone(), sq.sub_question.clone()))
        .collect();
    // Sub-questions present in the data but missing from the dictionary.
    for r in national.iter() {
        let p = (r.question.clone(), r.sub_question.clone());
        if !all.contains(&p) {
            all.push(p);
        }
    }

    let mut res: HashMap<String, Vec<(String, Option<f64>)>> = HashMap::new();
    for (q, sq) in all {
        let endorsement = national
            .iter()
            .find(|r| {
                r.question == q
                    && r.sub_question == sq
                    && r.outcome == Threshold::DEFAULT.outcome()
            })
            .map(|r| r.percentage);
        res.entry(q).or_default().push((sq, endorsement));
    }

    res.into_iter()
        .map(|(q, mut sqs)| {
            // Stable sort: ties keep the dictionary order.
            sqs.sort_by(|(_, a), (_, b)| match (a, b) {
                (Some(x), Some(y)) => y.total_cmp(x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
            debug!("compute_sub_question_order: {}: {:?}", q, sqs);
            (q, sqs.into_iter().map(|(sq, _)| sq).collect())
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_data;

pub use crate::config::*;
use crate::{RawTables, SurveyData, SurveyResult};

use geojson::FeatureCollection;

/// A builder for assembling the survey data context.
///
/// The tables are only validated when calling [`SurveyDataBuilder::build`].
///
/// ```
/// use climate_emotions::builder::SurveyDataBuilder;
/// use climate_emotions::StateAbbreviation;
/// # use climate_emotions::SurveyError;
///
/// let survey_states = geojson::FeatureCollection {
///     bbox: None,
///     features: vec![],
///     foreign_members: None,
/// };
/// let data = SurveyDataBuilder::new()
///     .state_abbreviations(vec![])
///     .survey_geography(survey_states)
///     .build()?;
/// assert_eq!(data.national_sample_size(), 0);
///
/// # Ok::<(), SurveyError>(())
/// ```
pub struct SurveyDataBuilder {
    pub(crate) _tables: RawTables,
}

impl Default for SurveyDataBuilder {
    fn default() -> Self {
        SurveyDataBuilder::new()
    }
}

impl SurveyDataBuilder {
    pub fn new() -> SurveyDataBuilder {
        SurveyDataBuilder {
            _tables: RawTables {
                opinions_national: Vec::new(),
                opinions_state: Vec::new(),
                opinions_party: Vec::new(),
                sample_sizes_state: Vec::new(),
                sample_sizes_party: Vec::new(),
                sample_desc_national: Vec::new(),
                sample_desc_state: Vec::new(),
                questions: Vec::new(),
                sub_questions: Vec::new(),
                outcomes: Vec::new(),
                demographics: Vec::new(),
                impacts: Vec::new(),
                state_abbreviations: Vec::new(),
                survey_geography: FeatureCollection {
                    bbox: None,
                    features: Vec::new(),
                    foreign_members: None,
                },
                expected_national_sample_size: None,
            },
        }
    }

    pub fn national_opinions(mut self, rows: Vec<OpinionRecord>) -> SurveyDataBuilder {
        self._tables.opinions_national = rows;
        self
    }

    pub fn state_opinions(mut self, rows: Vec<OpinionRecord>) -> SurveyDataBuilder {
        self._tables.opinions_state = rows;
        self
    }

    pub fn party_opinions(mut self, rows: Vec<OpinionRecord>) -> SurveyDataBuilder {
        self._tables.opinions_party = rows;
        self
    }

    pub fn state_sample_sizes(mut self, rows: Vec<StateSampleSize>) -> SurveyDataBuilder {
        self._tables.sample_sizes_state = rows;
        self
    }

    pub fn party_sample_sizes(mut self, rows: Vec<PartySampleSize>) -> SurveyDataBuilder {
        self._tables.sample_sizes_party = rows;
        self
    }

    pub fn national_sample_description(
        mut self,
        rows: Vec<SampleDescriptive>,
    ) -> SurveyDataBuilder {
        self._tables.sample_desc_national = rows;
        self
    }

    pub fn state_sample_description(mut self, rows: Vec<SampleDescriptive>) -> SurveyDataBuilder {
        self._tables.sample_desc_state = rows;
        self
    }

    pub fn questions(mut self, rows: Vec<QuestionEntry>) -> SurveyDataBuilder {
        self._tables.questions = rows;
        self
    }

    pub fn sub_questions(mut self, rows: Vec<SubQuestionEntry>) -> SurveyDataBuilder {
        self._tables.sub_questions = rows;
        self
    }

    pub fn outcomes(mut self, rows: Vec<OutcomeEntry>) -> SurveyDataBuilder {
        self._tables.outcomes = rows;
        self
    }

    pub fn demographics(mut self, rows: Vec<DemographicEntry>) -> SurveyDataBuilder {
        self._tables.demographics = rows;
        self
    }

    pub fn impacts(mut self, rows: Vec<ImpactEntry>) -> SurveyDataBuilder {
        self._tables.impacts = rows;
        self
    }

    pub fn state_abbreviations(mut self, rows: Vec<StateAbbreviation>) -> SurveyDataBuilder {
        self._tables.state_abbreviations = rows;
        self
    }

    /// The shapes of the survey regions, one feature per state or cluster,
    /// identified by the region label.
    pub fn survey_geography(mut self, geography: FeatureCollection) -> SurveyDataBuilder {
        self._tables.survey_geography = geography;
        self
    }

    /// If set, the state sample sizes must add up to this number.
    pub fn expected_national_sample_size(mut self, n: u64) -> SurveyDataBuilder {
        self._tables.expected_national_sample_size = Some(n);
        self
    }

    /// Adds a single opinion row. The table is picked from the scope of the
    /// row: per-state if it has a state, per-party if it has a party,
    /// national otherwise.
    pub fn add_opinion(&mut self, record: OpinionRecord) {
        if record.state.is_some() {
            self._tables.opinions_state.push(record);
        } else if record.party.is_some() {
            self._tables.opinions_party.push(record);
        } else {
            self._tables.opinions_national.push(record);
        }
    }

    pub fn add_state_sample_size(&mut self, state: &str, n: u64) {
        self._tables.sample_sizes_state.push(StateSampleSize {
            state: state.to_string(),
            n,
        });
    }

    /// Validates the tables and creates the data context.
    pub fn build(self) -> SurveyResult<SurveyData> {
        SurveyData::from_tables(self._tables)
    }
}

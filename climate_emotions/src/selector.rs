//! Selection of the survey rows needed by one figure.
//!
//! The selectors only read the data context: every call returns fresh copies
//! of the rows, so calling them twice with the same query gives the same
//! result.

use log::debug;
use snafu::ensure;
use std::cmp::Ordering;
use std::fmt::Display;

use crate::*;

/// Which sub-questions of a question to show.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum SubQuestionSelection {
    One(String),
    /// Every sub-question, each one as a separate facet.
    All,
}

impl SubQuestionSelection {
    /// `"all"` selects every sub-question, any other value a single one.
    pub fn parse(s: &str) -> SubQuestionSelection {
        if s == "all" {
            SubQuestionSelection::All
        } else {
            SubQuestionSelection::One(s.to_string())
        }
    }

    fn matches(&self, sub_question: &str) -> bool {
        match self {
            SubQuestionSelection::One(s) => s == sub_question,
            SubQuestionSelection::All => true,
        }
    }
}

impl Display for SubQuestionSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubQuestionSelection::One(s) => write!(f, "{}", s),
            SubQuestionSelection::All => write!(f, "all"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct OpinionQuery {
    pub question: String,
    pub sub_question: SubQuestionSelection,
    /// When set, the responses are reduced to the endorsed share and its
    /// complement.
    pub threshold: Option<Threshold>,
    /// Restricts to one state or cluster label.
    pub state: Option<String>,
    /// Splits the responses by party. Cannot be combined with a state.
    pub stratify: bool,
}

impl OpinionQuery {
    /// One sub-question over the whole sample, at full granularity.
    pub fn single(question: &str, sub_question: &str) -> OpinionQuery {
        OpinionQuery {
            question: question.to_string(),
            sub_question: SubQuestionSelection::One(sub_question.to_string()),
            threshold: None,
            state: None,
            stratify: false,
        }
    }

    /// All the sub-questions of a question.
    pub fn all(question: &str) -> OpinionQuery {
        OpinionQuery {
            question: question.to_string(),
            sub_question: SubQuestionSelection::All,
            threshold: None,
            state: None,
            stratify: false,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<Threshold>) -> OpinionQuery {
        self.threshold = threshold;
        self
    }

    pub fn with_state(mut self, state: Option<&str>) -> OpinionQuery {
        self.state = state.map(|s| s.to_string());
        self
    }

    pub fn stratified(mut self, stratify: bool) -> OpinionQuery {
        self.stratify = stratify;
        self
    }
}

/// What the categories of the bars are.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Axis {
    /// A single bar per sub-question.
    Question,
    /// One bar per party.
    Party,
}

/// The rows selected for a query, with the display order of each axis.
#[derive(PartialEq, Debug, Clone)]
pub struct OpinionSlice {
    pub rows: Vec<OpinionRecord>,
    /// The sub-questions, one facet each.
    pub facets: Vec<String>,
    /// The outcomes, in the order of the bar segments.
    pub outcomes: Vec<String>,
    pub axis: Axis,
    /// The bar categories: the question itself, or the parties.
    pub categories: Vec<String>,
}

impl OpinionSlice {
    /// The row for a facet, a category and an outcome, if any.
    pub fn find(&self, facet: &str, category: &str, outcome: &str) -> Option<&OpinionRecord> {
        self.rows.iter().find(|r| {
            r.sub_question == facet
                && r.outcome == outcome
                && match self.axis {
                    Axis::Question => r.question == category,
                    Axis::Party => r.party.as_deref() == Some(category),
                }
        })
    }
}

/// Orders outcomes by decreasing value: numerically when both values are
/// numbers, as strings otherwise.
pub(crate) fn compare_outcomes_desc(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => y.total_cmp(&x),
        _ => b.cmp(a),
    }
}

fn complement(r: &OpinionRecord, threshold: Threshold) -> OpinionRecord {
    OpinionRecord {
        outcome: threshold.complement_outcome().to_string(),
        percentage: 1.0 - r.percentage,
        ..r.clone()
    }
}

/// Selects the opinion rows for a bar chart.
pub fn select_opinions(data: &SurveyData, query: &OpinionQuery) -> SurveyResult<OpinionSlice> {
    if let (true, Some(state)) = (query.stratify, query.state.as_ref()) {
        return StratifyWithStateSnafu {
            state: state.clone(),
        }
        .fail();
    }
    if let Some(state) = query.state.as_ref() {
        ensure!(
            data.regions.iter().any(|r| &r.label == state),
            UnknownStateSnafu {
                state: state.clone()
            }
        );
    }

    let (table, axis) = if query.stratify {
        (&data.opinions_party, Axis::Party)
    } else if query.state.is_some() {
        (&data.opinions_state, Axis::Question)
    } else {
        (&data.opinions_national, Axis::Question)
    };
    debug!(
        "select_opinions: {:?} ({} rows, axis {:?})",
        query,
        table.len(),
        axis
    );

    let matching = table.iter().filter(|r| {
        r.question == query.question
            && query.sub_question.matches(&r.sub_question)
            && (query.state.is_none() || r.state == query.state)
    });
    let rows: Vec<OpinionRecord> = match query.threshold {
        Some(t) => matching
            .filter(|r| r.outcome == t.outcome())
            .flat_map(|r| [r.clone(), complement(r, t)])
            .collect(),
        None => matching
            .filter(|r| !Threshold::is_reserved_outcome(&r.outcome))
            .cloned()
            .collect(),
    };
    ensure!(
        !rows.is_empty(),
        NoOpinionDataSnafu {
            question: query.question.clone(),
            sub_question: query.sub_question.to_string(),
            outcome: query
                .threshold
                .map(|t| t.outcome().to_string())
                .unwrap_or_else(|| "all".to_string()),
        }
    );

    let facets: Vec<String> = match &query.sub_question {
        SubQuestionSelection::One(s) => vec![s.clone()],
        SubQuestionSelection::All => {
            let mut facets: Vec<String> = data
                .sub_question_order(&query.question)?
                .iter()
                .filter(|sq| rows.iter().any(|r| &r.sub_question == *sq))
                .cloned()
                .collect();
            for r in rows.iter() {
                if !facets.contains(&r.sub_question) {
                    facets.push(r.sub_question.clone());
                }
            }
            facets
        }
    };

    let outcomes: Vec<String> = match query.threshold {
        Some(t) => vec![
            t.outcome().to_string(),
            t.complement_outcome().to_string(),
        ],
        None => {
            let mut outcomes: Vec<String> = Vec::new();
            for r in rows.iter() {
                if !outcomes.contains(&r.outcome) {
                    outcomes.push(r.outcome.clone());
                }
            }
            outcomes.sort_by(|a, b| compare_outcomes_desc(a, b));
            outcomes
        }
    };

    let categories: Vec<String> = match axis {
        Axis::Question => vec![query.question.clone()],
        Axis::Party => {
            let mut parties: Vec<String> = PARTY_ORDER
                .iter()
                .filter(|p| rows.iter().any(|r| r.party.as_deref() == Some(**p)))
                .map(|p| p.to_string())
                .collect();
            let mut others: Vec<String> = rows
                .iter()
                .filter_map(|r| r.party.clone())
                .filter(|p| !PARTY_ORDER.contains(&p.as_str()))
                .collect();
            others.sort();
            others.dedup();
            parties.extend(others);
            parties
        }
    };

    debug!(
        "select_opinions: {} rows, facets {:?}, outcomes {:?}, categories {:?}",
        rows.len(),
        facets,
        outcomes,
        categories
    );
    Ok(OpinionSlice {
        rows,
        facets,
        outcomes,
        axis,
        categories,
    })
}

/// The per-state rows of one outcome of a sub-question, for the map.
pub fn select_map_opinions(
    data: &SurveyData,
    question: &str,
    sub_question: &str,
    outcome: &str,
) -> SurveyResult<Vec<OpinionRecord>> {
    let rows: Vec<OpinionRecord> = data
        .opinions_state
        .iter()
        .filter(|r| r.question == question && r.sub_question == sub_question && r.outcome == outcome)
        .cloned()
        .collect();
    debug!(
        "select_map_opinions: {}/{}/{}: {} rows",
        question,
        sub_question,
        outcome,
        rows.len()
    );
    ensure!(
        !rows.is_empty(),
        NoOpinionDataSnafu {
            question,
            sub_question,
            outcome
        }
    );
    Ok(rows)
}

/// The share of respondents of each state who reported being exposed to a
/// severe weather impact.
pub fn select_impact(data: &SurveyData, impact: &str) -> SurveyResult<Vec<SampleDescriptive>> {
    ensure!(data.is_impact(impact), NoImpactDataSnafu { impact });
    let rows: Vec<SampleDescriptive> = data
        .sample_desc_state
        .iter()
        .filter(|r| r.demographic_variable == impact && r.category == "Yes")
        .cloned()
        .collect();
    debug!("select_impact: {}: {} rows", impact, rows.len());
    ensure!(!rows.is_empty(), NoImpactDataSnafu { impact });
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::*;

    #[test]
    fn selection_is_idempotent() {
        let data = survey();
        let before = data.opinions_national.clone();
        let q = OpinionQuery::all("q5").with_threshold(Some(Threshold::ThreePlus));
        let s1 = select_opinions(&data, &q).unwrap();
        let s2 = select_opinions(&data, &q).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(before, data.opinions_national);
    }

    #[test]
    fn stratify_with_state_is_rejected() {
        let data = survey();
        let q = OpinionQuery::single("q2", "1")
            .with_state(Some("California"))
            .stratified(true);
        assert!(matches!(
            select_opinions(&data, &q),
            Err(SurveyError::StratifyWithState { .. })
        ));
    }

    #[test]
    fn binarized_rows_sum_to_one() {
        let data = survey();
        for t in Threshold::ALL {
            let q = OpinionQuery::all("q5").with_threshold(Some(t)).stratified(true);
            let slice = select_opinions(&data, &q).unwrap();
            assert_eq!(slice.outcomes, vec![t.outcome(), t.complement_outcome()]);
            for facet in slice.facets.iter() {
                for party in slice.categories.iter() {
                    let yes = slice.find(facet, party, t.outcome()).unwrap();
                    let no = slice.find(facet, party, t.complement_outcome()).unwrap();
                    assert!((yes.percentage + no.percentage - 1.0).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn full_distribution_excludes_threshold_rows() {
        let data = survey();
        let slice = select_opinions(&data, &OpinionQuery::single("q2", "1")).unwrap();
        assert_eq!(slice.outcomes, vec!["5", "4", "3", "2", "1"]);
        assert_eq!(slice.rows.len(), 5);
        assert!(slice
            .rows
            .iter()
            .all(|r| !Threshold::is_reserved_outcome(&r.outcome)));
        assert_eq!(slice.axis, Axis::Question);
        assert_eq!(slice.categories, vec!["q2"]);
    }

    #[test]
    fn facets_follow_endorsement_order() {
        let data = survey();
        let slice = select_opinions(&data, &OpinionQuery::all("q5")).unwrap();
        assert_eq!(slice.facets, vec!["2", "3", "1"]);
    }

    #[test]
    fn state_and_party_tables() {
        let data = survey();
        let q = OpinionQuery::single("q2", "1")
            .with_threshold(Some(Threshold::ThreePlus))
            .with_state(Some("Texas"));
        let slice = select_opinions(&data, &q).unwrap();
        assert_eq!(slice.rows.len(), 2);
        assert!(slice
            .rows
            .iter()
            .all(|r| r.state.as_deref() == Some("Texas")));

        let q = OpinionQuery::single("q2", "1").stratified(true);
        let slice = select_opinions(&data, &q).unwrap();
        assert_eq!(slice.axis, Axis::Party);
        assert_eq!(slice.categories, PARTY_ORDER.to_vec());
    }

    #[test]
    fn empty_selection_is_an_error() {
        let data = survey();
        assert!(matches!(
            select_opinions(&data, &OpinionQuery::single("q2", "7")),
            Err(SurveyError::NoOpinionData { .. })
        ));
        assert!(matches!(
            select_opinions(
                &data,
                &OpinionQuery::single("q2", "1").with_state(Some("Atlantis"))
            ),
            Err(SurveyError::UnknownState { .. })
        ));
    }

    #[test]
    fn map_and_impact_rows() {
        let data = survey();
        let rows = select_map_opinions(&data, "q2", "1", "3+").unwrap();
        assert_eq!(rows.len(), STATE_ABBREVIATIONS.len());
        assert!(select_map_opinions(&data, "q2", "1", "7+").is_err());

        let rows = select_impact(&data, "wildfire").unwrap();
        assert_eq!(rows.len(), STATE_ABBREVIATIONS.len());
        assert!(rows.iter().all(|r| r.category == "Yes"));
        assert!(matches!(
            select_impact(&data, "flood"),
            Err(SurveyError::NoImpactData { .. })
        ));
    }

    #[test]
    fn outcome_ordering() {
        assert_eq!(compare_outcomes_desc("5", "10"), Ordering::Greater);
        assert_eq!(compare_outcomes_desc("b", "a"), Ordering::Less);
    }
}

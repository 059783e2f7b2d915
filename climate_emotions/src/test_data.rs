// A small survey used by the unit tests.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::json;

use crate::builder::SurveyDataBuilder;
use crate::geography::{build_survey_geography, Region};
use crate::*;

pub const STATE_ABBREVIATIONS: [(&str, &str, u64); 4] = [
    ("California", "CA", 300),
    ("Texas", "TX", 250),
    ("Colorado, New Mexico (Cluster E)", "CO, NM", 200),
    ("Idaho, Montana, Wyoming (Cluster B)", "ID, MT, WY", 150),
];

pub const NATIONAL_SAMPLE_SIZE: u64 = 900;

pub const PARTIES: [(&str, u64); 3] = [
    ("Democrat", 350),
    ("Independent/Other", 300),
    ("Republican", 250),
];

const OUTCOME_TEXTS: [&str; 5] = ["Not at all", "A little", "Moderately", "Very", "Very much"];

// (question, sub-question, distribution over the outcomes 1..=5)
const DISTRIBUTIONS: [(&str, &str, [f64; 5]); 4] = [
    ("q2", "1", [0.10, 0.15, 0.25, 0.30, 0.20]),
    ("q5", "1", [0.30, 0.25, 0.20, 0.15, 0.10]),
    ("q5", "2", [0.05, 0.10, 0.25, 0.30, 0.30]),
    ("q5", "3", [0.15, 0.20, 0.25, 0.20, 0.20]),
];

fn square(x: f64, y: f64) -> Vec<Vec<f64>> {
    vec![
        vec![x, y],
        vec![x + 1.0, y],
        vec![x + 1.0, y + 1.0],
        vec![x, y + 1.0],
        vec![x, y],
    ]
}

fn state_feature(name: &str, value: Value) -> Feature {
    let mut properties = serde_json::Map::new();
    properties.insert("name".to_string(), json!(name));
    properties.insert("density".to_string(), json!(12.5));
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Standard US states: Idaho has two polygons, Montana has a hole.
pub fn us_states() -> FeatureCollection {
    let features = vec![
        state_feature("California", Value::Polygon(vec![square(0.0, 0.0)])),
        state_feature("Texas", Value::Polygon(vec![square(2.0, 0.0)])),
        state_feature("Colorado", Value::Polygon(vec![square(4.0, 0.0)])),
        state_feature("New Mexico", Value::Polygon(vec![square(4.0, 1.0)])),
        state_feature(
            "Idaho",
            Value::MultiPolygon(vec![vec![square(6.0, 0.0)], vec![square(6.0, 2.0)]]),
        ),
        state_feature(
            "Montana",
            Value::Polygon(vec![square(8.0, 0.0), square(8.2, 0.2)]),
        ),
        state_feature("Wyoming", Value::Polygon(vec![square(10.0, 0.0)])),
        state_feature(
            "District of Columbia",
            Value::Polygon(vec![square(12.0, 0.0)]),
        ),
    ];
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn name_overrides() -> Vec<(String, String)> {
    geography::DEFAULT_STATE_NAME_OVERRIDES
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

pub fn regions() -> Vec<Region> {
    STATE_ABBREVIATIONS
        .iter()
        .map(|(s, a, _)| Region::parse(s, a).unwrap())
        .collect()
}

fn opinion_rows(
    shift: f64,
    state: Option<&str>,
    party: Option<&str>,
) -> Vec<OpinionRecord> {
    let mut res = Vec::new();
    for (q, sq, dist) in DISTRIBUTIONS.iter() {
        let mut d = *dist;
        d[0] += shift;
        d[4] -= shift;
        let mut push = |outcome: &str, p: f64| {
            res.push(OpinionRecord {
                question: q.to_string(),
                sub_question: sq.to_string(),
                outcome: outcome.to_string(),
                percentage: p,
                state: state.map(|s| s.to_string()),
                party: party.map(|s| s.to_string()),
            })
        };
        for (idx, p) in d.iter().enumerate() {
            push(&format!("{}", idx + 1), *p);
        }
        push("3+", d[2] + d[3] + d[4]);
        push("4+", d[3] + d[4]);
    }
    res
}

fn descriptive_rows(state: Option<&str>, wildfire_share: f64) -> Vec<SampleDescriptive> {
    let rows = [
        ("sex", "Female", 0.52),
        ("sex", "Male", 0.48),
        ("party", "Republican", 0.3),
        ("party", "Democrat", 0.4),
        ("party", "Independent/Other", 0.3),
        ("wildfire", "Yes", wildfire_share),
        ("wildfire", "No", 1.0 - wildfire_share),
        ("heat", "Yes", 0.6),
        ("heat", "No", 0.4),
        ("q2", "Very sure it is happening", 0.7),
        ("q2", "Don't know", 0.1),
        ("q2", "Slightly sure it is happening", 0.2),
    ];
    rows.iter()
        .map(|(v, c, p)| SampleDescriptive {
            state: state.map(|s| s.to_string()),
            demographic_variable: v.to_string(),
            category: c.to_string(),
            n: (p * 100.0).round() as u64,
            percentage: *p,
        })
        .collect()
}

/// A builder with all the tables filled.
pub fn builder() -> SurveyDataBuilder {
    let regions = regions();
    let geography = build_survey_geography(&us_states(), &regions, &name_overrides()).unwrap();

    let mut state_opinions = Vec::new();
    let mut state_desc = Vec::new();
    for (idx, (s, _, _)) in STATE_ABBREVIATIONS.iter().enumerate() {
        state_opinions.extend(opinion_rows(0.01 * idx as f64, Some(s), None));
        state_desc.extend(descriptive_rows(Some(s), 0.1 + 0.1 * idx as f64));
    }
    let mut party_opinions = Vec::new();
    for (idx, (p, _)) in PARTIES.iter().enumerate() {
        party_opinions.extend(opinion_rows(0.02 * idx as f64, None, Some(p)));
    }

    let mut outcomes = Vec::new();
    for q in ["q2", "q5"] {
        for (idx, t) in OUTCOME_TEXTS.iter().enumerate() {
            outcomes.push(OutcomeEntry {
                question: q.to_string(),
                outcome: format!("{}", idx + 1),
                full_text: t.to_string(),
            });
        }
    }

    SurveyDataBuilder::new()
        .state_abbreviations(
            STATE_ABBREVIATIONS
                .iter()
                .map(|(s, a, _)| StateAbbreviation {
                    state: s.to_string(),
                    state_abbreviated: a.to_string(),
                })
                .collect(),
        )
        .survey_geography(geography)
        .national_opinions(opinion_rows(0.0, None, None))
        .state_opinions(state_opinions)
        .party_opinions(party_opinions)
        .state_sample_sizes(
            STATE_ABBREVIATIONS
                .iter()
                .map(|(s, _, n)| StateSampleSize {
                    state: s.to_string(),
                    n: *n,
                })
                .collect(),
        )
        .party_sample_sizes(
            PARTIES
                .iter()
                .map(|(p, n)| PartySampleSize {
                    party: p.to_string(),
                    n: *n,
                })
                .collect(),
        )
        .national_sample_description(descriptive_rows(None, 0.25))
        .state_sample_description(state_desc)
        .questions(vec![
            QuestionEntry {
                question: "q2".to_string(),
                full_text: "How worried are you about climate change?".to_string(),
                domain: Some("emotions".to_string()),
            },
            QuestionEntry {
                question: "q5".to_string(),
                full_text: "How much do you feel the following about climate change?"
                    .to_string(),
                domain: Some("emotions".to_string()),
            },
        ])
        .sub_questions(vec![
            SubQuestionEntry {
                question: "q2".to_string(),
                sub_question: "1".to_string(),
                full_text: "How worried are you about climate change?".to_string(),
            },
            SubQuestionEntry {
                question: "q5".to_string(),
                sub_question: "1".to_string(),
                full_text: "Hopeful".to_string(),
            },
            SubQuestionEntry {
                question: "q5".to_string(),
                sub_question: "2".to_string(),
                full_text: "Anxious about the future of the planet and of the people living on it, including the generations that come after us"
                    .to_string(),
            },
            SubQuestionEntry {
                question: "q5".to_string(),
                sub_question: "3".to_string(),
                full_text: "Angry".to_string(),
            },
        ])
        .outcomes(outcomes)
        .demographics(vec![
            DemographicEntry {
                demographic_variable: "sex".to_string(),
                full_text: "Sex".to_string(),
            },
            DemographicEntry {
                demographic_variable: "party".to_string(),
                full_text: "Party affiliation".to_string(),
            },
            DemographicEntry {
                demographic_variable: "wildfire".to_string(),
                full_text: "Wildfire".to_string(),
            },
            DemographicEntry {
                demographic_variable: "heat".to_string(),
                full_text: "Extreme heat".to_string(),
            },
            DemographicEntry {
                demographic_variable: "impact".to_string(),
                full_text: "Severe weather impacts".to_string(),
            },
            DemographicEntry {
                demographic_variable: "q2".to_string(),
                full_text: "Belief in climate change".to_string(),
            },
        ])
        .impacts(vec![
            ImpactEntry {
                impact: "wildfire".to_string(),
                label: "Wildfire".to_string(),
            },
            ImpactEntry {
                impact: "heat".to_string(),
                label: "Extreme heat".to_string(),
            },
        ])
}

pub fn survey() -> SurveyData {
    let _ = env_logger::builder().is_test(true).try_init();
    builder().build().unwrap()
}

//! Request handlers of the dashboard page.
//!
//! Each control of the page maps to one pure function of its inputs and of
//! the survey data: the page runtime only has to forward the events and
//! display the results.

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::bars::make_stacked_bar;
use crate::cache::{FigureCache, FigureKey};
use crate::figure::{thousands, Figure};
use crate::map::{make_map, ImpactDisplay, MapRequest};
use crate::selector::OpinionQuery;
use crate::*;

/// Shown in place of a state name when no state is selected.
pub const ALL_STATES_LABEL: &str = "National";

pub const ALL_QUESTIONS_TITLE: &str = "All questions";

/// The state of the state dropdown and of the party switch.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SelectionState {
    pub state: Option<String>,
    pub state_select_disabled: bool,
    pub stratify: bool,
    pub stratify_disabled: bool,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ControlEvent {
    /// A region of the map was clicked. The label may be missing when the
    /// map does not report it.
    MapClick(Option<String>),
    StratifyToggled(bool),
    StateSelected(Option<String>),
}

/// The interplay between the map, the state dropdown and the party switch.
///
/// * Clicking a region selects it, clicking the selected region again
///   deselects it. Clicks are ignored while stratifying by party.
/// * Stratifying by party clears and locks the state dropdown.
/// * Selecting a state locks the party switch.
pub fn update_selection(current: &SelectionState, event: &ControlEvent) -> SelectionState {
    let res = match event {
        ControlEvent::MapClick(_) if current.stratify => current.clone(),
        ControlEvent::MapClick(clicked) => {
            if clicked.is_none() || clicked == &current.state {
                SelectionState {
                    state: None,
                    stratify: false,
                    stratify_disabled: false,
                    ..current.clone()
                }
            } else {
                SelectionState {
                    state: clicked.clone(),
                    stratify: false,
                    stratify_disabled: true,
                    ..current.clone()
                }
            }
        }
        ControlEvent::StratifyToggled(checked) => SelectionState {
            state: None,
            state_select_disabled: *checked,
            stratify: *checked,
            ..current.clone()
        },
        ControlEvent::StateSelected(state) => SelectionState {
            state: state.clone(),
            stratify: false,
            stratify_disabled: state.is_some(),
            ..current.clone()
        },
    };
    debug!("update_selection: {:?} + {:?} -> {:?}", current, event, res);
    res
}

pub fn sample_size_caption(data: &SurveyData, state: Option<&str>) -> SurveyResult<String> {
    let n = match state {
        None => data.national_sample_size(),
        Some(s) => data.sample_size(s)?,
    };
    Ok(format!("Sample size: {}", thousands(n)))
}

pub fn state_caption(state: Option<&str>) -> String {
    match state {
        None => ALL_STATES_LABEL.to_string(),
        Some(s) => format!("State: {}", s),
    }
}

pub fn selected_question_title(state: Option<&str>) -> String {
    state.unwrap_or(ALL_STATES_LABEL).to_string()
}

pub fn all_questions_title(state: Option<&str>) -> String {
    format!(
        "{}: {}",
        ALL_QUESTIONS_TITLE,
        state.unwrap_or(ALL_STATES_LABEL)
    )
}

pub fn map_title(data: &SurveyData, impact: Option<&str>) -> String {
    let label = impact.and_then(|i| data.impacts().iter().find(|e| e.impact == i));
    match label {
        None => "Climate emotions by state".to_string(),
        Some(e) => format!("Respondents exposed to: {}", e.label),
    }
}

/// The question below the map. Empty when an impact is shown instead.
pub fn map_subtitle(
    data: &SurveyData,
    question_value: &str,
    impact: Option<&str>,
) -> SurveyResult<String> {
    if impact.is_some() {
        return Ok(String::new());
    }
    let (question, sub_question) = extract_question_subquestion(question_value)?;
    question_subtitle(data, &question, &sub_question)
}

/// The text of a question, followed by the sub-question when the question
/// has several of them.
pub fn question_subtitle(
    data: &SurveyData,
    question: &str,
    sub_question: &str,
) -> SurveyResult<String> {
    let text = data.question_text(question)?;
    if data.sub_questions_of(question).count() > 1 {
        let sub = data.sub_question_text(question, sub_question)?;
        Ok(format!("{} {}", text, sub))
    } else {
        Ok(text.to_string())
    }
}

/// The selected-question chart is hidden while an impact is shown.
pub fn selected_question_visible(impact: Option<&str>) -> bool {
    impact.is_none()
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    #[serde(rename = "label")]
    pub label: String,
    #[serde(rename = "value")]
    pub value: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionGroup {
    #[serde(rename = "group")]
    pub group: String,
    #[serde(rename = "items")]
    pub items: Vec<QuestionOption>,
}

/// The options of the question dropdown: one option per sub-question,
/// grouped by question. Questions without sub-questions get a single
/// option in an unnamed group.
pub fn question_options(data: &SurveyData) -> Vec<QuestionGroup> {
    data.questions()
        .iter()
        .map(|q| {
            let subs: Vec<&SubQuestionEntry> = data.sub_questions_of(&q.question).collect();
            if subs.len() > 1 {
                QuestionGroup {
                    group: q.full_text.clone(),
                    items: subs
                        .iter()
                        .map(|sq| QuestionOption {
                            label: sq.full_text.clone(),
                            value: format!("{}_{}", q.question, sq.sub_question),
                        })
                        .collect(),
                }
            } else {
                QuestionGroup {
                    group: String::new(),
                    items: vec![QuestionOption {
                        label: q.full_text.clone(),
                        value: format!("{}_1", q.question),
                    }],
                }
            }
        })
        .collect()
}

/// The states and clusters of the state dropdown.
pub fn state_options(data: &SurveyData) -> Vec<String> {
    data.sample_sizes_state
        .iter()
        .map(|s| s.state.clone())
        .collect()
}

/// Splits a question dropdown value `"q5_2"` into question and sub-question.
pub fn extract_question_subquestion(value: &str) -> SurveyResult<(String, String)> {
    let parts: Vec<&str> = value.split('_').collect();
    ensure!(
        parts.len() == 2 && parts.iter().all(|p| !p.is_empty()),
        MalformedQuestionValueSnafu { value }
    );
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// The response threshold control: `all` shows every response level.
pub fn parse_threshold_control(value: &str) -> SurveyResult<Option<Threshold>> {
    match value {
        "all" => Ok(None),
        x => x
            .parse::<Threshold>()
            .map(Some)
            .map_err(|_| SurveyError::UnknownThreshold {
                value: x.to_string(),
            }),
    }
}

/// The map for the selected question, at the default threshold.
pub fn update_map(
    data: &SurveyData,
    question_value: &str,
    state: Option<&str>,
    impact: Option<&str>,
    settings: &MapSettings,
) -> SurveyResult<Figure> {
    let (question, sub_question) = extract_question_subquestion(question_value)?;
    let request = MapRequest::new(&question, &sub_question, Threshold::DEFAULT.outcome())
        .with_clicked_state(state)
        .with_impact(impact, ImpactDisplay::Gradient);
    make_map(data, &request, settings)
}

pub fn update_selected_question_bar(
    data: &SurveyData,
    question_value: &str,
    selection: &SelectionState,
    threshold: Option<Threshold>,
    settings: &BarSettings,
) -> SurveyResult<Figure> {
    let (question, sub_question) = extract_question_subquestion(question_value)?;
    let query = OpinionQuery::single(&question, &sub_question)
        .with_state(selection.state.as_deref())
        .stratified(selection.stratify)
        .with_threshold(threshold);
    make_stacked_bar(data, &query, settings)
}

/// The charts of all the questions, from the cache when possible.
pub fn update_all_question_bars(
    data: &SurveyData,
    cache: &FigureCache,
    selection: &SelectionState,
    threshold: Option<Threshold>,
    settings: &BarSettings,
) -> SurveyResult<Vec<(String, Figure)>> {
    let key = FigureKey {
        state: selection.state.clone(),
        stratify: selection.stratify,
        threshold,
        decimals: settings.decimals,
    };
    data.questions()
        .iter()
        .map(|q| {
            let figure = cache.figure_or_render(data, &key, &q.question, settings)?;
            Ok((q.question.clone(), figure))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::*;

    #[test]
    fn map_clicks() {
        let start = SelectionState::default();
        let ca = update_selection(
            &start,
            &ControlEvent::MapClick(Some("California".to_string())),
        );
        assert_eq!(ca.state.as_deref(), Some("California"));
        assert!(ca.stratify_disabled);

        // Clicking the selected region again deselects it.
        let again = update_selection(
            &ca,
            &ControlEvent::MapClick(Some("California".to_string())),
        );
        assert_eq!(again.state, None);
        assert!(!again.stratify_disabled);

        let tx = update_selection(&ca, &ControlEvent::MapClick(Some("Texas".to_string())));
        assert_eq!(tx.state.as_deref(), Some("Texas"));

        let lost = update_selection(&ca, &ControlEvent::MapClick(None));
        assert_eq!(lost.state, None);
    }

    #[test]
    fn stratify_and_state_exclude_each_other() {
        let ca = update_selection(
            &SelectionState::default(),
            &ControlEvent::StateSelected(Some("California".to_string())),
        );
        assert!(ca.stratify_disabled);
        assert!(!ca.stratify);

        let strat = update_selection(&ca, &ControlEvent::StratifyToggled(true));
        assert_eq!(strat.state, None);
        assert!(strat.state_select_disabled);
        assert!(strat.stratify);

        // Map clicks are ignored while stratifying.
        let clicked = update_selection(
            &strat,
            &ControlEvent::MapClick(Some("Texas".to_string())),
        );
        assert_eq!(clicked, strat);

        let off = update_selection(&strat, &ControlEvent::StratifyToggled(false));
        assert!(!off.state_select_disabled);
        assert!(!off.stratify);

        let cleared = update_selection(&ca, &ControlEvent::StateSelected(None));
        assert!(!cleared.stratify_disabled);
    }

    #[test]
    fn captions() {
        let data = survey();
        assert_eq!(sample_size_caption(&data, None).unwrap(), "Sample size: 900");
        assert_eq!(
            sample_size_caption(&data, Some("Texas")).unwrap(),
            "Sample size: 250"
        );
        assert!(sample_size_caption(&data, Some("Atlantis")).is_err());
        assert_eq!(state_caption(None), "National");
        assert_eq!(state_caption(Some("Texas")), "State: Texas");
        assert_eq!(all_questions_title(Some("Texas")), "All questions: Texas");
        assert_eq!(selected_question_title(None), "National");
        assert_eq!(
            map_title(&data, Some("heat")),
            "Respondents exposed to: Extreme heat"
        );
        assert_eq!(map_subtitle(&data, "q5_3", Some("heat")).unwrap(), "");
        assert!(map_subtitle(&data, "q5_3", None).unwrap().ends_with("Angry"));
        assert_eq!(
            map_subtitle(&data, "q2_1", None).unwrap(),
            "How worried are you about climate change?"
        );
        assert!(!selected_question_visible(Some("heat")));
    }

    #[test]
    fn question_dropdown() {
        let data = survey();
        let options = question_options(&data);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].group, "");
        assert_eq!(options[0].items[0].value, "q2_1");
        assert_eq!(options[1].items.len(), 3);
        assert_eq!(options[1].items[1].value, "q5_2");

        for group in options.iter() {
            for item in group.items.iter() {
                assert!(extract_question_subquestion(&item.value).is_ok());
            }
        }
        assert_eq!(
            extract_question_subquestion("q5_2").unwrap(),
            ("q5".to_string(), "2".to_string())
        );
        assert!(extract_question_subquestion("q5").is_err());
        assert!(extract_question_subquestion("q5_2_1").is_err());
        assert_eq!(state_options(&data).len(), STATE_ABBREVIATIONS.len());
    }

    #[test]
    fn threshold_control() {
        assert_eq!(parse_threshold_control("all").unwrap(), None);
        assert_eq!(
            parse_threshold_control("4+").unwrap(),
            Some(Threshold::FourPlus)
        );
        assert!(matches!(
            parse_threshold_control("5+"),
            Err(SurveyError::UnknownThreshold { .. })
        ));
    }

    #[test]
    fn figures_for_the_page() {
        let data = survey();
        let selection = update_selection(
            &SelectionState::default(),
            &ControlEvent::StateSelected(Some("Texas".to_string())),
        );
        let map = update_map(
            &data,
            "q5_2",
            selection.state.as_deref(),
            None,
            &MapSettings::DEFAULT,
        )
        .unwrap();
        assert!(map.layout.get("title").is_some());

        let bar = update_selected_question_bar(
            &data,
            "q5_2",
            &selection,
            Some(Threshold::ThreePlus),
            &BarSettings::DEFAULT,
        )
        .unwrap();
        assert_eq!(bar.data.len(), 2);

        // An empty cache renders everything on demand.
        let figures = update_all_question_bars(
            &data,
            &FigureCache::new(),
            &selection,
            None,
            &BarSettings::DEFAULT,
        )
        .unwrap();
        let questions: Vec<&str> = figures.iter().map(|(q, _)| q.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q5"]);
    }
}

//! Prerendered bar charts of all the questions.
//!
//! Rendering every question for each selection is the slowest part of a
//! page update, so the charts can be computed once ahead of time for the
//! combinations offered by the page, and looked up afterwards.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bars::make_stacked_bar;
use crate::figure::Figure;
use crate::selector::OpinionQuery;
use crate::*;

/// The thresholds offered by the page for the charts of all the questions.
pub const PRERENDER_THRESHOLDS: [Option<Threshold>; 2] = [None, Some(Threshold::ThreePlus)];

/// A combination of the page controls.
#[derive(Eq, PartialEq, Debug, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FigureKey {
    pub state: Option<String>,
    pub stratify: bool,
    pub threshold: Option<Threshold>,
    pub decimals: usize,
}

impl FigureKey {
    /// The bar chart request for all the sub-questions of a question.
    pub fn query(&self, question: &str) -> OpinionQuery {
        OpinionQuery::all(question)
            .with_state(self.state.as_deref())
            .stratified(self.stratify)
            .with_threshold(self.threshold)
    }
}

// The stored form: a list of entries sorted by key and question.
#[derive(Serialize, Deserialize)]
struct CacheEntry {
    key: FigureKey,
    question: String,
    figure: Figure,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    #[serde(rename = "fingerprint")]
    fingerprint: Option<String>,
    #[serde(rename = "entries")]
    entries: Vec<CacheEntry>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "CacheFile", into = "CacheFile")]
pub struct FigureCache {
    /// Identifies the input data the figures were computed from.
    fingerprint: Option<String>,
    figures: HashMap<(FigureKey, String), Figure>,
}

impl From<CacheFile> for FigureCache {
    fn from(file: CacheFile) -> FigureCache {
        FigureCache {
            fingerprint: file.fingerprint,
            figures: file
                .entries
                .into_iter()
                .map(|e| ((e.key, e.question), e.figure))
                .collect(),
        }
    }
}

impl From<FigureCache> for CacheFile {
    fn from(cache: FigureCache) -> CacheFile {
        let mut entries: Vec<CacheEntry> = cache
            .figures
            .into_iter()
            .map(|((key, question), figure)| CacheEntry {
                key,
                question,
                figure,
            })
            .collect();
        entries.sort_by(|a, b| (&a.key, &a.question).cmp(&(&b.key, &b.question)));
        CacheFile {
            fingerprint: cache.fingerprint,
            entries,
        }
    }
}

impl FigureCache {
    pub fn new() -> FigureCache {
        FigureCache::default()
    }

    /// Every combination of the controls: the whole sample and each state,
    /// with and without party stratification (never both a state and
    /// stratification), at each prerendered threshold.
    pub fn keys(data: &SurveyData, decimals: usize) -> Vec<FigureKey> {
        let states = std::iter::once(None).chain(data.regions().iter().map(|r| Some(r.label.clone())));
        let mut keys = Vec::new();
        for state in states {
            for stratify in [false, true] {
                if state.is_some() && stratify {
                    continue;
                }
                for threshold in PRERENDER_THRESHOLDS {
                    keys.push(FigureKey {
                        state: state.clone(),
                        stratify,
                        threshold,
                        decimals,
                    });
                }
            }
        }
        keys
    }

    /// Renders the charts of all the questions for every key.
    pub fn build(data: &SurveyData, settings: &BarSettings) -> SurveyResult<FigureCache> {
        let mut cache = FigureCache::new();
        for key in FigureCache::keys(data, settings.decimals) {
            debug!("FigureCache::build: {:?}", key);
            for q in data.questions().iter() {
                let figure = make_stacked_bar(data, &key.query(&q.question), settings)?;
                cache.insert(key.clone(), &q.question, figure);
            }
        }
        info!("FigureCache::build: {} figures", cache.len());
        Ok(cache)
    }

    pub fn with_fingerprint(mut self, fingerprint: &str) -> FigureCache {
        self.fingerprint = Some(fingerprint.to_string());
        self
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Adds a figure, replacing any previous one for the same key and
    /// question.
    pub fn insert(&mut self, key: FigureKey, question: &str, figure: Figure) {
        self.figures.insert((key, question.to_string()), figure);
    }

    pub fn get(&self, key: &FigureKey, question: &str) -> Option<&Figure> {
        self.figures.get(&(key.clone(), question.to_string()))
    }

    /// The prerendered figure, or a freshly rendered one if it is missing.
    pub fn figure_or_render(
        &self,
        data: &SurveyData,
        key: &FigureKey,
        question: &str,
        settings: &BarSettings,
    ) -> SurveyResult<Figure> {
        if let Some(f) = self.get(key, question) {
            return Ok(f.clone());
        }
        warn!(
            "No prerendered figure for {:?}, question {}: rendering it",
            key, question
        );
        let settings = BarSettings {
            decimals: key.decimals,
            ..settings.clone()
        };
        make_stacked_bar(data, &key.query(question), &settings)
    }

    /// The number of figures.
    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::*;

    #[test]
    fn keys_skip_state_and_stratify() {
        let data = survey();
        let keys = FigureCache::keys(&data, 1);
        // whole sample: 2 x 2, each state: 1 x 2
        assert_eq!(keys.len(), 4 + 2 * STATE_ABBREVIATIONS.len());
        assert!(keys.iter().all(|k| !(k.state.is_some() && k.stratify)));
        assert!(keys
            .iter()
            .all(|k| k.threshold != Some(Threshold::FourPlus)));
    }

    #[test]
    fn lookup_and_fallback() {
        let data = survey();
        let settings = BarSettings::DEFAULT;
        let cache = FigureCache::build(&data, &settings).unwrap();
        assert_eq!(cache.len(), FigureCache::keys(&data, 1).len() * 2);

        let key = FigureKey {
            state: Some("Texas".to_string()),
            stratify: false,
            threshold: Some(Threshold::ThreePlus),
            decimals: 1,
        };
        let direct = make_stacked_bar(&data, &key.query("q5"), &settings).unwrap();
        assert_eq!(cache.get(&key, "q5"), Some(&direct));

        // 4+ is not prerendered.
        let missing = FigureKey {
            threshold: Some(Threshold::FourPlus),
            ..key.clone()
        };
        assert!(cache.get(&missing, "q5").is_none());
        let rendered = cache
            .figure_or_render(&data, &missing, "q5", &settings)
            .unwrap();
        let direct = make_stacked_bar(&data, &missing.query("q5"), &settings).unwrap();
        assert_eq!(rendered, direct);
    }

    #[test]
    fn serialized_cache() {
        let data = survey();
        let cache = FigureCache::build(&data, &BarSettings::DEFAULT)
            .unwrap()
            .with_fingerprint("abc");
        let js = serde_json::to_string(&cache).unwrap();
        let back: FigureCache = serde_json::from_str(&js).unwrap();
        assert_eq!(back.fingerprint(), Some("abc"));
        assert_eq!(back.len(), cache.len());
        let key = &FigureCache::keys(&data, 1)[0];
        assert!(back.get(key, "q2").is_some());
        assert_eq!(back, cache);
    }

    #[test]
    fn insert_replaces_and_serializes_in_order() {
        let data = survey();
        let settings = BarSettings::DEFAULT;
        let keys = FigureCache::keys(&data, 1);
        let figure = |k: &FigureKey, q: &str| make_stacked_bar(&data, &k.query(q), &settings).unwrap();

        let mut forward = FigureCache::new();
        let mut backward = FigureCache::new();
        for k in keys.iter() {
            forward.insert(k.clone(), "q5", figure(k, "q2"));
            forward.insert(k.clone(), "q5", figure(k, "q5"));
        }
        for k in keys.iter().rev() {
            backward.insert(k.clone(), "q5", figure(k, "q5"));
        }
        assert_eq!(forward.len(), keys.len());
        assert_eq!(forward.get(&keys[0], "q5"), Some(&figure(&keys[0], "q5")));
        assert_eq!(
            serde_json::to_string(&forward).unwrap(),
            serde_json::to_string(&backward).unwrap()
        );

        let js = serde_json::to_value(&forward).unwrap();
        let entries = js["entries"].as_array().unwrap();
        assert_eq!(entries.len(), keys.len());
        assert_eq!(entries[0]["question"], "q5");
    }
}

// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;

/// The share of respondents endorsing one outcome level of a question.
///
/// The same structure is used for the three opinion tables. The `state`
/// column is only filled for the per-state table, the `party` column only
/// for the per-party table.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OpinionRecord {
    pub question: String,
    pub sub_question: String,
    pub outcome: String,
    /// A fraction in [0, 1].
    pub percentage: f64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StateSampleSize {
    pub state: String,
    pub n: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartySampleSize {
    pub party: String,
    pub n: u64,
}

/// One line of the sample description: how many respondents fall in a
/// category of a demographic variable. Severe weather impacts are encoded
/// as demographic variables with the categories `Yes` and `No`.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SampleDescriptive {
    #[serde(default)]
    pub state: Option<String>,
    pub demographic_variable: String,
    pub category: String,
    pub n: u64,
    pub percentage: f64,
}

// ********* Dictionaries **********

/// A state or a cluster of states, as written in the survey.
///
/// Clusters are written `"Idaho, Montana, Wyoming (Cluster B)"` and their
/// abbreviations `"ID, MT, WY"`, in the same order.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StateAbbreviation {
    pub state: String,
    pub state_abbreviated: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub question: String,
    pub full_text: String,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestionEntry {
    pub question: String,
    pub sub_question: String,
    pub full_text: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub question: String,
    pub outcome: String,
    pub full_text: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DemographicEntry {
    pub demographic_variable: String,
    pub full_text: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ImpactEntry {
    pub impact: String,
    pub label: String,
}

// ********* Thresholds **********

/// The Likert level from which a response counts as endorsed.
///
/// The survey tables carry one aggregate row per threshold next to the
/// granular outcome levels, with the threshold keyword as outcome.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Threshold {
    #[serde(rename = "3+")]
    ThreePlus,
    #[serde(rename = "4+")]
    FourPlus,
}

impl Threshold {
    pub const ALL: [Threshold; 2] = [Threshold::ThreePlus, Threshold::FourPlus];

    /// The threshold used by the map and by default in the bar charts.
    pub const DEFAULT: Threshold = Threshold::ThreePlus;

    /// The outcome keyword of the aggregate rows.
    pub fn outcome(&self) -> &'static str {
        match self {
            Threshold::ThreePlus => "3+",
            Threshold::FourPlus => "4+",
        }
    }

    /// The synthesized outcome holding the unendorsed remainder.
    pub fn complement_outcome(&self) -> &'static str {
        match self {
            Threshold::ThreePlus => "not3+",
            Threshold::FourPlus => "not4+",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Threshold::ThreePlus => "3+ (moderately and above)",
            Threshold::FourPlus => "4+ (very much and above)",
        }
    }

    pub fn complement_label(&self) -> &'static str {
        match self {
            Threshold::ThreePlus => "Below 3 (not at all or slightly)",
            Threshold::FourPlus => "Below 4 (moderately and below)",
        }
    }

    /// Is this outcome a threshold keyword or a synthesized complement?
    pub fn is_reserved_outcome(outcome: &str) -> bool {
        Threshold::ALL
            .iter()
            .any(|t| t.outcome() == outcome || t.complement_outcome() == outcome)
    }
}

impl Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.outcome())
    }
}

impl FromStr for Threshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3+" => Ok(Threshold::ThreePlus),
            "4+" => Ok(Threshold::FourPlus),
            x => Err(format!("unknown threshold {:?}", x)),
        }
    }
}

// ********* Figure settings **********

pub const PARTY_ORDER: [&str; 3] = ["Democrat", "Independent/Other", "Republican"];

pub const PLOTLY_THEME: &str = "plotly_white";

/// The largest number of decimals shown in the figures.
pub const MAX_DECIMALS: usize = 10;

/// Plot margins, in pixels.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Margins {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MapSettings {
    /// Percentage points added on both sides of the colour range.
    pub colormap_range_padding: f64,
    pub opinion_colormap: Cow<'static, str>,
    pub impact_colormap: Cow<'static, str>,
    pub decimals: usize,
    pub margins: Margins,
    /// Width of the outline drawn around the selected region.
    pub clicked_outline_width: u32,
    pub clicked_outline_color: Cow<'static, str>,
}

impl MapSettings {
    pub const DEFAULT: MapSettings = MapSettings {
        colormap_range_padding: 5.0,
        opinion_colormap: Cow::Borrowed("Viridis"),
        impact_colormap: Cow::Borrowed("OrRd"),
        decimals: 1,
        margins: Margins {
            l: 0,
            r: 0,
            t: 0,
            b: 0,
        },
        clicked_outline_width: 4,
        clicked_outline_color: Cow::Borrowed("yellow"),
    };
}

/// Palettes used for the stacked bars, keyed by the number of outcomes.
pub const BINARY_PALETTE: [&str; 2] = ["#f8961e", "#43aa8b"];
pub const TERNARY_PALETTE: [&str; 3] = ["#f8961e", "#d5bdaf", "#43aa8b"];
pub const COOL_WARM_5: [&str; 5] = ["#f94144", "#f3722c", "#f8961e", "#43aa8b", "#577590"];
pub const COOL_WARM_7: [&str; 7] = [
    "#f94144", "#f3722c", "#f8961e", "#90be6d", "#43aa8b", "#4d908e", "#577590",
];

pub fn palette_for(num_outcomes: usize) -> Option<&'static [&'static str]> {
    match num_outcomes {
        2 => Some(&BINARY_PALETTE),
        3 => Some(&TERNARY_PALETTE),
        5 => Some(&COOL_WARM_5),
        7 => Some(&COOL_WARM_7),
        _ => None,
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct BarSettings {
    pub decimals: usize,
    pub font_size: u32,
    /// Height of a single facet. Multiplied by the number of facets.
    pub height: f64,
    /// Height multiplier when the bars are split by party.
    pub stratified_height_factor: f64,
    pub margins: Margins,
    pub title_font_size: u32,
    /// Wrapping width (characters) of the facet titles.
    pub title_wrap: usize,
    /// Vertical space between facets, in pixels.
    pub facet_row_spacing: f64,
    /// Wrapping width (characters) of the labels inside the bars.
    pub text_wrap: usize,
}

impl BarSettings {
    pub const DEFAULT: BarSettings = BarSettings {
        decimals: 1,
        font_size: 10,
        height: 130.0,
        stratified_height_factor: 1.75,
        margins: Margins {
            l: 30,
            r: 30,
            t: 30,
            b: 20,
        },
        title_font_size: 14,
        title_wrap: 105,
        facet_row_spacing: 40.0,
        text_wrap: 25,
    };
}

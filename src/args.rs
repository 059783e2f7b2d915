use clap::Parser;

/// This program produces the figures of the climate emotions survey map.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration file. It states where the survey tables,
    /// the dictionaries and the shapes of the states are, and how the figures look.
    /// See the manual of the climate_emotions crate for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory path, optional) The directory the data paths are relative to. Setting this option
    /// overrides the directory of the configuration file.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// (default map) The figure to produce: map, bars, descriptive, survey-geojson or prerender.
    #[clap(short, long, value_parser)]
    pub figure: Option<String>,

    /// (string, optional) The question, written as question and sub-question separated by an
    /// underscore (q2_1). For bar charts, q5_all selects all the sub-questions of q5 and leaving
    /// it empty selects all the questions.
    #[clap(short, long, value_parser)]
    pub question: Option<String>,

    /// (state label, optional) Restricts the figure to a state or cluster of states. For the map,
    /// the state is outlined.
    #[clap(short, long, value_parser)]
    pub state: Option<String>,

    /// If passed as an argument, the bar charts are split by political party.
    #[clap(long, takes_value = false)]
    pub stratify: bool,

    /// (default 3+) The response threshold: all, 3+ or 4+.
    #[clap(short, long, value_parser)]
    pub threshold: Option<String>,

    /// (impact name, optional) Shows the share of respondents exposed to a severe weather impact
    /// on the map.
    #[clap(short, long, value_parser)]
    pub impact: Option<String>,

    /// If passed as an argument, the impact is drawn as markers on top of the opinions instead of
    /// replacing them.
    #[clap(long, takes_value = false)]
    pub impact_markers: bool,

    /// (integer, optional) The number of decimals of the percentages. Setting this option overrides
    /// the configuration file.
    #[clap(long, value_parser)]
    pub decimals: Option<usize>,

    /// (file path, 'stdout' or empty) If specified, the figure will be written in JSON format to the given
    /// location. Setting this option overrides the paths that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing a figure in JSON format. If provided, climap will
    /// check that the produced figure matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

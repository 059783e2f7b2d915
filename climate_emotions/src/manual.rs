/*!

This is the long-form manual for `climate_emotions` and `climap`.

## Input formats

All the tables are tab-separated files with a header row. The column names
are significant, their order is not. Percentages are fractions between 0
and 1.

The survey results are expected in one directory:
* `opinions_wholesample.tsv` the opinions over the whole sample
* `opinions_state.tsv` the opinions per state or cluster of states
* `opinions_party.tsv` the opinions per political party
* `samplesizes_state.tsv`, `samplesizes_party.tsv` the number of respondents
* `sampledesc_wholesample.tsv`, `sampledesc_state.tsv` the description of the sample

The data dictionaries in another one:
* `question_dictionary.tsv`
* `subquestion_dictionary.tsv`
* `outcome_dictionary.tsv`
* `state_abbreviations.tsv`
* `demographics_dictionary.tsv`
* `impacts_list.tsv`

### Opinions

```text
question	sub_question	outcome	percentage
q2	1	1	0.05
q2	1	3+	0.8
```

The per-state table has an extra `state` column, the per-party table an
extra `party` column. Next to the Likert levels (`1` to `5` for most
questions), each sub-question carries the aggregate rows `3+` and `4+`:
the share of respondents answering at this level or above. The outcomes
`not3+` and `not4+` are reserved for the complements computed by the
charts and must not appear in the tables.

### Sample sizes

```text
state	n
California	300
Idaho, Montana, Wyoming (Cluster B)	150
```

The state sample sizes must add up to the national sample size when one is
set in the configuration (`nationalSampleSize`).

### Sample description

```text
state	demographic_variable	category	n	percentage
Texas	party	Democrat	75	0.3
Texas	wildfire	Yes	50	0.2
```

The whole sample table has no `state` column. The severe weather impacts
listed in `impacts_list.tsv` are described with the categories `Yes` and
`No`; the `Yes` rows drive the impact layer of the map.

### States and clusters

Small states were surveyed together. A cluster is written with its members
and a letter, and its abbreviations are given in the same order:

```text
state	state_abbreviated
California	CA
Idaho, Montana, Wyoming (Cluster B)	ID, MT, WY
```

A label mentioning `Cluster` without this shape is rejected. Every label is
split on `", "` into its member states, so it needs one abbreviation per
member.

### Geography

The shapes of the US states are read from a GeoJSON feature collection with
one feature per state, identified by its `name` property. Before merging,
the names are rewritten with the `stateNameOverrides` of the configuration
(by default `District of Columbia` becomes `Washington DC`).

`climap --figure survey-geojson` writes the derived survey geography: the
states are kept as they are, and the members of each cluster are merged
into a single multi-polygon named after the cluster. The map uses this
derived file through `surveyStates`.

## Configuration

```json
{
  "dataSettings": {
    "surveyResults": "survey_results",
    "dataDictionaries": "data_dictionaries",
    "usStates": "us_states.json",
    "surveyStates": "survey_states.json",
    "prerenderedFigures": "prerendered_figures.json",
    "nationalSampleSize": 900,
    "stateNameOverrides": [{"from": "District of Columbia", "to": "Washington DC"}]
  },
  "mapSettings": {"colormapRangePadding": 5, "opinionColormap": "Viridis", "decimals": 1},
  "barSettings": {"decimals": 1, "height": 130, "fontSize": 10}
}
```

All the fields are optional. The paths are relative to the directory of the
configuration file.

## Figures

`climap` writes plotly figures in JSON format:
* `map` the choropleth of the share of respondents giving one outcome to a
  sub-question (`--question q2_1`), optionally with the exposure to a
  severe weather impact (`--impact wildfire`, with `--impact-markers` to
  draw it as markers instead of a gradient)
* `bars` the stacked bars of a sub-question, or of all the sub-questions
  of a question (`--question q5_all`), for the whole sample, a state
  (`--state`) or split by party (`--stratify`), at a threshold
  (`--threshold 3+`) or with all the answers
* `descriptive` the description of the sample: the demographic variables,
  the exposure to the severe weather impacts, and the belief in climate
  change (`q2`), each in its own panel
* `prerender` the bar charts of all the questions, for every combination of
  the controls of the page

When `--reference` is given, the figure is compared with a stored one and
the differences are printed.
*/

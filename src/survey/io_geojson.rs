use crate::survey::*;

use geojson::{FeatureCollection, GeoJson};
use std::io::BufReader;

pub fn read_feature_collection(path: &Path) -> CliResult<FeatureCollection> {
    let p = path.display().to_string();
    let file = fs::File::open(path).context(OpeningFileSnafu { path: p.clone() })?;
    let gj = GeoJson::from_reader(BufReader::new(file))
        .map_err(geojson::Error::from)
        .context(ParsingGeoJsonSnafu { path: p.clone() })?;
    match gj {
        GeoJson::FeatureCollection(fc) => {
            debug!(
                "read_feature_collection: {}: {} features",
                p,
                fc.features.len()
            );
            Ok(fc)
        }
        _ => NotAFeatureCollectionSnafu { path: p }.fail(),
    }
}

/// The shapes of the survey regions: read from the derived file when it
/// exists, built from the US states otherwise.
pub fn survey_states(
    settings: &DataSettings,
    root: &Path,
    regions: &[Region],
) -> CliResult<FeatureCollection> {
    let survey_p = resolve(root, settings.survey_states());
    if survey_p.exists() {
        return read_feature_collection(&survey_p);
    }
    info!(
        "No survey geography at {}: building it from the US states",
        survey_p.display()
    );
    let us_states = read_feature_collection(&resolve(root, settings.us_states()))?;
    let fc = build_survey_geography(&us_states, regions, &settings.name_overrides())?;
    Ok(fc)
}

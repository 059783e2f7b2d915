// Primitives for reading the tab-separated tables.

use crate::survey::io_common::simplify_file_name;
use crate::survey::*;

use serde::de::DeserializeOwned;

/// Reads all the rows of a table. The columns are matched by the names of
/// the header row.
pub fn read_tsv<T: DeserializeOwned>(path: &Path) -> CliResult<Vec<T>> {
    let p = path.display().to_string();
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .context(OpeningTsvSnafu { path: p.clone() })?;
    let mut res: Vec<T> = Vec::new();
    for (idx, line_r) in rdr.deserialize().enumerate() {
        // The header is on the first line.
        let lineno = idx + 2;
        let row: T = line_r.context(ParsingTsvSnafu {
            path: p.clone(),
            lineno,
        })?;
        res.push(row);
    }
    debug!("read_tsv: {}: {} rows", simplify_file_name(path), res.len());
    Ok(res)
}

use crate::survey::*;

use std::io::Write;

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn resolve(root: &Path, lpath: &str) -> PathBuf {
    [root, Path::new(lpath)].iter().collect()
}

/// A SHA-256 digest of the contents of the files, in order.
pub fn fingerprint(paths: &[PathBuf]) -> CliResult<String> {
    let mut all = String::new();
    for p in paths.iter() {
        let path = p.display().to_string();
        let contents = fs::read_to_string(p).context(OpeningFileSnafu { path })?;
        all.push_str(simplify_file_name(p).as_str());
        all.push('\n');
        all.push_str(contents.as_str());
    }
    let digest = sha256::digest(all);
    debug!("fingerprint: {} files: {}", paths.len(), digest);
    Ok(digest)
}

/// Writes to the given file, or to the standard output when the
/// destination is empty or `stdout`.
pub fn write_output(contents: &str, out: Option<&str>) -> CliResult<()> {
    match out {
        None | Some("stdout") => {
            println!("{}", contents);
            Ok(())
        }
        Some(path) => {
            info!("Writing output to {}", path);
            let mut f = fs::File::create(path).context(WritingFileSnafu { path })?;
            f.write_all(contents.as_bytes())
                .context(WritingFileSnafu { path })?;
            f.write_all(b"\n").context(WritingFileSnafu { path })?;
            Ok(())
        }
    }
}

use std::io::BufRead;
use std::path::Path;

use crate::errors::{ClassifyError, ClassifyResult};

/// Reads class labels, one per line, formatted as `<id> <label text>`.
pub fn load_labels(path: impl AsRef<Path>) -> ClassifyResult<Vec<String>> {
    let path = path.as_ref();
    let file = fs_err::File::open(path)
        .map_err(|source| ClassifyError::LabelsNotFound { path: path.to_owned(), source })?;
    parse_labels(std::io::BufReader::new(file))
        .map_err(|source| ClassifyError::LabelsRead { path: path.to_owned(), source })
}

/// Keeps what follows the first space of every non-empty line. A line
/// without a space is kept whole.
pub fn parse_labels(reader: impl BufRead) -> std::io::Result<Vec<String>> {
    let mut labels = vec![];
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let label = match line.find(' ') {
            Some(space) => line[space + 1..].to_string(),
            None => line,
        };
        labels.push(label);
    }
    Ok(labels)
}

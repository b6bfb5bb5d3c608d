use std::fmt;
use std::path::PathBuf;

use crate::config::WEIGHTS_HINT_URL;

pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Everything that stops a classification run.
#[derive(Debug)]
pub enum ClassifyError {
    LabelsNotFound { path: PathBuf, source: std::io::Error },
    LabelsRead { path: PathBuf, source: std::io::Error },
    ModelLoad { proto: PathBuf, model: PathBuf, source: anyhow::Error },
    ImageRead { path: PathBuf, source: Option<image::ImageError> },
    Inference(anyhow::Error),
    UnknownClass { index: usize, labels: usize },
    Report(std::io::Error),
}

impl ClassifyError {
    /// Process status for this error. Every failure is reported the same way.
    pub fn exit_code(&self) -> i32 {
        -1
    }
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ClassifyError::*;
        match self {
            LabelsNotFound { path, .. } => {
                write!(f, "File with classes labels not found: {}", path.display())
            }
            LabelsRead { path, source } => {
                write!(f, "Failed to read classes labels from {}: {}", path.display(), source)
            }
            ModelLoad { proto, model, source } => {
                writeln!(f, "Exception: {source:#}")?;
                writeln!(f, "Can't load network by using the following files: ")?;
                writeln!(f, "description (ONNX graph):     {}", proto.display())?;
                writeln!(f, "weights (ONNX external data): {}", model.display())?;
                writeln!(f, "bvlc_googlenet.caffemodel can be downloaded here:")?;
                writeln!(f, "{WEIGHTS_HINT_URL}")?;
                write!(
                    f,
                    "It must be converted to ONNX, with its weights saved as external data"
                )
            }
            ImageRead { path, source: Some(source) } => {
                write!(f, "Can't read image from the file: {} ({})", path.display(), source)
            }
            ImageRead { path, source: None } => {
                write!(f, "Can't read image from the file: {} (empty image)", path.display())
            }
            Inference(e) => write!(f, "Inference failed: {e:#}"),
            UnknownClass { index, labels } => write!(
                f,
                "Best class #{index} is unknown: only {labels} class labels are available"
            ),
            Report(e) => write!(f, "Failed to write result: {e}"),
        }
    }
}

impl std::error::Error for ClassifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use ClassifyError::*;
        match self {
            LabelsNotFound { source, .. } | LabelsRead { source, .. } | Report(source) => {
                Some(source)
            }
            ModelLoad { source, .. } | Inference(source) => Some(&**source),
            ImageRead { source, .. } => {
                source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
            }
            UnknownClass { .. } => None,
        }
    }
}

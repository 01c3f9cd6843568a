use std::path::PathBuf;

use wasm_bindgen::JsValue;

/// Errors raised while configuring a run or cleaning a GPX document.
#[derive(Debug, thiserror::Error)]
pub enum CleanerError {
    #[error("stride must be a positive integer, got {0}")]
    InvalidStride(usize),

    #[error("elevation offset must be a finite number, got {0}")]
    InvalidElevationOffset(f64),

    #[error("can't find directory {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("invalid value '{value}' for attribute '{attribute}' on <trkpt>")]
    InvalidCoordinate {
        attribute: &'static str,
        value: String,
    },

    #[error("invalid elevation '{0}'")]
    InvalidElevation(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("document has no root element")]
    NoRootElement,

    #[error("document ended inside <{0}>")]
    UnexpectedEof(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CleanerError>;

impl From<CleanerError> for JsValue {
    fn from(e: CleanerError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

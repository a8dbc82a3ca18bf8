use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http_failed:{0}")]
    Http(#[from] reqwest::Error),

    /// Non-OK status. `message` is the server's `message` field when it sent one.
    #[error("http_status:{status}:{}", message.as_deref().unwrap_or("-"))]
    Status { status: u16, message: Option<String> },

    #[error("json_failed:{0}")]
    Json(#[from] serde_json::Error),

    #[error("pdf_parse_failed:{0}")]
    PdfParse(String),

    #[error("pdf_save_failed:{0}")]
    PdfSave(String),

    #[error("signature_image_invalid:{0}")]
    Image(#[from] image::ImageError),

    #[error("data_uri_invalid:{0}")]
    DataUri(String),

    #[error("missing_{0}")]
    MissingInput(&'static str),

    #[error("not_logged_in")]
    NotLoggedIn,

    #[error("io_failed:{0}")]
    Io(#[from] std::io::Error),

    #[error("store_failed:{0}")]
    Store(String),

    #[error("config_invalid:{0}")]
    Config(String),
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::PdfParse(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::DataUri(e.to_string())
    }
}

impl Error {
    /// Server-provided message for API rejections.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Error::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Element identifiers the page exposes.
pub const FORM_ID: &str = "form";
pub const OUTPUT_ID: &str = "output";
pub const URL_INPUT_ID: &str = "url";
pub const GOALS_INPUT_ID: &str = "goals";
pub const IMAGE_INPUT_ID: &str = "image";
pub const STYLE_INPUT_ID: &str = "style";

const DEFAULT_STYLE: &str = "western";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());
        Ok(FileUpload {
            file_name,
            content_type: content_type_for(path).to_string(),
            bytes,
        })
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Where the submitter reads field values from at submit time.
pub trait InputSource: Send + Sync {
    fn value(&self, id: &str) -> Option<String>;

    fn file(&self, _id: &str) -> Option<FileUpload> {
        None
    }
}

/// In-memory form state.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    values: HashMap<String, String>,
    files: HashMap<String, FileUpload>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, id: &str, value: impl Into<String>) -> Self {
        self.values.insert(id.to_string(), value.into());
        self
    }

    pub fn with_file(mut self, id: &str, file: FileUpload) -> Self {
        self.files.insert(id.to_string(), file);
        self
    }

    pub fn set_value(&mut self, id: &str, value: impl Into<String>) {
        self.values.insert(id.to_string(), value.into());
    }
}

impl InputSource for FormValues {
    fn value(&self, id: &str) -> Option<String> {
        self.values.get(id).cloned()
    }

    fn file(&self, id: &str) -> Option<FileUpload> {
        self.files.get(id).cloned()
    }
}

/// JSON body of a submission. `goals` is sent as `null` when blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub url: String,
    pub goals: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Json(PageQuery),
    Form { image: FileUpload, style: String },
}

impl Payload {
    /// Reads the inputs as they are right now. A chosen image file means a
    /// multipart upload; otherwise the URL and goals go out as JSON.
    pub fn collect(inputs: &dyn InputSource) -> Self {
        if let Some(image) = inputs.file(IMAGE_INPUT_ID) {
            let style = inputs
                .value(STYLE_INPUT_ID)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_STYLE.to_string());
            return Payload::Form { image, style };
        }

        let url = inputs
            .value(URL_INPUT_ID)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let goals = inputs
            .value(GOALS_INPUT_ID)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Payload::Json(PageQuery { url, goals })
    }
}

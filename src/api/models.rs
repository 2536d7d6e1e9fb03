use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// JSON form of `POST /analyze-page`.
#[derive(Debug, Deserialize, Serialize)]
pub struct AnalyzeQuery {
    pub url: String,
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub notes: Vec<String>,
    pub model: String,
    pub analyzed_at: DateTime<Utc>,
}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, Url};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AppError, Result};

pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

static OG_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("Failed to parse og:image selector")
});

static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("img[src]").expect("Failed to parse img selector")
});

/// A validated page image, ready to hand to the model.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PageImage {
    pub fn new(content_type: &str, bytes: Vec<u8>) -> Result<Self> {
        let content_type = essence(content_type);
        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::UnsupportedMedia(
                "Unsupported image type. Use PNG, JPG, or WEBP.".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Empty image upload.".to_string()));
        }
        Ok(PageImage { content_type, bytes })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Lowercased media type without parameters (`image/png; q=1` -> `image/png`).
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn parse_page_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("No page URL provided.".to_string()));
    }
    let url = Url::parse(raw).map_err(|e| AppError::BadRequest(format!("Invalid page URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::BadRequest(format!("Unsupported URL scheme: {}", other))),
    }
}

/// Downloads page images for the JSON form of a submission.
#[derive(Clone)]
pub struct PageFetcher {
    http: Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(PageFetcher { http })
    }

    /// Fetches the page image behind `url`.
    ///
    /// An image response is used as is. An HTML response is searched for its
    /// `og:image`, then its first `<img>`, and that reference is fetched once.
    pub async fn fetch_page_image(&self, url: &Url) -> Result<PageImage> {
        let (content_type, bytes) = self.fetch_bytes(url).await?;
        if content_type != "text/html" {
            return PageImage::new(&content_type, bytes);
        }

        let html = String::from_utf8_lossy(&bytes);
        let image_url = find_image_reference(&html, url).ok_or_else(|| {
            AppError::FetchError(format!("No page image found at {}", url))
        })?;
        info!(page = %url, image = %image_url, "resolved page image from html");

        let (content_type, bytes) = self.fetch_bytes(&image_url).await?;
        PageImage::new(&content_type, bytes)
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<(String, Vec<u8>)> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FetchError(format!("{} returned {}", url, status)));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(essence)
            .unwrap_or_default();
        let bytes = response.bytes().await?.to_vec();
        debug!(%url, %content_type, len = bytes.len(), "fetched");
        Ok((content_type, bytes))
    }
}

pub fn find_image_reference(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);

    let og = document
        .select(&OG_IMAGE_SELECTOR)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|s| !s.is_empty());
    let src = og.or_else(|| {
        document
            .select(&IMG_SELECTOR)
            .filter_map(|el| el.value().attr("src"))
            .map(str::trim)
            .find(|s| !s.is_empty())
    })?;

    base.join(src).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_types() {
        let err = PageImage::new("image/gif", vec![1]).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMedia(_)));
    }

    #[test]
    fn rejects_empty_uploads() {
        let err = PageImage::new("image/png", Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "Empty image upload.");
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let image = PageImage::new("Image/JPEG; charset=binary", vec![0xff]).unwrap();
        assert_eq!(image.content_type, "image/jpeg");
    }

    #[test]
    fn data_url_is_base64() {
        let image = PageImage::new("image/png", b"hi".to_vec()).unwrap();
        assert_eq!(image.data_url(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn page_url_must_be_http() {
        assert!(parse_page_url("  ").is_err());
        assert!(parse_page_url("ftp://example.com/a.png").is_err());
        assert!(parse_page_url("not a url").is_err());
        assert_eq!(
            parse_page_url(" https://example.com/p.png ").unwrap().as_str(),
            "https://example.com/p.png"
        );
    }

    #[test]
    fn og_image_wins_over_img() {
        let base = Url::parse("https://comics.example/issue/3/").unwrap();
        let html = r#"<html><head><meta property="og:image" content="/pages/3.webp"></head>
            <body><img src="banner.png"></body></html>"#;
        let found = find_image_reference(html, &base).unwrap();
        assert_eq!(found.as_str(), "https://comics.example/pages/3.webp");
    }

    #[test]
    fn falls_back_to_first_img_relative_to_page() {
        let base = Url::parse("https://comics.example/issue/3/").unwrap();
        let html = r#"<body><img src=""><img src="page.png"></body>"#;
        let found = find_image_reference(html, &base).unwrap();
        assert_eq!(found.as_str(), "https://comics.example/issue/3/page.png");
    }

    #[test]
    fn no_image_reference() {
        let base = Url::parse("https://comics.example/").unwrap();
        assert!(find_image_reference("<p>nothing</p>", &base).is_none());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    ResearchReport,
    Article,
    MarketData,
    VideoTranscript,
    PodcastTranscript,
    Whitepaper,
    CaseStudy,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::ResearchReport => "research_report",
            ContentType::Article => "article",
            ContentType::MarketData => "market_data",
            ContentType::VideoTranscript => "video_transcript",
            ContentType::PodcastTranscript => "podcast_transcript",
            ContentType::Whitepaper => "whitepaper",
            ContentType::CaseStudy => "case_study",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "research_report" => Some(ContentType::ResearchReport),
            "article" => Some(ContentType::Article),
            "market_data" => Some(ContentType::MarketData),
            "video_transcript" => Some(ContentType::VideoTranscript),
            "podcast_transcript" => Some(ContentType::PodcastTranscript),
            "whitepaper" => Some(ContentType::Whitepaper),
            "case_study" => Some(ContentType::CaseStudy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content_type: ContentType,
    pub practice_area_id: i64,
    pub file_name: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub source_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub chunk_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub title: String,
    pub content_preview: String,
    pub practice_area: String,
    pub content_type: String,
    pub similarity: f64,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub query: String,
    pub total_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub users: u64,
    pub documents: u64,
    pub vectors: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub date: DateTime<Utc>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_names_match_wire() {
        for ct in [
            ContentType::ResearchReport,
            ContentType::Article,
            ContentType::MarketData,
            ContentType::VideoTranscript,
            ContentType::PodcastTranscript,
            ContentType::Whitepaper,
            ContentType::CaseStudy,
        ] {
            let json = serde_json::to_string(&ct).unwrap();
            assert_eq!(json, format!("\"{}\"", ct.as_str()));
            assert_eq!(ContentType::from_str(ct.as_str()), Some(ct));
        }
    }
}

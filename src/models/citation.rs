use serde::{Deserialize, Deserializer, Serialize};

/// A source shown next to the latest assistant answer. Recomputed per
/// response and never stored with the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub document_id: Option<String>,
    pub title: String,
    pub practice_area: String,
    pub content_type: String,
    pub content_preview: String,
    #[serde(deserialize_with = "deserialize_similarity")]
    pub similarity: f64,
}

impl SourceCitation {
    pub fn new(
        document_id: Option<&str>,
        title: &str,
        practice_area: &str,
        content_type: &str,
        content_preview: &str,
        similarity: f64,
    ) -> Self {
        Self {
            document_id: document_id.map(str::to_string),
            title: title.to_string(),
            practice_area: practice_area.to_string(),
            content_type: content_type.to_string(),
            content_preview: content_preview.to_string(),
            similarity: clamp_similarity(similarity),
        }
    }
}

/// Forces a score into `[0, 1]`. NaN counts as no similarity at all.
pub fn clamp_similarity(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

fn deserialize_similarity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_similarity)
}

/// Document ids of the citations that point at a stored document.
pub fn cited_document_ids(sources: &[SourceCitation]) -> Vec<String> {
    sources
        .iter()
        .filter_map(|s| s.document_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_clamped_on_deserialize() {
        let raw = r#"{"document_id":null,"title":"t","practice_area":"AI Platforms",
            "content_type":"article","content_preview":"p","similarity":1.7}"#;
        let citation: SourceCitation = serde_json::from_str(raw).unwrap();
        assert_eq!(citation.similarity, 1.0);

        let low = SourceCitation::new(None, "t", "a", "article", "p", -0.2);
        assert_eq!(low.similarity, 0.0);
        assert_eq!(clamp_similarity(f64::NAN), 0.0);
        assert_eq!(clamp_similarity(0.42), 0.42);
    }

    #[test]
    fn test_cited_document_ids_skips_missing() {
        let sources = vec![
            SourceCitation::new(Some("doc-1"), "a", "x", "article", "", 0.9),
            SourceCitation::new(None, "b", "x", "article", "", 0.8),
            SourceCitation::new(Some("doc-3"), "c", "x", "article", "", 0.7),
        ];
        assert_eq!(cited_document_ids(&sources), vec!["doc-1", "doc-3"]);
    }
}

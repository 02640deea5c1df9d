use serde::{Deserialize, Serialize};

/// Search request accepted by POST /api/search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Backend id; no default, clients must choose explicitly.
    pub encoder: String,
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    Translation,
    Paraphrase,
    /// Direct `surah:ayah` lookup, no retrieval involved
    Verse,
}

/// One search result on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub verse_id: String,
    pub translation: String,
    /// Vector (bi-encoder) similarity
    pub search_score: f32,
    /// Cross-encoder / LLM-judgment score
    pub rank_score: f32,
    pub final_score: f32,
    /// Matched gold question, lexical backend only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_match: Option<QuestionMatch>,
}

/// A gold-bank question matched by the lexical backend, with the verses
/// judged relevant for it.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionMatch {
    pub qid: String,
    pub question: String,
    pub verses: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub query: String,
    pub search_type: SearchType,
    pub processing_time: f64,
    pub encoder: String,
}

/// What a search produced, tagged by the path that produced it.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Semantic retrieval + rerank over the verse corpus
    Translation(Vec<VerseHit>),
    /// Lexical question-bank matches
    Ayatec(Vec<QuestionHit>),
    /// Direct verse-id lookup
    Verse(VerseHit),
}

/// A scored corpus verse from the online search path.
#[derive(Debug, Clone)]
pub struct VerseHit {
    pub corpus_id: usize,
    pub document_number: String,
    pub text: String,
    pub vector_score: f32,
    pub rerank_score: Option<f32>,
    pub final_score: f32,
}

/// A scored gold-bank question from the lexical backend.
#[derive(Debug, Clone)]
pub struct QuestionHit {
    pub qid: String,
    pub question: String,
    pub similarity: f32,
    pub verses: Vec<String>,
}

/// One query with its translated form and paraphrase variants, produced by
/// the upstream translation/paraphrase jobs. Read-only batch input.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRecord {
    pub qid: serde_json::Value,
    #[serde(default)]
    pub query: Option<String>,
    /// The translated form of the original query
    #[serde(default)]
    pub query_id: Option<String>,
    /// Paraphrase variants; element 0 is the original translation
    #[serde(default)]
    pub query_versions: Vec<String>,
}

impl QueryRecord {
    /// Stable string form of the qid (files mix numeric and string ids).
    pub fn qid_str(&self) -> String {
        match &self.qid {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// All variants to run: `query_versions` if present, else the single
    /// translated (or raw) query.
    pub fn variants(&self) -> Vec<String> {
        if !self.query_versions.is_empty() {
            return self.query_versions.clone();
        }
        self.query_id
            .clone()
            .or_else(|| self.query.clone())
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_deserializes_snake_case() {
        let t: SearchType = serde_json::from_str("\"paraphrase\"").unwrap();
        assert_eq!(t, SearchType::Paraphrase);
    }

    #[test]
    fn test_search_request_defaults() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query":"q","encoder":"indo-sbert"}"#).unwrap();
        assert_eq!(req.search_type, SearchType::Translation);
        assert_eq!(req.top_k, 5);
    }

    #[test]
    fn test_query_record_numeric_qid() {
        let rec: QueryRecord =
            serde_json::from_str(r#"{"qid":101,"query_id":"apa itu zakat"}"#).unwrap();
        assert_eq!(rec.qid_str(), "101");
        assert_eq!(rec.variants(), vec!["apa itu zakat".to_string()]);
    }

    #[test]
    fn test_query_record_versions_win_over_single_query() {
        let rec: QueryRecord = serde_json::from_str(
            r#"{"qid":"7","query_id":"v0","query_versions":["v0","p1","p2"]}"#,
        )
        .unwrap();
        assert_eq!(rec.variants().len(), 3);
        assert_eq!(rec.variants()[0], "v0");
    }
}

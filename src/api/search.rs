use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::encoder::{EncoderHandle, RegistryError};
use crate::models::{
    QuestionMatch, SearchOutcome, SearchRequest, SearchResponse, SearchResultItem, SearchType,
    VerseHit,
};
use crate::search::pipeline::search_verses;
use crate::state::AppState;

/// POST /api/search - verse search over the fixed corpus:
///   - `translation` / `paraphrase`: embed, retrieve, rerank, blend scores
///   - `verse`: direct `surah:ayah` lookup, no model involved
/// The chosen encoder backend is initialized lazily on first use.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let started = Instant::now();
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }

    let outcome = match req.search_type {
        SearchType::Verse => SearchOutcome::Verse(lookup_verse(&state, &query)?),
        // Paraphrase variants are produced upstream in batch jobs; an online
        // paraphrase query runs the same pipeline as a translation query.
        SearchType::Translation | SearchType::Paraphrase => {
            let handle = state
                .registry
                .get_or_initialize(&req.encoder)
                .await
                .map_err(|e| (registry_status(&e), e.to_string()))?;

            match handle {
                EncoderHandle::Lexical(index) => {
                    SearchOutcome::Ayatec(index.search(&query, req.top_k))
                }
                EncoderHandle::Semantic(handle) => SearchOutcome::Translation(
                    search_verses(
                        &handle,
                        &state.corpus,
                        &query,
                        req.top_k,
                        state.config.retrieve_top_k,
                    )
                    .await
                    .map_err(|e| {
                        tracing::error!("Search failed: {e:#}");
                        (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
                    })?,
                ),
            }
        }
    };

    Ok(Json(SearchResponse {
        results: outcome_to_items(outcome),
        query,
        search_type: req.search_type,
        processing_time: started.elapsed().as_secs_f64(),
        encoder: req.encoder,
    }))
}

fn outcome_to_items(outcome: SearchOutcome) -> Vec<SearchResultItem> {
    match outcome {
        SearchOutcome::Verse(hit) => vec![verse_item(hit)],
        SearchOutcome::Translation(hits) => hits
            .into_iter()
            .map(|hit| SearchResultItem {
                verse_id: hit.corpus_id.to_string(),
                translation: hit.text,
                search_score: hit.vector_score,
                rank_score: hit.rerank_score.unwrap_or(0.0),
                final_score: hit.final_score,
                question_match: None,
            })
            .collect(),
        SearchOutcome::Ayatec(hits) => hits
            .into_iter()
            .map(|hit| SearchResultItem {
                verse_id: hit.verses.first().cloned().unwrap_or_else(|| "-1".into()),
                translation: hit.question.clone(),
                search_score: hit.similarity,
                rank_score: 1.0,
                final_score: hit.similarity,
                question_match: Some(QuestionMatch {
                    qid: hit.qid,
                    question: hit.question,
                    verses: hit.verses,
                }),
            })
            .collect(),
    }
}

fn verse_item(hit: VerseHit) -> SearchResultItem {
    SearchResultItem {
        verse_id: hit.corpus_id.to_string(),
        translation: hit.text,
        search_score: hit.vector_score,
        rank_score: 1.0,
        final_score: hit.final_score,
        question_match: None,
    }
}

fn lookup_verse(state: &AppState, query: &str) -> Result<VerseHit, (StatusCode, String)> {
    let (surah, ayah) = parse_verse_query(query).ok_or((
        StatusCode::BAD_REQUEST,
        "Verse queries must look like surah:ayah, e.g. 2:255".to_string(),
    ))?;

    let verse = state.corpus.lookup_verse(surah, ayah).ok_or((
        StatusCode::NOT_FOUND,
        format!("Verse {surah}:{ayah} is not in the corpus"),
    ))?;

    Ok(VerseHit {
        corpus_id: verse.document_id,
        document_number: verse.document_number.clone(),
        text: verse.text.clone(),
        vector_score: 1.0,
        rerank_score: None,
        final_score: 1.0,
    })
}

/// Parse a direct verse query. Only `surah:ayah` with two positive integers
/// is accepted; ranges belong to corpus records, not requests.
fn parse_verse_query(query: &str) -> Option<(u32, u32)> {
    let (surah, ayah) = query.split_once(':')?;
    let surah: u32 = surah.trim().parse().ok()?;
    let ayah: u32 = ayah.trim().parse().ok()?;
    if surah == 0 || ayah == 0 {
        return None;
    }
    Some((surah, ayah))
}

fn registry_status(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::UnsupportedBackend(_) => StatusCode::BAD_REQUEST,
        RegistryError::BackendUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        RegistryError::InitializationInProgress(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionHit;

    #[test]
    fn test_lexical_outcome_carries_question_match() {
        let outcome = SearchOutcome::Ayatec(vec![QuestionHit {
            qid: "q7".into(),
            question: "siapa yang wajib membayar zakat".into(),
            similarity: 0.82,
            verses: vec!["2:43".into(), "9:103".into()],
        }]);
        let items = outcome_to_items(outcome);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].verse_id, "2:43");
        assert_eq!(items[0].rank_score, 1.0);
        let matched = items[0].question_match.as_ref().unwrap();
        assert_eq!(matched.qid, "q7");
        assert_eq!(matched.verses.len(), 2);
    }

    #[test]
    fn test_verse_outcome_scores_are_exact() {
        let outcome = SearchOutcome::Verse(VerseHit {
            corpus_id: 12,
            document_number: "2:255".into(),
            text: "the throne verse".into(),
            vector_score: 1.0,
            rerank_score: None,
            final_score: 1.0,
        });
        let items = outcome_to_items(outcome);
        assert_eq!(items[0].verse_id, "12");
        assert_eq!(items[0].final_score, 1.0);
        assert!(items[0].question_match.is_none());
    }

    #[test]
    fn test_parse_verse_query_accepts_simple_reference() {
        assert_eq!(parse_verse_query("2:255"), Some((2, 255)));
        assert_eq!(parse_verse_query(" 18 : 9 "), Some((18, 9)));
    }

    #[test]
    fn test_parse_verse_query_rejects_ranges_and_garbage() {
        assert_eq!(parse_verse_query("2:3-5"), None);
        assert_eq!(parse_verse_query("2"), None);
        assert_eq!(parse_verse_query("0:1"), None);
        assert_eq!(parse_verse_query("2:0"), None);
        assert_eq!(parse_verse_query("abc:def"), None);
    }

    #[test]
    fn test_registry_errors_map_to_statuses() {
        assert_eq!(
            registry_status(&RegistryError::UnsupportedBackend("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            registry_status(&RegistryError::BackendUnavailable {
                id: "x".into(),
                reason: "down".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            registry_status(&RegistryError::InitializationInProgress("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

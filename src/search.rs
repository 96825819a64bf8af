use std::time::{Duration, Instant};

use serde::Serialize;

use crate::{
    error::Result,
    pipeline::{Archive, FULL_TEXT_NOT_FOUND},
    settings::Settings,
    text_util,
};

/// Which categories a query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(String),
}

impl CategoryFilter {
    /// Query-string value selecting every category.
    pub const ALL_PARAM: &'static str = "all";

    /// Parse a `category` parameter. Missing, empty and `all` select
    /// everything; any other value is an exact category label.
    pub fn parse(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            None | Some("") => Self::All,
            Some(p) if p.eq_ignore_ascii_case(Self::ALL_PARAM) => Self::All,
            Some(p) => Self::Only(p.to_string()),
        }
    }

    /// The value to put back into a query string.
    pub fn as_param(&self) -> &str {
        match self {
            Self::All => Self::ALL_PARAM,
            Self::Only(label) => label,
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &str {
        match self {
            Self::All => "All archives",
            Self::Only(label) => label,
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(label) => label == category,
        }
    }
}

/// One user interaction with the search form.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// The search button was pressed (as opposed to just browsing).
    pub triggered: bool,
    pub filter: CategoryFilter,
    /// Candidates requested from the index before category filtering.
    pub fetch_k: usize,
    /// Results kept after filtering.
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(
        query: impl Into<String>,
        filter: CategoryFilter,
        settings: &Settings,
    ) -> Self {
        Self {
            query: query.into(),
            triggered: false,
            filter,
            fetch_k: settings.fetch_k,
            limit: settings.display_count,
        }
    }

    pub fn triggered(mut self, triggered: bool) -> Self {
        self.triggered = triggered;
        self
    }

    /// Empty query and no button press: nothing to do.
    pub fn is_idle(&self) -> bool {
        self.query.is_empty() && !self.triggered
    }
}

/// A search result ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub rank: usize,
    pub score: f32,
    pub source: String,
    pub file_name: String,
    pub category: String,
    /// The matching chunk.
    pub text: String,
    /// Full text of the originating document, or a placeholder.
    pub full_text: String,
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Nothing was asked.
    Idle,
    /// The archive has no index (empty, missing, or degraded).
    Unavailable,
    /// The query ran but nothing survived the category filter.
    NoMatches {
        query: String,
        filter: CategoryFilter,
    },
    Found {
        hits: Vec<Hit>,
        elapsed: Duration,
    },
}

/// Execute the query pipeline.
///
/// 1. Idle requests and archives without an index short-circuit
/// 2. Over-fetch `fetch_k` nearest chunks
/// 3. Keep those in the selected category, preserving similarity order
/// 4. Truncate to `limit` and attach each document's full text
///
/// Filtering happens after retrieval, so a category that is a small
/// minority of the archive can come back with fewer than `limit` results.
pub fn execute_search(
    archive: &Archive,
    request: &SearchRequest,
) -> Result<SearchOutcome> {
    if request.is_idle() {
        return Ok(SearchOutcome::Idle);
    }

    let Some(index) = archive.index.as_ref() else {
        return Ok(SearchOutcome::Unavailable);
    };

    let start = Instant::now();
    let candidates = index.similarity_search(&request.query, request.fetch_k)?;

    let hits: Vec<Hit> = candidates
        .into_iter()
        .filter(|n| request.filter.matches(&n.chunk.category))
        .take(request.limit)
        .enumerate()
        .map(|(i, n)| Hit {
            rank: i + 1,
            score: n.score,
            source: n.chunk.source.clone(),
            file_name: text_util::display_name(&n.chunk.source).to_string(),
            category: n.chunk.category.clone(),
            text: n.chunk.text.clone(),
            full_text: archive
                .full_text(&n.chunk.source)
                .unwrap_or(FULL_TEXT_NOT_FOUND)
                .to_string(),
        })
        .collect();

    tracing::debug!(
        query = %request.query,
        category = request.filter.as_param(),
        hits = hits.len(),
        "search executed"
    );

    if hits.is_empty() {
        return Ok(SearchOutcome::NoMatches {
            query: request.query.clone(),
            filter: request.filter.clone(),
        });
    }

    Ok(SearchOutcome::Found {
        hits,
        elapsed: start.elapsed(),
    })
}

/// Format an outcome for human-readable terminal output.
pub fn format_human(outcome: &SearchOutcome) {
    match outcome {
        SearchOutcome::Idle => println!("Nothing to search for."),
        SearchOutcome::Unavailable => {
            println!("Search is unavailable: the archive has no index.")
        }
        SearchOutcome::NoMatches { query, filter } => {
            println!("No results in [{}] for '{query}'.", filter.label())
        }
        SearchOutcome::Found { hits, elapsed } => {
            for h in hits {
                println!(
                    "{:>3}. [{:.3}] {} ({})",
                    h.rank, h.score, h.source, h.category
                );
                println!(
                    "     {}",
                    text_util::snippet(&h.text, text_util::DEFAULT_SNIPPET_MAX_CHARS)
                );
            }
            println!(
                "\n{} result(s) in {:.4}s",
                hits.len(),
                elapsed.as_secs_f64()
            );
        }
    }
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    query: &'a str,
    category: &'a str,
    status: &'static str,
    result_count: usize,
    results: &'a [Hit],
}

/// Format an outcome as JSON output.
pub fn format_json(outcome: &SearchOutcome, request: &SearchRequest) -> Result<()> {
    const NONE: &[Hit] = &[];
    let (status, results) = match outcome {
        SearchOutcome::Idle => ("idle", NONE),
        SearchOutcome::Unavailable => ("unavailable", NONE),
        SearchOutcome::NoMatches { .. } => ("no_matches", NONE),
        SearchOutcome::Found { hits, .. } => ("found", hits.as_slice()),
    };

    let json = JsonOutcome {
        query: &request.query,
        category: request.filter.as_param(),
        status,
        result_count: results.len(),
        results,
    };
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        category::{AI_TECHNOLOGY, FINTECH_ECONOMY, GENERAL, HUMANITIES_HISTORY},
        chunking::Chunk,
        embedding::{Embedder, HashEmbedder},
        ingestion::CategorizedDocument,
        pipeline::{BuildStatus, build_archive},
        vector_index::EmbeddingIndex,
    };

    fn hash_embedder() -> Result<Box<dyn Embedder>> {
        Ok(Box::new(HashEmbedder::default()))
    }

    /// An archive over a temp dir with a mix of categories.
    fn setup_archive() -> (Archive, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let docs = [
            ("ai_notes.txt", "neural networks and deep learning"),
            ("gpt.txt", "gpt models and neural scaling"),
            ("coins.txt", "bitcoin wallet and payment rails"),
            ("banking.txt", "the bank raised rates, the economy slowed"),
            ("rome.txt", "a short history of rome and its museum"),
            ("pasta.txt", "boil water, add salt, cook pasta"),
        ];
        for (name, content) in docs {
            std::fs::write(tmp.path().join(name), content).unwrap();
        }

        let archive =
            build_archive(&Settings::with_docs_dir(tmp.path()), hash_embedder);
        assert_eq!(archive.status, BuildStatus::Ready);
        (archive, tmp)
    }

    fn request(query: &str, filter: CategoryFilter) -> SearchRequest {
        SearchRequest::new(query, filter, &Settings::default())
    }

    fn hits(outcome: SearchOutcome) -> Vec<Hit> {
        match outcome {
            SearchOutcome::Found { hits, .. } => hits,
            other => panic!("expected hits, got {other:?}"),
        }
    }

    #[test]
    fn parse_category_filter() {
        assert_eq!(CategoryFilter::parse(None), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("")), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("ALL")), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse(Some(AI_TECHNOLOGY)),
            CategoryFilter::Only(AI_TECHNOLOGY.to_string())
        );
    }

    #[test]
    fn empty_query_without_trigger_is_idle() {
        let (archive, _tmp) = setup_archive();
        let outcome =
            execute_search(&archive, &request("", CategoryFilter::All)).unwrap();
        assert!(matches!(outcome, SearchOutcome::Idle));

        let empty = Archive {
            index: None,
            documents: vec![],
            categories: vec![],
            status: BuildStatus::Empty,
        };
        let outcome =
            execute_search(&empty, &request("", CategoryFilter::All)).unwrap();
        assert!(matches!(outcome, SearchOutcome::Idle));
    }

    #[test]
    fn triggered_empty_query_searches() {
        let (archive, _tmp) = setup_archive();
        let req = request("", CategoryFilter::All).triggered(true);
        let outcome = execute_search(&archive, &req).unwrap();
        assert!(!matches!(outcome, SearchOutcome::Idle));
    }

    #[test]
    fn no_index_is_unavailable() {
        let archive = Archive {
            index: None,
            documents: vec![],
            categories: vec![],
            status: BuildStatus::Empty,
        };
        let outcome =
            execute_search(&archive, &request("neural", CategoryFilter::All))
                .unwrap();
        assert!(matches!(outcome, SearchOutcome::Unavailable));
    }

    #[test]
    fn concrete_filter_only_returns_that_category() {
        let (archive, _tmp) = setup_archive();
        for label in [AI_TECHNOLOGY, FINTECH_ECONOMY, HUMANITIES_HISTORY] {
            let req = request("neural bitcoin history", CategoryFilter::Only(label.into()));
            let found = hits(execute_search(&archive, &req).unwrap());
            assert!(found.len() <= 5);
            assert!(found.iter().all(|h| h.category == label));
        }
    }

    #[test]
    fn concrete_filter_caps_a_large_category() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..8 {
            std::fs::write(
                tmp.path().join(format!("model_{i}.txt")),
                format!("neural model number {i}"),
            )
            .unwrap();
        }
        std::fs::write(tmp.path().join("coins.txt"), "bitcoin wallet").unwrap();

        let archive =
            build_archive(&Settings::with_docs_dir(tmp.path()), hash_embedder);
        let found = hits(
            execute_search(
                &archive,
                &request("neural model", CategoryFilter::Only(AI_TECHNOLOGY.into())),
            )
            .unwrap(),
        );

        assert_eq!(found.len(), 5);
        assert!(found.iter().all(|h| h.category == AI_TECHNOLOGY));
        let ranks: Vec<_> = found.iter().map(|h| h.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn all_filter_preserves_index_order() {
        let (archive, _tmp) = setup_archive();
        let query = "neural networks";
        let found =
            hits(execute_search(&archive, &request(query, CategoryFilter::All)).unwrap());
        assert_eq!(found.len(), 5);

        let index = archive.index.as_ref().unwrap();
        let expected: Vec<_> = index
            .similarity_search(query, 5)
            .unwrap()
            .into_iter()
            .map(|n| n.chunk.source.clone())
            .collect();
        let actual: Vec<_> = found.iter().map(|h| h.source.clone()).collect();
        assert_eq!(actual, expected);

        for (i, h) in found.iter().enumerate() {
            assert_eq!(h.rank, i + 1);
        }
    }

    #[test]
    fn default_category_documents_appear_under_all() {
        let (archive, _tmp) = setup_archive();
        let found = hits(
            execute_search(&archive, &request("cook pasta", CategoryFilter::All))
                .unwrap(),
        );
        assert_eq!(found[0].category, GENERAL);
        assert_eq!(found[0].file_name, "pasta.txt");
    }

    #[test]
    fn ai_notes_scenario() {
        let (archive, _tmp) = setup_archive();
        for filter in [
            CategoryFilter::All,
            CategoryFilter::Only(AI_TECHNOLOGY.into()),
        ] {
            let found = hits(
                execute_search(&archive, &request("deep learning", filter)).unwrap(),
            );
            assert_eq!(found[0].file_name, "ai_notes.txt");
            assert_eq!(found[0].category, AI_TECHNOLOGY);
            assert_eq!(found[0].full_text, "neural networks and deep learning");
        }
    }

    #[test]
    fn unknown_category_yields_no_matches() {
        let (archive, _tmp) = setup_archive();
        let outcome = execute_search(
            &archive,
            &request("neural", CategoryFilter::Only("Cooking".into())),
        )
        .unwrap();
        assert!(matches!(
            outcome,
            SearchOutcome::NoMatches { ref query, .. } if query == "neural"
        ));
    }

    #[test]
    fn small_fetch_k_can_starve_a_category() {
        let (archive, _tmp) = setup_archive();
        let mut req = request(
            "neural networks deep learning gpt",
            CategoryFilter::Only(HUMANITIES_HISTORY.into()),
        );
        req.fetch_k = 1;
        let outcome = execute_search(&archive, &req).unwrap();
        assert!(matches!(outcome, SearchOutcome::NoMatches { .. }));
    }

    #[test]
    fn missing_parent_document_uses_placeholder() {
        let chunk = Chunk {
            text: "orphan chunk".into(),
            source: "docs/gone.txt".into(),
            category: AI_TECHNOLOGY.into(),
            index: 0,
            start_offset: 0,
        };
        let index = EmbeddingIndex::from_chunks(
            vec![chunk],
            Box::new(HashEmbedder::default()),
            false,
        )
        .unwrap();
        let archive = Archive {
            index: Some(index),
            documents: vec![CategorizedDocument {
                source: "docs/other.txt".into(),
                content: "other".into(),
                category: AI_TECHNOLOGY.into(),
            }],
            categories: vec![AI_TECHNOLOGY.into()],
            status: BuildStatus::Ready,
        };

        let found = hits(
            execute_search(&archive, &request("orphan", CategoryFilter::All)).unwrap(),
        );
        assert_eq!(found[0].full_text, FULL_TEXT_NOT_FOUND);
        assert_eq!(found[0].file_name, "gone.txt");
    }
}

//! HTML rendering of the single search page.
//!
//! Everything here is a pure function of the archive, the request and the
//! search outcome, so pages can be tested without a server.

use std::fmt::Write;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    error::Result,
    pipeline::{Archive, BuildStatus},
    search::{CategoryFilter, Hit, SearchOutcome, SearchRequest},
    text_util,
};

pub const APP_TITLE: &str = "InfoStream";

const FOOTER: &str = concat!("InfoStream v", env!("CARGO_PKG_VERSION"));

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; background: #F0F7FF; color: #1A202C; display: flex; min-height: 100vh; }
nav { width: 260px; background: #E3EEF9; padding: 1.5rem 1rem; box-sizing: border-box; display: flex; flex-direction: column; }
nav h2 { font-size: 1rem; color: #2B6CB0; margin-top: 0; }
nav a { display: block; padding: .45rem .7rem; margin-bottom: .25rem; border-radius: 6px; color: #2C5282; text-decoration: none; }
nav a.selected { background: #3182CE; color: #fff; }
.counters { display: flex; gap: 1rem; margin-top: 1.5rem; }
.counter { flex: 1; background: #fff; border-radius: 6px; padding: .5rem; text-align: center; }
.counter b { display: block; font-size: 1.4rem; color: #2B6CB0; }
footer { margin-top: auto; font-size: .75rem; color: #4A5568; }
main { flex: 1; padding: 2rem 3rem; }
h1 { color: #2B6CB0; }
form { display: flex; gap: .5rem; margin-bottom: 1.5rem; }
form input[type=text] { flex: 1; padding: .6rem; border: 1px solid #3182CE; border-radius: 6px; }
form button { background: #3182CE; color: #fff; border: 0; border-radius: 6px; padding: .6rem 1.2rem; }
form button:hover { background: #2B6CB0; }
.card { background: #fff; border-left: 4px solid #3182CE; border-radius: 6px; padding: 1rem; margin-bottom: 1rem; }
.card h3 { margin: 0 0 .5rem; }
.tag { background: #EBF8FF; color: #2C5282; border-radius: 4px; padding: .1rem .5rem; font-size: .8rem; margin-left: .5rem; }
.info { background: #EBF8FF; color: #2C5282; border-radius: 6px; padding: .8rem 1rem; }
.meta { color: #4A5568; font-size: .85rem; }
details pre { white-space: pre-wrap; }
"#;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link that selects a category filter. A non-empty `query` is kept so the
/// same search re-runs under the new filter.
pub fn category_href(filter: &CategoryFilter, query: &str) -> String {
    let category = utf8_percent_encode(filter.as_param(), NON_ALPHANUMERIC);
    if query.is_empty() {
        format!("/?category={category}")
    } else {
        format!(
            "/?q={}&category={category}",
            utf8_percent_encode(query, NON_ALPHANUMERIC)
        )
    }
}

/// Render the whole page.
pub fn render_page(
    archive: &Archive,
    request: &SearchRequest,
    outcome: &Result<SearchOutcome>,
) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{APP_TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n"
    );
    render_sidebar(&mut html, archive, request);
    html.push_str("<main>\n");
    let _ = writeln!(html, "<h1>{APP_TITLE}</h1>");
    render_form(&mut html, request);
    render_results(&mut html, archive, request, outcome);
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, archive: &Archive, request: &SearchRequest) {
    let selected = &request.filter;
    html.push_str("<nav>\n<h2>Archives</h2>\n");

    let entries = std::iter::once(CategoryFilter::All).chain(
        archive
            .categories
            .iter()
            .map(|c| CategoryFilter::Only(c.clone())),
    );
    for filter in entries {
        let class = if &filter == selected {
            " class=\"selected\""
        } else {
            ""
        };
        let _ = writeln!(
            html,
            "<a href=\"{}\"{class}>{}</a>",
            escape_html(&category_href(&filter, &request.query)),
            escape_html(filter.label()),
        );
    }

    let current = match selected {
        CategoryFilter::All => "All".to_string(),
        CategoryFilter::Only(label) => archive.count_in_category(label).to_string(),
    };
    let _ = write!(
        html,
        "<div class=\"counters\">\n\
         <div class=\"counter\"><b>{}</b>Total docs</div>\n\
         <div class=\"counter\"><b>{}</b>Current</div>\n\
         </div>\n<footer>{FOOTER}</footer>\n</nav>\n",
        archive.total_documents(),
        current,
    );
}

fn render_form(html: &mut String, request: &SearchRequest) {
    let _ = write!(
        html,
        "<form method=\"get\" action=\"/\">\n\
         <input type=\"text\" name=\"q\" value=\"{}\" placeholder=\"Search the archive\" autofocus>\n\
         <input type=\"hidden\" name=\"category\" value=\"{}\">\n\
         <button type=\"submit\" name=\"search\" value=\"1\">Search</button>\n\
         </form>\n",
        escape_html(&request.query),
        escape_html(request.filter.as_param()),
    );
}

fn info(html: &mut String, message: &str) {
    let _ = writeln!(html, "<p class=\"info\">{}</p>", escape_html(message));
}

fn render_results(
    html: &mut String,
    archive: &Archive,
    request: &SearchRequest,
    outcome: &Result<SearchOutcome>,
) {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            info(html, &format!("Search failed: {e}"));
            return;
        }
    };

    match outcome {
        SearchOutcome::Idle if archive.is_searchable() => info(
            html,
            &format!(
                "Currently browsing {}. Enter a keyword to search.",
                request.filter.label()
            ),
        ),
        SearchOutcome::Idle | SearchOutcome::Unavailable => {
            info(html, &welcome_message(archive))
        }
        SearchOutcome::NoMatches { query, filter } => info(
            html,
            &format!("No results in [{}] for '{query}'.", filter.label()),
        ),
        SearchOutcome::Found { hits, elapsed } => {
            let _ = writeln!(
                html,
                "<p class=\"meta\">Found {} records ({:.4}s)</p>",
                hits.len(),
                elapsed.as_secs_f64()
            );
            for hit in hits {
                render_hit(html, hit);
            }
        }
    }
}

fn welcome_message(archive: &Archive) -> String {
    match &archive.status {
        BuildStatus::Created => {
            "Welcome to InfoStream. The archive directory was just created; \
             add .txt documents to it and restart."
                .to_string()
        }
        BuildStatus::Degraded(reason) => {
            format!("Search is unavailable: {reason}")
        }
        BuildStatus::Empty | BuildStatus::Ready => {
            "Welcome to InfoStream. The archive is empty; add .txt documents \
             and restart."
                .to_string()
        }
    }
}

fn render_hit(html: &mut String, hit: &Hit) {
    let _ = write!(
        html,
        "<div class=\"card\">\n\
         <h3>{}<span class=\"tag\">{}</span></h3>\n\
         <p>{}</p>\n\
         <details><summary>Full text</summary><pre>{}</pre></details>\n\
         </div>\n",
        escape_html(&hit.file_name),
        escape_html(&hit.category),
        escape_html(&text_util::snippet(
            &hit.text,
            text_util::DEFAULT_SNIPPET_MAX_CHARS
        )),
        escape_html(&hit.full_text),
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        category::{AI_TECHNOLOGY, FINTECH_ECONOMY},
        error::Error,
        ingestion::CategorizedDocument,
        settings::Settings,
    };

    fn archive(status: BuildStatus) -> Archive {
        Archive {
            index: None,
            documents: vec![
                CategorizedDocument {
                    source: "docs/a.txt".into(),
                    content: "neural".into(),
                    category: AI_TECHNOLOGY.into(),
                },
                CategorizedDocument {
                    source: "docs/b.txt".into(),
                    content: "bank".into(),
                    category: FINTECH_ECONOMY.into(),
                },
            ],
            categories: vec![AI_TECHNOLOGY.into(), FINTECH_ECONOMY.into()],
            status,
        }
    }

    fn request(query: &str, filter: CategoryFilter) -> SearchRequest {
        SearchRequest::new(query, filter, &Settings::default())
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn category_links_are_percent_encoded() {
        assert_eq!(category_href(&CategoryFilter::All, ""), "/?category=all");
        assert_eq!(
            category_href(&CategoryFilter::Only(AI_TECHNOLOGY.into()), ""),
            "/?category=AI%20%26%20Technology"
        );
    }

    #[test]
    fn category_links_keep_the_query() {
        assert_eq!(
            category_href(&CategoryFilter::Only(FINTECH_ECONOMY.into()), "deep learning"),
            "/?q=deep%20learning&category=FinTech%20%26%20Economy"
        );

        let html = render_page(
            &archive(BuildStatus::Ready),
            &request("neural", CategoryFilter::All),
            &Ok(SearchOutcome::Idle),
        );
        assert!(html.contains("href=\"/?q=neural&amp;category=all\""));
        assert!(html.contains(
            "href=\"/?q=neural&amp;category=AI%20%26%20Technology\""
        ));
    }

    #[test]
    fn sidebar_counts_and_selection() {
        let archive = archive(BuildStatus::Empty);
        let req = request("", CategoryFilter::Only(FINTECH_ECONOMY.into()));
        let html = render_page(&archive, &req, &Ok(SearchOutcome::Idle));

        assert!(html.contains("<b>2</b>Total docs"));
        assert!(html.contains("<b>1</b>Current"));
        assert!(html.contains("class=\"selected\">FinTech &amp; Economy</a>"));
        assert!(html.contains(FOOTER));

        let html = render_page(
            &archive,
            &request("", CategoryFilter::All),
            &Ok(SearchOutcome::Idle),
        );
        assert!(html.contains("<b>All</b>Current"));
    }

    #[test]
    fn idle_without_index_welcomes() {
        let html = render_page(
            &archive(BuildStatus::Created),
            &request("", CategoryFilter::All),
            &Ok(SearchOutcome::Idle),
        );
        assert!(html.contains("Welcome to InfoStream"));
    }

    #[test]
    fn query_is_escaped_in_form_and_message() {
        let req = request("<script>", CategoryFilter::Only("Cooking".into()));
        let html = render_page(
            &archive(BuildStatus::Empty),
            &req,
            &Ok(SearchOutcome::NoMatches {
                query: req.query.clone(),
                filter: req.filter.clone(),
            }),
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("value=\"&lt;script&gt;\""));
        assert!(html.contains("No results in [Cooking] for &#39;&lt;script&gt;&#39;."));
    }

    #[test]
    fn hits_render_with_snippet_and_full_text() {
        let hit = Hit {
            rank: 1,
            score: 0.9,
            source: "docs/ai_notes.txt".into(),
            file_name: "ai_notes.txt".into(),
            category: AI_TECHNOLOGY.into(),
            text: "neural networks".into(),
            full_text: "neural networks and deep learning".into(),
        };
        let html = render_page(
            &archive(BuildStatus::Ready),
            &request("neural", CategoryFilter::All),
            &Ok(SearchOutcome::Found {
                hits: vec![hit],
                elapsed: Duration::from_millis(12),
            }),
        );
        assert!(html.contains("Found 1 records (0.0120s)"));
        assert!(html.contains("ai_notes.txt<span class=\"tag\">AI &amp; Technology</span>"));
        assert!(html.contains("<p>neural networks...</p>"));
        assert!(html.contains("<pre>neural networks and deep learning</pre>"));
    }

    #[test]
    fn errors_become_messages() {
        let html = render_page(
            &archive(BuildStatus::Ready),
            &request("x", CategoryFilter::All),
            &Err(Error::Tokenizer("bad input".into())),
        );
        assert!(html.contains("Search failed"));
        assert!(html.contains("bad input"));
    }
}

mod brave;
mod duckduckgo;
mod rendered;

pub use brave::BraveSearch;
pub use duckduckgo::DuckDuckGoSearch;
pub use rendered::RenderedSearch;

use scraper::{Html, Selector};

/// `href`s matched by any of `selectors`, in document order per selector.
///
/// The parsed document is not `Send`, so this stays synchronous and callers
/// must not hold it across an await.
pub(crate) fn collect_hrefs(html: &str, selectors: &[Selector]) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for sel in selectors {
        for el in doc.select(sel) {
            if let Some(href) = el.value().attr("href") {
                out.push(href.to_string());
            }
        }
    }
    out
}

/// Parse static selector strings, skipping (and logging) any that fail.
pub(crate) fn parse_selectors(raw: &[&str]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::warn!(target: "web.search", selector = %s, error = %e, "search.selector_invalid");
                None
            }
        })
        .collect()
}

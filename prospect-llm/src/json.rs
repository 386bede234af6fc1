use regex::Regex;

/// Pull a JSON object or array out of model output.
///
/// Prefers a fenced ```json block, then the outermost `{...}` or `[...]` span.
pub fn extract_json_block(text: &str) -> Option<String> {
    let re_fence = Regex::new(r"(?s)```(?:json)?\s*([\[{].*?[\]}])\s*```").ok()?;
    if let Some(caps) = re_fence.captures(text) {
        return Some(caps.get(1)?.as_str().to_string());
    }
    let obj = span_between(text, '{', '}');
    let arr = span_between(text, '[', ']');
    match (obj, arr) {
        (Some(o), Some(a)) => {
            // Whichever opens first encloses the other.
            if text.find('[') < text.find('{') {
                Some(a)
            } else {
                Some(o)
            }
        }
        (o, a) => o.or(a),
    }
}

fn span_between(text: &str, open: char, close: char) -> Option<String> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| text[start..=end].to_string())
}

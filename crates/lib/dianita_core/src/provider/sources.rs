//! Source-citation extraction from raw provider responses.
//!
//! The Responses API reports the pages a web search consulted inside
//! `web_search_call` output items. This module owns the typed view of that
//! shape so nothing else in the crate depends on it.

use serde::Deserialize;

use super::Source;

/// Typed view of a Responses API response body, reduced to the parts we
/// read. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

/// One entry of the `output` array.
#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: String,
    /// Present on `message` items.
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Present on `web_search_call` items.
    #[serde(default)]
    pub action: Option<SearchAction>,
}

/// One content part of a `message` output item.
#[derive(Debug, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// The `action` object of a `web_search_call` item.
#[derive(Debug, Default, Deserialize)]
pub struct SearchAction {
    #[serde(default)]
    pub sources: Vec<RawSource>,
}

/// A `{title, url}` pair as the provider reports it.
#[derive(Debug, Deserialize)]
pub struct RawSource {
    pub title: Option<String>,
    pub url: Option<String>,
}

/// Concatenate the text of all `message` output items.
pub fn collect_output_text(response: &ProviderResponse) -> Option<String> {
    let mut out = String::new();
    for item in &response.output {
        if item.kind == "message" {
            for part in &item.content {
                if part.kind == "output_text" {
                    out.push_str(&part.text);
                }
            }
        }
    }
    let trimmed = out.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collect the `{title, url}` pairs of every search invocation, in
/// provider order. Duplicates are kept; `dedupe_sources` removes them.
pub fn extract_web_sources(response: &ProviderResponse) -> Vec<Source> {
    let mut out = Vec::new();
    for item in &response.output {
        if item.kind != "web_search_call" {
            continue;
        }
        let Some(action) = &item.action else { continue };
        for s in &action.sources {
            out.push(Source {
                title: s.title.clone(),
                url: s.url.clone(),
            });
        }
    }
    out
}

/// Deduplicate citations by the `url|title` composite key, preserving
/// first-seen order. Entries with neither a url nor a title are dropped.
pub fn dedupe_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(sources.len());
    for source in sources {
        let url = source.url.as_deref().unwrap_or("");
        let title = source.title.as_deref().unwrap_or("");
        if url.trim().is_empty() && title.trim().is_empty() {
            continue;
        }
        // "|" keeps a missing title from colliding with an entry whose url
        // happens to end the same way.
        if seen.insert(format!("{url}|{title}")) {
            out.push(source);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(url: &str, title: &str) -> Source {
        Source {
            title: if title.is_empty() {
                None
            } else {
                Some(title.to_string())
            },
            url: if url.is_empty() {
                None
            } else {
                Some(url.to_string())
            },
        }
    }

    #[test]
    fn dedupe_drops_duplicates_and_empty_keys() {
        let input = vec![
            src("a", "T"),
            src("a", "T"),
            src("", ""),
            src("b", ""),
        ];
        let out = dedupe_sources(input);
        assert_eq!(out, vec![src("a", "T"), src("b", "")]);
    }

    #[test]
    fn dedupe_preserves_first_seen_order() {
        let input = vec![src("b", ""), src("a", "T"), src("b", "")];
        let out = dedupe_sources(input);
        assert_eq!(out, vec![src("b", ""), src("a", "T")]);
    }

    #[test]
    fn missing_title_does_not_collide_with_missing_url() {
        let input = vec![src("x", ""), src("", "x")];
        let out = dedupe_sources(input);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn extracts_sources_from_search_calls_only() {
        let body = serde_json::json!({
            "output": [
                {
                    "type": "web_search_call",
                    "action": {
                        "sources": [
                            {"title": "Docs", "url": "https://example.com/docs"},
                            {"url": "https://example.com/blog"}
                        ]
                    }
                },
                {
                    "type": "message",
                    "content": [{"type": "output_text", "text": "hello"}]
                }
            ]
        });
        let response: ProviderResponse = serde_json::from_value(body).unwrap();

        let sources = extract_web_sources(&response);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title.as_deref(), Some("Docs"));
        assert_eq!(sources[1].url.as_deref(), Some("https://example.com/blog"));

        assert_eq!(collect_output_text(&response).as_deref(), Some("hello"));
    }

    #[test]
    fn empty_output_yields_no_text() {
        let response = ProviderResponse::default();
        assert_eq!(collect_output_text(&response), None);
        assert!(extract_web_sources(&response).is_empty());
    }

    #[test]
    fn whitespace_only_text_counts_as_missing() {
        let body = serde_json::json!({
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "  \n "}]}
            ]
        });
        let response: ProviderResponse = serde_json::from_value(body).unwrap();
        assert_eq!(collect_output_text(&response), None);
    }
}

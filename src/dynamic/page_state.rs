//! Page state extraction (spec §4.7 "Page state extraction"): simplifies
//! raw HTML (or an equivalent provider payload) into the bounded record the
//! AI oracle sees. Raw HTML is never sent uncapped to the oracle.

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const MAX_SIMPLIFIED_HTML: usize = 50 * 1024;
const MAX_VISIBLE_TEXT: usize = 2 * 1024;
const MAX_LINKS: usize = 20;
const MAX_FORMS: usize = 5;
const MAX_CLICKABLES: usize = 10;
const TRUNCATION_MARKER: &str = "\u{2026} [truncated]";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormInput {
    pub name: String,
    pub input_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormSummary {
    pub action: String,
    pub method: String,
    pub inputs: Vec<FormInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clickable {
    pub selector: String,
    pub text: String,
}

/// The bounded record handed to the AI oracle (spec §4.7): `{url, title,
/// simplifiedHtml<=50KB, links[<=20]{href,text}, forms[<=5]{action,method,
/// inputs[]}, clickables[<=10], visibleText<=2KB}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub simplified_html: String,
    pub links: Vec<Link>,
    pub forms: Vec<FormSummary>,
    pub clickables: Vec<Clickable>,
    pub visible_text: String,
}

fn title_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("title").expect("static title selector is valid"))
}

fn link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a[href]").expect("static link selector is valid"))
}

fn form_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("form").expect("static form selector is valid"))
}

fn form_field_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("input, select, textarea").expect("static form field selector is valid"))
}

fn clickable_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse("button, input[type=submit], input[type=button], [role=button]").expect("static clickable selector is valid")
    })
}

fn whitespace_regex_free_collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Joins an element's direct text content, the way a browser's
/// `textContent` would, collapsing runs of whitespace.
fn element_text(element: &ElementRef) -> String {
    whitespace_regex_free_collapse(&element.text().collect::<Vec<_>>().join(" "))
}

/// Visible text only: walks the tree skipping `script`/`style`/`noscript`
/// subtrees entirely, since their text nodes are markup/program text, not
/// content a user would see.
fn visible_text_of(root: ElementRef) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        if let Some(element) = node.value().as_element() {
            if matches!(element.name(), "script" | "style" | "noscript") {
                continue;
            }
        }
        if let Some(text) = node.value().as_text() {
            let parent_is_skipped = node
                .parent()
                .and_then(|p| p.value().as_element())
                .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
                .unwrap_or(false);
            if parent_is_skipped {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    }
    whitespace_regex_free_collapse(&parts.join(" "))
}

fn truncate(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes.saturating_sub(TRUNCATION_MARKER.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATION_MARKER)
}

/// Parses HTML with `scraper`/`html5ever`, extracts the bounded structured
/// fields with CSS selectors, and renders the simplification handed to the
/// oracle as markdown via `fast_html2md` (spec §4.7 "Simplification").
pub struct PageStateExtractor;

impl PageStateExtractor {
    /// `PageStateExtractor.Extract(raw)` (spec §4.7). `raw` is whatever the
    /// provider returned as the Navigate result's `data` field; `html` is
    /// read from it as a string, `url`/`title` fall back to provider-
    /// declared values when present.
    pub fn extract(url: &str, html: &str) -> PageState {
        debug!(url, html_len = html.len(), "PageStateExtractor::extract: called");
        let document = Html::parse_document(html);

        let title = document
            .select(title_selector())
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        let links = document
            .select(link_selector())
            .take(MAX_LINKS)
            .map(|el| Link {
                href: el.value().attr("href").unwrap_or_default().to_string(),
                text: element_text(&el),
            })
            .collect();

        let forms = document
            .select(form_selector())
            .take(MAX_FORMS)
            .map(|form_el| {
                let action = form_el.value().attr("action").unwrap_or_default().to_string();
                let method = form_el.value().attr("method").map(str::to_uppercase).unwrap_or_else(|| "GET".to_string());
                let inputs = form_el
                    .select(form_field_selector())
                    .map(|field_el| FormInput {
                        name: field_el.value().attr("name").unwrap_or_default().to_string(),
                        input_type: field_el.value().attr("type").unwrap_or("text").to_string(),
                    })
                    .collect();
                FormSummary { action, method, inputs }
            })
            .collect();

        let clickables = document
            .select(clickable_selector())
            .take(MAX_CLICKABLES)
            .map(|el| {
                let text = element_text(&el);
                let selector = el
                    .value()
                    .attr("id")
                    .map(|id| format!("#{id}"))
                    .unwrap_or_else(|| el.value().name().to_string());
                Clickable { selector, text }
            })
            .collect();

        let visible_text = truncate(&visible_text_of(document.root_element()), MAX_VISIBLE_TEXT);
        let simplified_html = truncate(&fast_html2md::rewrite_html(html, false), MAX_SIMPLIFIED_HTML);

        PageState {
            url: url.to_string(),
            title,
            simplified_html,
            links,
            forms,
            clickables,
            visible_text,
        }
    }

    /// Convenience wrapper over a provider's raw `ExecutionResult` data
    /// payload (spec §4.7 algorithm: `pageState := PageStateExtractor.
    /// Extract(result.data)`). Expects `{url, html}` fields; missing fields
    /// degrade to empty strings rather than failing, since extraction is
    /// never on the critical path for step success.
    pub fn extract_from_result_data(data: &Value) -> PageState {
        let url = data.get("url").and_then(Value::as_str).unwrap_or_default();
        let html = data.get("html").and_then(Value::as_str).unwrap_or_default();
        Self::extract(url, html)
    }
}

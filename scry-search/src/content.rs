//! HTML content extraction — strips boilerplate and returns readable text.
//!
//! Parses HTML once, picks the most specific content root (`article`,
//! `main`, `[role="main"]`, then `body`), and walks the DOM collecting
//! text while skipping boilerplate subtrees (scripts, styles, navigation,
//! ads chrome). The result is clean text suitable for summarisation.

use crate::error::{Result, SearchError};
use crate::types::PageContent;
use scraper::{ElementRef, Html, Selector};

/// Default maximum characters to return from extracted content.
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Elements whose entire subtree is excluded from extracted text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe", "form",
    "button",
];

/// Content-root selectors, most specific first.
const CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Extract readable text content from raw HTML.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if no extractable content is found.
pub fn extract_content(html: &str, url: &str) -> Result<PageContent> {
    extract_content_with_limit(html, url, DEFAULT_MAX_CHARS)
}

/// Extract readable text content from raw HTML with a custom character
/// limit.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if no extractable content is found.
pub fn extract_content_with_limit(html: &str, url: &str, max_chars: usize) -> Result<PageContent> {
    let document = Html::parse_document(html);

    let title = extract_title(&document);

    let mut raw_text = String::new();
    if let Some(root) = find_content_root(&document) {
        collect_text(root, &mut raw_text);
    }

    let text = normalise_whitespace(&raw_text);
    if text.is_empty() {
        return Err(SearchError::Parse("no extractable content found".into()));
    }

    let text = truncate_to_limit(&text, max_chars);
    let word_count = text.split_whitespace().count();

    Ok(PageContent {
        url: url.to_owned(),
        title,
        text,
        word_count,
    })
}

/// Extract the page title from the `<title>` element.
fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_owned()
}

/// Find the most specific content root present in the document.
fn find_content_root(document: &Html) -> Option<ElementRef<'_>> {
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            return Some(element);
        }
    }
    None
}

/// Recursively collect text under `element`, skipping boilerplate
/// subtrees entirely.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if SKIP_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
}

/// Collapse whitespace: runs of spaces become one space, runs of blank
/// lines become one blank line, lines are trimmed.
fn normalise_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;
        out.push_str(&collapsed);
    }

    out
}

/// Truncate text to the given character limit, breaking at a char boundary.
fn truncate_to_limit(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_owned();
    }

    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}\n\n[content truncated]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_title_from_html() {
        let html = "<html><head><title>My Page Title</title></head><body>Content</body></html>";
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert_eq!(page.title, "My Page Title");
    }

    #[test]
    fn extract_title_empty_when_missing() {
        let html = "<html><body>Content here</body></html>";
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.title.is_empty());
    }

    #[test]
    fn extract_content_from_article() {
        let html = r#"<html><body>
            <nav>Navigation stuff</nav>
            <article>Article content here</article>
            <footer>Footer stuff</footer>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Article content"));
        assert!(!page.text.contains("Navigation"));
        assert!(!page.text.contains("Footer"));
    }

    #[test]
    fn fallback_to_body() {
        let html = "<html><body>Body content only</body></html>";
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Body content"));
    }

    #[test]
    fn strip_script_tags() {
        let html = r#"<html><body>
            <p>Real content</p>
            <script>var x = 1; alert('hi');</script>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Real content"));
        assert!(!page.text.contains("alert"));
        assert!(!page.text.contains("var x"));
    }

    #[test]
    fn strip_style_tags() {
        let html = r#"<html><body>
            <p>Styled content</p>
            <style>.foo { color: red; }</style>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Styled content"));
        assert!(!page.text.contains("color: red"));
    }

    #[test]
    fn strip_nav_footer_header_aside() {
        let html = r#"<html><body>
            <header>Header content</header>
            <nav>Nav links</nav>
            <main>Main content</main>
            <aside>Sidebar stuff</aside>
            <footer>Footer info</footer>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Main content"));
        assert!(!page.text.contains("Header content"));
        assert!(!page.text.contains("Nav links"));
        assert!(!page.text.contains("Sidebar stuff"));
        assert!(!page.text.contains("Footer info"));
    }

    #[test]
    fn strip_forms_and_buttons() {
        let html = r#"<html><body>
            <p>Readable part</p>
            <form><input name="q"><button>Subscribe now</button></form>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Readable part"));
        assert!(!page.text.contains("Subscribe now"));
    }

    #[test]
    fn word_count_accuracy() {
        let html = "<html><body>One two three four five</body></html>";
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert_eq!(page.word_count, 5);
    }

    #[test]
    fn max_chars_truncation() {
        let long_text = "word ".repeat(1000);
        let html = format!("<html><body>{long_text}</body></html>");
        let page =
            extract_content_with_limit(&html, "https://example.com", 100).expect("should parse");
        assert!(page.text.len() <= 125);
        assert!(page.text.contains("[content truncated]"));
    }

    #[test]
    fn empty_html_returns_parse_error() {
        let result = extract_content("", "https://example.com");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("no extractable content"));
    }

    #[test]
    fn whitespace_only_html_returns_parse_error() {
        let html = "<html><body>   \n\n\n   </body></html>";
        let result = extract_content(html, "https://example.com");
        assert!(result.is_err());
    }

    #[test]
    fn whitespace_normalisation() {
        let html = "<html><body>Word1    Word2\n\n\n\n\nWord3</body></html>";
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(!page.text.contains("  "));
        assert!(!page.text.contains("\n\n\n"));
    }

    #[test]
    fn url_preserved_in_output() {
        let html = "<html><body>Content</body></html>";
        let page = extract_content(html, "https://test.example.com/page").expect("should parse");
        assert_eq!(page.url, "https://test.example.com/page");
    }

    #[test]
    fn strip_noscript_and_iframe() {
        let html = r#"<html><body>
            <p>Visible content</p>
            <noscript>Enable JS please</noscript>
            <iframe src="ad.html">Ad frame</iframe>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Visible content"));
        assert!(!page.text.contains("Enable JS"));
        assert!(!page.text.contains("Ad frame"));
    }

    #[test]
    fn main_content_preferred_over_body() {
        let html = r#"<html><body>
            <div>Outer div</div>
            <main>Main content area</main>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Main content area"));
        assert!(!page.text.contains("Outer div"));
    }

    #[test]
    fn default_max_chars_constant() {
        assert_eq!(DEFAULT_MAX_CHARS, 100_000);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "Hello ".to_owned() + &"é".repeat(200);
        let html = format!("<html><body>{text}</body></html>");
        // Must not panic splitting a multi-byte char.
        let page =
            extract_content_with_limit(&html, "https://example.com", 50).expect("should parse");
        assert!(page.text.contains("[content truncated]"));
    }

    #[test]
    fn deeply_nested_html_extracts_content() {
        let html = r#"<html><body>
            <div><div><div><div><div>
                <p>Deeply nested paragraph content here.</p>
            </div></div></div></div></div>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("Deeply nested paragraph"));
    }

    #[test]
    fn huge_text_truncated_at_limit() {
        let word = "lorem ";
        let huge_body = word.repeat(50_000);
        let html = format!("<html><body><p>{huge_body}</p></body></html>");
        let page =
            extract_content_with_limit(&html, "https://example.com", 1000).expect("should parse");
        assert!(
            page.text.len() <= 1100,
            "text should be truncated near limit, got {} chars",
            page.text.len()
        );
    }

    #[test]
    fn multiple_article_elements_take_first() {
        let html = r#"<html><body>
            <article>First article content here.</article>
            <article>Second article content here.</article>
        </body></html>"#;
        let page = extract_content(html, "https://example.com").expect("should parse");
        assert!(page.text.contains("First article"));
    }

    #[test]
    fn only_scripts_and_styles_returns_error() {
        let html = r#"<html>
            <head><style>body{color:red}</style></head>
            <body>
                <script>console.log('hello');</script>
                <style>.hidden{display:none}</style>
            </body>
        </html>"#;
        let result = extract_content(html, "https://example.com");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("no extractable content"));
    }

    #[test]
    fn cyrillic_content_extraction() {
        let html = "<html><head><title>Статья</title></head><body><article>Содержание статьи на русском языке.</article></body></html>";
        let page = extract_content(html, "https://example.ru").expect("should parse");
        assert_eq!(page.title, "Статья");
        assert!(page.text.contains("Содержание статьи"));
        assert_eq!(page.word_count, 5);
    }
}

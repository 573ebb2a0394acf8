//! Minimal HTML for graph pages.

use serde::Serialize;
use std::fmt::Write;
use weft_core::{PageHandle, PageId, PageKind, PageTemplate, WebGraph};

/// A link as shown on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub path: String,
    pub kind: PageKind,
}

/// Everything needed to render one page, detached from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub id: PageId,
    pub kind: PageKind,
    pub template: PageTemplate,
    pub path: String,
    pub links: Vec<PageLink>,
}

impl PageView {
    /// Captures a page and the paths of its outgoing links.
    pub fn capture(graph: &WebGraph, handle: PageHandle) -> Option<Self> {
        let page = graph.page(handle)?;
        let links = graph
            .links(handle)
            .into_iter()
            .filter_map(|target| {
                graph.page(target).map(|linked| PageLink {
                    path: graph.path(target),
                    kind: linked.kind,
                })
            })
            .collect();

        Some(Self {
            id: page.id,
            kind: page.kind,
            template: page.template(),
            path: graph.path(handle),
            links,
        })
    }
}

/// Renders a page as a small HTML document in its template's layout.
pub fn render_page(view: &PageView) -> String {
    let mut html = String::new();
    let title = format!("{} {}", view.kind, view.id);

    // Writing to a String cannot fail.
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>");
    let _ = writeln!(html, "<head><title>{}</title></head>", escape(&title));
    let _ = writeln!(html, "<body>");
    match view.template {
        PageTemplate::Directory => render_directory(&mut html, view, &title),
        PageTemplate::Article => render_article(&mut html, view, &title),
    }
    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");
    html
}

fn render_directory(html: &mut String, view: &PageView, title: &str) {
    let _ = writeln!(
        html,
        "<h1 data-kind=\"{}\">{}</h1>",
        view.kind,
        escape(title)
    );
    let _ = writeln!(html, "<p>{}</p>", escape(&view.path));
    if !view.links.is_empty() {
        let _ = writeln!(html, "<ul>");
        for link in &view.links {
            let _ = writeln!(html, "<li>{}</li>", anchor(link));
        }
        let _ = writeln!(html, "</ul>");
    }
}

fn render_article(html: &mut String, view: &PageView, title: &str) {
    let _ = writeln!(html, "<article data-kind=\"{}\">", view.kind);
    let _ = writeln!(html, "<h1>{}</h1>", escape(title));
    let _ = writeln!(html, "<p>{}</p>", escape(&view.path));
    if !view.links.is_empty() {
        let links: Vec<String> = view.links.iter().map(anchor).collect();
        let _ = writeln!(html, "<p>See also: {}</p>", links.join(", "));
    }
    let _ = writeln!(html, "</article>");
}

fn anchor(link: &PageLink) -> String {
    let path = escape(&link.path);
    format!(
        "<a href=\"{}\" data-kind=\"{}\">{}</a>",
        path, link.kind, path
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

//! Markdown to standalone HTML for single-page export and printing.
//!
//! This is an ordered series of regex substitutions, not a parser. The pass
//! order matters: code and tables are shielded first and restored last,
//! headings and emphasis run longest marker first, and images run before
//! links because image syntax contains link syntax.

use std::sync::LazyLock;

use regex::{Captures, Regex};

pub const DEFAULT_DOCUMENT_TITLE: &str = "Notion Export";

const BLOCK_MARK: char = '\u{1A}';

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid transpiler regex")
}

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)```(\w*)\n(.*?)```"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| re(r"`([^`]+)`"));
static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?m)^\|(.+)\|[ \t]*\n\|[-:\s|]+\|[ \t]*\n((?:\|.+\|[ \t]*\n?)+)")
});
static HEADINGS: LazyLock<Vec<(Regex, usize)>> = LazyLock::new(|| {
    (1..=6)
        .rev()
        .map(|level| (re(&format!(r"(?m)^#{{{level}}}[ \t]+(.+)$")), level))
        .collect()
});
static TASK_DONE: LazyLock<Regex> = LazyLock::new(|| re(r"(?mi)^[-*][ \t]+\[x\][ \t]+(.+)$"));
static TASK_OPEN: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^[-*][ \t]+\[[ \t]?\][ \t]+(.+)$"));
static EMPHASIS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (re(r"\*\*\*(.+?)\*\*\*"), "<strong><em>${1}</em></strong>"),
        (re(r"\*\*(.+?)\*\*"), "<strong>${1}</strong>"),
        (re(r"\*(.+?)\*"), "<em>${1}</em>"),
        (re(r"___(.+?)___"), "<strong><em>${1}</em></strong>"),
        (re(r"__(.+?)__"), "<strong>${1}</strong>"),
        (re(r"_(.+?)_"), "<em>${1}</em>"),
    ]
});
static STRIKE: LazyLock<Regex> = LazyLock::new(|| re(r"~~(.+?)~~"));
static IMAGE: LazyLock<Regex> = LazyLock::new(|| re(r"!\[([^\]]*)\]\(([^)]+)\)"));
static LINK: LazyLock<Regex> = LazyLock::new(|| re(r"\[([^\]]+)\]\(([^)]+)\)"));
static RULE_DASH: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^---+$"));
static RULE_STAR: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^\*\*\*+$"));
static QUOTE: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^>[ \t]+(.+)$"));
static QUOTE_JOIN: LazyLock<Regex> = LazyLock::new(|| re(r"</blockquote>\s*<blockquote>"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^[-*+][ \t]+(.+)$"));
static ORDERED: LazyLock<Regex> = LazyLock::new(|| re(r"(?m)^\d+\.[ \t]+(.+)$"));
static LIST_RUN: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?m)^(?:<li(?: class="task-item")?>.*</li>(?:\n|$))+"#));
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| re(r"\n\n+"));
static EMPTY_PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| re(r"<p>\s*(?:<br />)?\s*</p>"));
static UNWRAP_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"<p>(<h[1-6]>|<ul>|<blockquote>|<hr />|{BLOCK_MARK}[BT])"
    ))
});
static UNWRAP_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(</h[1-6]>|</ul>|</blockquote>|<hr />|[BT]\d+{BLOCK_MARK})</p>"
    ))
});

/// Full HTML document with embedded light/dark/print styles.
pub fn to_standalone_html(markdown: &str, title: Option<&str>) -> String {
    let body = markdown_to_html_fragment(markdown);
    let title = escape_html(title.unwrap_or(DEFAULT_DOCUMENT_TITLE));
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\">\n  \
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n  \
<title>{title}</title>\n  <style>{STYLESHEET}  </style>\n</head>\n<body>\n  {body}\n</body>\n</html>"
    )
}

/// Body HTML for `markdown`, without the surrounding document.
pub fn markdown_to_html_fragment(markdown: &str) -> String {
    let mut html = markdown.replace("\r\n", "\n");

    let mut blocks: Vec<String> = Vec::new();
    html = FENCED_CODE
        .replace_all(&html, |caps: &Captures| {
            let lang = if caps[1].is_empty() { "plaintext" } else { &caps[1] };
            blocks.push(format!(
                "<pre><code class=\"language-{lang}\">{}</code></pre>",
                escape_html(caps[2].trim())
            ));
            placeholder('B', blocks.len() - 1)
        })
        .into_owned();

    let mut inline: Vec<String> = Vec::new();
    html = INLINE_CODE
        .replace_all(&html, |caps: &Captures| {
            inline.push(format!("<code>{}</code>", escape_html(&caps[1])));
            placeholder('I', inline.len() - 1)
        })
        .into_owned();

    // A table always stands as its own block.
    let mut tables: Vec<String> = Vec::new();
    html = TABLE
        .replace_all(&html, |caps: &Captures| {
            tables.push(render_table(caps));
            format!("\n\n{}\n\n", placeholder('T', tables.len() - 1))
        })
        .into_owned();

    for (pattern, level) in HEADINGS.iter() {
        html = pattern
            .replace_all(&html, format!("<h{level}>${{1}}</h{level}>").as_str())
            .into_owned();
    }

    html = TASK_DONE
        .replace_all(
            &html,
            r#"<li class="task-item"><input type="checkbox" checked disabled> ${1}</li>"#,
        )
        .into_owned();
    html = TASK_OPEN
        .replace_all(
            &html,
            r#"<li class="task-item"><input type="checkbox" disabled> ${1}</li>"#,
        )
        .into_owned();

    for (pattern, replacement) in EMPHASIS.iter() {
        html = pattern.replace_all(&html, *replacement).into_owned();
    }

    html = STRIKE.replace_all(&html, "<del>${1}</del>").into_owned();
    html = IMAGE
        .replace_all(&html, r#"<img src="${2}" alt="${1}" />"#)
        .into_owned();
    html = LINK
        .replace_all(
            &html,
            r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
        )
        .into_owned();

    html = RULE_DASH.replace_all(&html, "<hr />").into_owned();
    html = RULE_STAR.replace_all(&html, "<hr />").into_owned();

    html = QUOTE
        .replace_all(&html, "<blockquote>${1}</blockquote>")
        .into_owned();
    html = QUOTE_JOIN.replace_all(&html, "<br>").into_owned();

    html = BULLET
        .replace_all(&html, |caps: &Captures| {
            let item = &caps[1];
            if is_task_marker(item) {
                caps[0].to_string()
            } else {
                format!("<li>{item}</li>")
            }
        })
        .into_owned();
    html = ORDERED.replace_all(&html, "<li>${1}</li>").into_owned();
    html = LIST_RUN
        .replace_all(&html, |caps: &Captures| {
            let run = &caps[0];
            let items: String = run.lines().map(str::trim).collect();
            let tail = if run.ends_with('\n') { "\n" } else { "" };
            format!("<ul>{items}</ul>{tail}")
        })
        .into_owned();

    html = PARAGRAPH_BREAK.replace_all(&html, "</p><p>").into_owned();
    html = html.replace('\n', "<br />");
    html = format!("<p>{html}</p>");

    html = EMPTY_PARAGRAPH.replace_all(&html, "").into_owned();
    html = UNWRAP_OPEN.replace_all(&html, "${1}").into_owned();
    html = UNWRAP_CLOSE.replace_all(&html, "${1}").into_owned();

    for (idx, table) in tables.iter().enumerate() {
        html = html.replacen(&placeholder('T', idx), table, 1);
    }
    for (idx, block) in blocks.iter().enumerate() {
        html = html.replacen(&placeholder('B', idx), block, 1);
    }
    for (idx, code) in inline.iter().enumerate() {
        html = html.replacen(&placeholder('I', idx), code, 1);
    }

    html
}

fn placeholder(kind: char, idx: usize) -> String {
    format!("{BLOCK_MARK}{kind}{idx}{BLOCK_MARK}")
}

fn is_task_marker(item: &str) -> bool {
    let lower = item.to_ascii_lowercase();
    lower.starts_with("[ ]") || lower.starts_with("[x]")
}

fn render_table(caps: &Captures) -> String {
    let headers: Vec<&str> = caps[1]
        .split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect();

    let mut table = String::from("<table class=\"markdown-table\"><thead><tr>");
    for header in headers {
        table.push_str(&format!("<th>{}</th>", inline_markdown(header)));
    }
    table.push_str("</tr></thead><tbody>");

    for row in caps[2].trim().lines() {
        let row = row.trim();
        let inner = row.strip_prefix('|').unwrap_or(row);
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        table.push_str("<tr>");
        for cell in inner.split('|').map(str::trim) {
            table.push_str(&format!("<td>{}</td>", inline_markdown(cell)));
        }
        table.push_str("</tr>");
    }

    table.push_str("</tbody></table>");
    table
}

/// Inline formatting for one table cell. Runs per cell so markers never
/// pair up across cell boundaries.
fn inline_markdown(text: &str) -> String {
    let mut cell = text.to_string();
    for (pattern, replacement) in EMPHASIS.iter() {
        cell = pattern.replace_all(&cell, *replacement).into_owned();
    }
    cell = STRIKE.replace_all(&cell, "<del>${1}</del>").into_owned();
    cell = IMAGE
        .replace_all(&cell, r#"<img src="${2}" alt="${1}" />"#)
        .into_owned();
    LINK.replace_all(
        &cell,
        r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
    )
    .into_owned()
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLESHEET: &str = r#"
    :root {
      --text-color: #37352f;
      --bg-color: #ffffff;
      --code-bg: #f7f6f3;
      --border-color: rgba(55, 53, 47, 0.16);
      --link-color: #2383e2;
      --table-header-bg: #f7f6f3;
    }

    @media (prefers-color-scheme: dark) {
      :root {
        --text-color: rgba(255, 255, 255, 0.9);
        --bg-color: #191919;
        --code-bg: #2f2f2f;
        --border-color: rgba(255, 255, 255, 0.13);
        --link-color: #529cca;
        --table-header-bg: #2f2f2f;
      }
    }

    * { box-sizing: border-box; }

    body {
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
      line-height: 1.6;
      color: var(--text-color);
      background-color: var(--bg-color);
      max-width: 900px;
      margin: 0 auto;
      padding: 2rem;
    }

    h1, h2, h3, h4, h5, h6 { margin-top: 1.5em; margin-bottom: 0.5em; font-weight: 600; line-height: 1.3; }
    h1 { font-size: 2em; }
    h2 { font-size: 1.5em; }
    h3 { font-size: 1.25em; }
    p { margin: 1em 0; }
    a { color: var(--link-color); text-decoration: none; }
    a:hover { text-decoration: underline; }
    img { max-width: 100%; height: auto; border-radius: 4px; }

    code {
      font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace;
      font-size: 0.875em;
      background-color: var(--code-bg);
      padding: 0.2em 0.4em;
      border-radius: 3px;
    }

    pre { background-color: var(--code-bg); padding: 1em; border-radius: 4px; overflow-x: auto; }
    pre code { background: none; padding: 0; }

    blockquote {
      margin: 1em 0;
      padding-left: 1em;
      border-left: 3px solid var(--border-color);
      opacity: 0.8;
    }

    ul, ol { margin: 1em 0; padding-left: 2em; }
    li { margin: 0.25em 0; }
    li.task-item { list-style: none; margin-left: -1.5em; }
    li.task-item input[type="checkbox"] { margin-right: 0.5em; }
    hr { border: none; border-top: 1px solid var(--border-color); margin: 2em 0; }

    table.markdown-table { border-collapse: collapse; width: 100%; margin: 1em 0; }
    table.markdown-table th,
    table.markdown-table td { border: 1px solid var(--border-color); padding: 0.5em 1em; text-align: left; }
    table.markdown-table th { background-color: var(--table-header-bg); font-weight: 600; }
    table.markdown-table tr:nth-child(even) { background-color: var(--code-bg); }
    del { text-decoration: line-through; opacity: 0.7; }

    @media print {
      body { max-width: none; padding: 1cm; }
      a { color: var(--text-color); }
      pre, code { white-space: pre-wrap; word-wrap: break-word; }
    }
"#;

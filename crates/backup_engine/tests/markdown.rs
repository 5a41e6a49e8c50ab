use backup_engine::{markdown_to_html_fragment, to_standalone_html};
use pretty_assertions::assert_eq;

#[test]
fn heading_and_bold_render_once() {
    let html = to_standalone_html("# Title\n\nHello **world**", None);
    assert_eq!(html.matches("<h1>Title</h1>").count(), 1);
    assert_eq!(html.matches("<strong>world</strong>").count(), 1);
    assert!(html.contains("<title>Notion Export</title>"));
    assert!(html.contains("@media print"));
    assert!(html.contains("prefers-color-scheme: dark"));
}

#[test]
fn paragraphs_and_line_breaks() {
    assert_eq!(
        markdown_to_html_fragment("one\ntwo\n\nthree"),
        "<p>one<br />two</p><p>three</p>"
    );
}

#[test]
fn code_is_restored_verbatim() {
    let html = markdown_to_html_fragment("use `a_b_c` and `**x**`");
    assert_eq!(
        html,
        "<p>use <code>a_b_c</code> and <code>**x**</code></p>"
    );
}

#[test]
fn task_items_and_bullets_share_a_list() {
    let html = markdown_to_html_fragment("- [x] done\n- [ ] open\n- plain");
    assert_eq!(
        html,
        concat!(
            "<ul>",
            r#"<li class="task-item"><input type="checkbox" checked disabled> done</li>"#,
            r#"<li class="task-item"><input type="checkbox" disabled> open</li>"#,
            "<li>plain</li>",
            "</ul>"
        )
    );
}

#[test]
fn links_open_in_new_tab_and_strikethrough() {
    let html = markdown_to_html_fragment("[docs](https://example.test) ~~old~~");
    assert_eq!(
        html,
        r#"<p><a href="https://example.test" target="_blank" rel="noopener noreferrer">docs</a> <del>old</del></p>"#
    );
}

#[test]
fn horizontal_rule_is_not_wrapped() {
    assert_eq!(
        markdown_to_html_fragment("above\n\n---\n\nbelow"),
        "<p>above</p><hr /><p>below</p>"
    );
}

#[test]
fn table_cells_keep_their_own_formatting() {
    let html = markdown_to_html_fragment(
        "| A | B |\n|---|---|\n| [x](http://a) | [y](http://b) |\n| snake_case | other_name |\n",
    );
    assert!(!html.contains("<em>"), "{html}");
    assert_eq!(html.matches(r#"target="_blank""#).count(), 2);
    assert!(html.contains(r#"<td><a href="http://a" target="_blank" rel="noopener noreferrer">x</a></td>"#));
    assert!(html.contains("<td>snake_case</td><td>other_name</td>"));
    assert!(html.starts_with(r#"<table class="markdown-table">"#));
    assert!(html.ends_with("</table>"));
}

#[test]
fn table_between_paragraphs_is_not_wrapped() {
    let html = markdown_to_html_fragment("intro _note_\n\n| A |\n|---|\n| *b* |\n\nafter");
    assert_eq!(
        html,
        concat!(
            "<p>intro <em>note</em></p>",
            r#"<table class="markdown-table"><thead><tr><th>A</th></tr></thead>"#,
            "<tbody><tr><td><em>b</em></td></tr></tbody></table>",
            "<p>after</p>"
        )
    );
}

//! Terminal rendering of exploration nodes.

use std::fmt::Write as _;
use std::sync::LazyLock;

use delve_core::ExplorationNode;
use delve_net::LookupOutcome;
use regex::Regex;

static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|ul|ol|section|article|blockquote|tr)>")
        .expect("static regex")
});
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li[^>]*>").expect("static regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Flatten model HTML into readable plain text.
pub fn html_to_text(html: &str) -> String {
    let text = BLOCK_END.replace_all(html, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_RUNS
        .replace_all(lines.join("\n").trim(), "\n\n")
        .into_owned()
}

pub fn render_node(node: &ExplorationNode, image: Option<&LookupOutcome>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", node.id, node.title);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", html_to_text(&node.content));

    if !node.follow_up_questions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Follow-up questions:");
        for (i, q) in node.follow_up_questions.iter().enumerate() {
            let _ = writeln!(out, "  {}. {q}", i + 1);
        }
    }

    let _ = writeln!(out);
    match (&node.image_url, image) {
        (Some(url), _) => {
            let _ = writeln!(out, "Image: {url}");
        }
        (None, Some(outcome)) => {
            let _ = writeln!(out, "Image: (none: {outcome})");
        }
        (None, None) => {
            let _ = writeln!(out, "Image: (none)");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_net::Stage;

    #[test]
    fn test_html_to_text_blocks_and_lists() {
        let html = "<div class='container mx-auto p-4'><h2 class=\"text-xl\">Water cycle</h2>\
                    <p>Water moves &amp; changes state.</p><ul><li>Evaporation</li><li>Condensation</li></ul></div>";
        let text = html_to_text(html);
        assert_eq!(
            text,
            "Water cycle\nWater moves & changes state.\n\n- Evaporation\n\n- Condensation"
        );
    }

    #[test]
    fn test_html_to_text_collapses_blank_runs() {
        let text = html_to_text("<p>a</p><p></p><p></p><p>b</p>");
        assert_eq!(text, "a\n\nb");
    }

    #[test]
    fn test_html_to_text_entities() {
        assert_eq!(html_to_text("1 &lt; 2 &gt; 0 &quot;q&quot; it&#39;s"), "1 < 2 > 0 \"q\" it's");
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    fn node(image_url: Option<&str>) -> ExplorationNode {
        ExplorationNode {
            id: 3,
            title: "magma".into(),
            content: "<p>Molten rock.</p>".into(),
            follow_up_questions: vec!["What is lava?".into(), "How hot is it?".into()],
            image_url: image_url.map(str::to_string),
        }
    }

    #[test]
    fn test_render_node_with_image() {
        let out = render_node(&node(Some("https://img/magma.jpg")), None);
        assert!(out.starts_with("[3] magma\n\nMolten rock.\n"));
        assert!(out.contains("  1. What is lava?\n  2. How hot is it?\n"));
        assert!(out.contains("Image: https://img/magma.jpg"));
    }

    #[test]
    fn test_render_node_reports_lookup_outcome() {
        let outcome = LookupOutcome::TimedOut(Stage::TitleSearch);
        let out = render_node(&node(None), Some(&outcome));
        assert!(out.contains("Image: (none: timed out (title_search))"));
        assert!(render_node(&node(None), None).contains("Image: (none)"));
    }
}

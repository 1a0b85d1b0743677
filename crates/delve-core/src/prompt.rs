use crate::generate::GenerateRequest;

/// Render the single user-turn prompt sent to the language model.
pub fn build_prompt(req: &GenerateRequest) -> String {
    let ctx = &req.context;
    format!(
        "You write content for a node-based exploration tool. Each answer becomes one node \
the user can branch from, so build on what they have already seen.

<previous_nodes_titles>{titles}</previous_nodes_titles>
<previous_node_content>{content}</previous_node_content>
<initial_query>{initial}</initial_query>
<current_query>{query}</current_query>

Respond with a JSON object containing:

1. \"html_content\": HTML that answers the current query. Use headings, paragraphs and lists \
with Tailwind CSS classes. Go simpler if the query is more basic than the previous ones and \
deeper if it is more advanced.
2. \"follow_up_questions\": 3 to 5 questions extending the content, ranging from simple to \
advanced. Zoom out when the exploration is very detailed and zoom in when it is very broad.
3. \"image_queries\": exactly one query likely to match an encyclopedia article title, \
e.g. \"water cycle\" rather than \"water cycle diagram\".

Shape:
{{\"html_content\": \"<div class='container mx-auto p-4'>...</div>\", \
\"follow_up_questions\": [\"...\"], \"image_queries\": [\"...\"]}}

Output only the JSON object, with no other text.",
        titles = ctx.previous_nodes_titles,
        content = ctx.previous_node_content,
        initial = req.initial_query(),
        query = req.query,
    )
}

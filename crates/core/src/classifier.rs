use crate::models::QueryIntent;

const SUMMARY_PREFIXES: [&str; 3] = ["summarize", "overview", "key points"];

pub fn classify_query(query: &str) -> QueryIntent {
    let lowered = query.to_lowercase();
    if SUMMARY_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        QueryIntent::Summary
    } else {
        QueryIntent::Contextual
    }
}

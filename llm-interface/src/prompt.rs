/// Build the user message asking for vocabulary terms related to `query`.
pub fn expansion_prompt(query: &str, vocabulary: &[String]) -> String {
    format!(
        r#"You are a semantic search assistant helping to find related keywords.

I'm searching for: "{query}"

Here are the available keywords in my database:
{keywords}

Please identify keywords from the list that are semantically related to my search query "{query}". Think broadly about the relationship: include direct synonyms, broader or narrower terms, and conceptually related ideas.

For example:
- If I search "space" you might return ["astronomy", "planets", "stars", "NASA"]
- If I search "cooking" you might return ["food", "recipes", "kitchen", "chef"]

Only return keywords that exist in the provided list. Format your response as a JSON array like ["keyword1", "keyword2"]. Include only the array, no explanations."#,
        keywords = vocabulary.join(", "),
    )
}

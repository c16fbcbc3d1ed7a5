use super::{first_segment_head, ThreadRequest};
use crate::config::ThreadRules;

/// Instruction sent to the generative backend for one item.
pub fn build_prompt(req: &ThreadRequest<'_>, rules: &ThreadRules) -> String {
    let first = format!("{}\n\n{}", first_segment_head(req, rules), req.item.link);
    let tags = rules.hashtags.join(" ");
    format!(
        r#"Role: You are an AI-powered tech curator. Your task is to create a Twitter thread from the following content. The thread must be written in {language}.

Read the content, then generate a JSON object with a single key: "twitter_thread".

- "twitter_thread": An array of strings, where each string is a tweet for a Twitter thread.

Rules for Twitter:
- Each tweet must be at most {max_chars} characters, including the thread indicator. Korean, Chinese and Japanese characters count as 2 each, and every link counts as 23.
- The first tweet must be exactly in the format:
{first}
- The last tweet must include the hashtags "{tags}".
- Add a thread indicator like (1/n) to each tweet.

Content to summarize:
{summary}

Return ONLY the JSON object. Do not add ```json markdown."#,
        language = rules.language,
        max_chars = rules.max_chars,
        first = first,
        tags = tags,
        summary = req.summary,
    )
}

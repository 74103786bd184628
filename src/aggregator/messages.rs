use std::collections::HashMap;

use crate::github::types::CommitRecord;

/// Flatten a commit set into the text document handed to the summarizer:
/// one paragraph per PR (`PR #<number>: <title>` header, one bullet per
/// commit message), paragraphs joined by a blank line. PR order follows the
/// first appearance of each PR in the input; an empty input yields an empty
/// string.
///
/// Merge-prefixed messages are skipped again here, so the extractor stays
/// correct even if upstream filtering changes.
pub fn extract_messages(commits: &[CommitRecord]) -> String {
    let mut order: Vec<u64> = Vec::new();
    let mut grouped: HashMap<u64, (String, Vec<String>)> = HashMap::new();

    for commit in commits {
        if commit.message.starts_with("Merge branch") {
            continue;
        }

        let entry = grouped.entry(commit.pr_number).or_insert_with(|| {
            order.push(commit.pr_number);
            (commit.pr_title.clone(), Vec::new())
        });
        entry.1.push(commit.message.clone());
    }

    let paragraphs: Vec<String> = order
        .iter()
        .filter_map(|pr_number| {
            let (title, messages) = grouped.get(pr_number)?;
            let mut lines = vec![format!("PR #{pr_number}: {title}")];
            lines.extend(messages.iter().map(|message| format!("- {message}")));
            Some(lines.join("\n"))
        })
        .collect();

    paragraphs.join("\n\n")
}

use std::collections::HashSet;

use crate::github::types::MergedPullRequest;

/// Merge per-branch PR sets into one, de-duplicating by PR number and keeping
/// the first occurrence. Branch order is therefore significant: sets must be
/// passed in the order the branches were requested.
pub fn combine_pull_requests<I>(branch_sets: I) -> Vec<MergedPullRequest>
where
    I: IntoIterator<Item = Vec<MergedPullRequest>>,
{
    let mut seen = HashSet::new();
    branch_sets
        .into_iter()
        .flatten()
        .filter(|pr| seen.insert(pr.number))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn pr(number: u64, branch: &str) -> MergedPullRequest {
        MergedPullRequest {
            number,
            title: format!("PR {number}"),
            merged_at: Utc::now(),
            branch: branch.to_string(),
        }
    }

    #[test]
    fn duplicates_keep_the_first_branch_seen() {
        let production = vec![pr(101, "production"), pr(102, "production")];
        let staging = vec![pr(102, "staging"), pr(103, "staging")];

        let combined = combine_pull_requests([production, staging]);

        let numbers: Vec<u64> = combined.iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, vec![101, 102, 103]);

        let pr_102 = combined.iter().find(|pr| pr.number == 102).unwrap();
        assert_eq!(pr_102.branch, "production");
    }

    #[test]
    fn combining_a_set_with_itself_is_idempotent() {
        let set = vec![pr(1, "main"), pr(2, "main"), pr(3, "main")];

        let combined = combine_pull_requests([set.clone(), set.clone()]);

        let numbers: Vec<u64> = combined.iter().map(|pr| pr.number).collect();
        let original: Vec<u64> = set.iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, original);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let combined = combine_pull_requests(Vec::<Vec<MergedPullRequest>>::new());
        assert!(combined.is_empty());
    }
}

//! Commit sampling: bound the cost of analyzing a deep history by picking
//! one representative commit per calendar year.

use chrono::Datelike;

use super::analysis::GitCommit;

/// Keeps the first commit seen for each distinct calendar year (UTC), stopping
/// once `max_years` years are collected.
///
/// `history` is expected newest-first; the output preserves input order and is
/// a subset of it. `max_years == 0` yields nothing.
pub fn sample_yearly_commits(history: &[GitCommit], max_years: usize) -> Vec<GitCommit> {
    let mut sampled = Vec::new();
    let mut seen_years: Vec<i32> = Vec::new();

    for commit in history {
        if seen_years.len() >= max_years {
            break;
        }
        let year = commit.created_at.year();
        if !seen_years.contains(&year) {
            seen_years.push(year);
            sampled.push(commit.clone());
        }
    }
    sampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn commit(hash: &str, y: i32, m: u32, d: u32) -> GitCommit {
        GitCommit {
            hash: hash.to_string(),
            message: format!("commit {hash}"),
            created_at: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
        }
    }

    fn hashes(commits: &[GitCommit]) -> Vec<&str> {
        commits.iter().map(|c| c.hash.as_str()).collect()
    }

    #[test]
    fn drops_duplicate_years_and_keeps_order() {
        let history = vec![
            commit("a", 2021, 1, 1),
            commit("b", 2021, 6, 1),
            commit("c", 2020, 12, 1),
            commit("d", 2019, 5, 1),
        ];

        let sampled = sample_yearly_commits(&history, 5);
        assert_eq!(hashes(&sampled), vec!["a", "c", "d"]);
    }

    #[rstest]
    #[case::limit_one(1, vec!["a"])]
    #[case::limit_two(2, vec!["a", "c"])]
    #[case::limit_above_years(10, vec!["a", "c", "d", "e"])]
    #[case::zero(0, vec![])]
    fn stops_at_max_years(#[case] max_years: usize, #[case] expected: Vec<&str>) {
        let history = vec![
            commit("a", 2023, 3, 1),
            commit("b", 2023, 1, 1),
            commit("c", 2022, 7, 1),
            commit("d", 2021, 7, 1),
            commit("e", 2020, 7, 1),
        ];

        let sampled = sample_yearly_commits(&history, max_years);
        assert_eq!(hashes(&sampled), expected);
        assert!(sampled.len() <= max_years);
    }

    #[test]
    fn empty_history_yields_nothing() {
        assert!(sample_yearly_commits(&[], 5).is_empty());
    }

    #[test]
    fn non_monotonic_years_keep_first_occurrence() {
        let history = vec![
            commit("a", 2020, 1, 1),
            commit("b", 2022, 1, 1),
            commit("c", 2020, 6, 1),
        ];

        let sampled = sample_yearly_commits(&history, 5);
        assert_eq!(hashes(&sampled), vec!["a", "b"]);
    }
}

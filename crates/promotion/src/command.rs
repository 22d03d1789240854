//! Parsing of the `/merge` chat command.
//!
//! Format: `/merge[:<branch>] head=<40 hex chars> [@collaborator ...]`.
//!
//! A comment that does not start with `/merge` is not a command at all and
//! parses to `Ok(None)`. A comment that starts with `/merge` but is malformed
//! is an error. Either way no partial request is ever returned.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{BranchName, CommitSha, PromotionRequest, UserLogin};

/// Prefix every command starts with.
pub const COMMAND_PREFIX: &str = "/merge";

/// Target branch when the command carries no qualifier.
pub const DEFAULT_BRANCH: &str = "master";

/// Qualifiers used verbatim; anything else is namespaced under [`CUSTOM_BRANCH_PREFIX`].
pub const WELL_KNOWN_BRANCHES: [&str; 2] = ["master", "beta"];

/// Prefix applied to custom branch qualifiers.
pub const CUSTOM_BRANCH_PREFIX: &str = "branch/";

// The head must be followed by a blank or the end of the comment, so a
// 41-character value is rejected instead of being truncated. The command is a
// single line.
static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/merge(?::([\w.-]+))? head=([a-fA-F0-9]{40})(?:[ \t](.*))?$")
        .expect("command pattern is valid")
});

/// A comment started with `/merge` but is not a valid command.
///
/// The message shows the expected format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "not a valid '/merge' command; format: '/merge:<optional target branch, default: master> \
     head=<pr head commit sha 40 chars> <optional extra collaborators @foo @baz>'"
)]
pub struct CommandError;

/// Parses a comment body into a [`PromotionRequest`].
///
/// Returns `Ok(None)` when the comment is not a command, `Err` when it is a
/// malformed command.
pub fn parse_merge_command(comment: &str) -> Result<Option<PromotionRequest>, CommandError> {
    if !comment.starts_with(COMMAND_PREFIX) {
        tracing::info!("the comment does not start with '{COMMAND_PREFIX}'");
        return Ok(None);
    }

    let captures = COMMAND.captures(comment.trim_end()).ok_or(CommandError)?;

    let target_branch = target_branch(captures.get(1).map(|m| m.as_str())).ok_or(CommandError)?;
    tracing::info!(branch = %target_branch, "got target branch from comment");

    let approved_head = CommitSha::parse(&captures[2]).ok_or(CommandError)?;
    tracing::info!(head = %approved_head, "got PR HEAD SHA from comment");

    let collaborators: Vec<UserLogin> = captures
        .get(3)
        .map(|rest| rest.as_str().split_whitespace().filter_map(collaborator).collect())
        .unwrap_or_default();
    tracing::info!(?collaborators, "got additional collaborators from comment");

    Ok(Some(PromotionRequest {
        target_branch,
        approved_head,
        collaborators,
    }))
}

/// A whole `@login` word; trailing punctuation is dropped.
fn collaborator(word: &str) -> Option<UserLogin> {
    let login = word
        .strip_prefix('@')?
        .trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?'));
    UserLogin::parse(login)
}

fn target_branch(qualifier: Option<&str>) -> Option<BranchName> {
    let qualifier = qualifier.unwrap_or(DEFAULT_BRANCH);
    let name = if WELL_KNOWN_BRANCHES.contains(&qualifier) {
        qualifier.to_string()
    } else {
        format!("{CUSTOM_BRANCH_PREFIX}{qualifier}")
    };
    BranchName::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn logins(request: &PromotionRequest) -> Vec<&str> {
        request.collaborators.iter().map(|c| c.as_str()).collect()
    }

    #[test]
    fn plain_comment_is_not_a_command() {
        assert_eq!(parse_merge_command("LGTM, thanks!"), Ok(None));
        assert_eq!(parse_merge_command(" /merge head=x"), Ok(None));
    }

    #[test]
    fn bare_command_defaults_to_master() {
        let request = parse_merge_command(&format!("/merge head={SHA}"))
            .unwrap()
            .unwrap();
        assert_eq!(request.target_branch.as_str(), "master");
        assert_eq!(request.approved_head.as_str(), SHA);
        assert!(request.collaborators.is_empty());
    }

    #[test]
    fn custom_branch_is_prefixed_and_collaborators_kept_in_order() {
        let request = parse_merge_command(&format!("/merge:custom head={SHA} @alice @bob"))
            .unwrap()
            .unwrap();
        assert_eq!(request.target_branch.as_str(), "branch/custom");
        assert_eq!(logins(&request), vec!["alice", "bob"]);
    }

    #[test]
    fn well_known_branches_are_verbatim() {
        for branch in ["master", "beta"] {
            let request = parse_merge_command(&format!("/merge:{branch} head={SHA}"))
                .unwrap()
                .unwrap();
            assert_eq!(request.target_branch.as_str(), branch);
        }
    }

    #[test]
    fn dotted_qualifier_is_a_custom_branch() {
        let request = parse_merge_command(&format!("/merge:24.08 head={SHA}"))
            .unwrap()
            .unwrap();
        assert_eq!(request.target_branch.as_str(), "branch/24.08");
    }

    #[test]
    fn duplicate_collaborators_are_not_deduplicated() {
        let request = parse_merge_command(&format!("/merge head={SHA} @alice @alice"))
            .unwrap()
            .unwrap();
        assert_eq!(logins(&request), vec!["alice", "alice"]);
    }

    #[test]
    fn text_without_at_sign_is_ignored() {
        let request = parse_merge_command(&format!("/merge head={SHA} thanks @carol!"))
            .unwrap()
            .unwrap();
        assert_eq!(logins(&request), vec!["carol"]);
    }

    #[test]
    fn only_whole_handles_are_collaborators() {
        let long = "a".repeat(40);
        let request = parse_merge_command(&format!(
            "/merge head={SHA} me@example.com @{long} @dave, x@@erin @frank_g"
        ))
        .unwrap()
        .unwrap();
        assert_eq!(logins(&request), vec!["dave"]);
    }

    #[test]
    fn uppercase_sha_is_accepted_and_normalised() {
        let request = parse_merge_command(&format!("/merge head={}", SHA.to_uppercase()))
            .unwrap()
            .unwrap();
        assert_eq!(request.approved_head.as_str(), SHA);
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        assert!(parse_merge_command(&format!("/merge head={SHA}\n"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn malformed_heads_are_rejected() {
        let cases = [
            "/merge".to_string(),
            "/merge head=".to_string(),
            format!("/merge head={}", &SHA[..39]),
            format!("/merge head={SHA}0"),
            format!("/merge head={}", SHA.replace('a', "z")),
            format!("/merge:custom {SHA}"),
            format!("/mergehead={SHA}"),
        ];
        for case in cases {
            assert_eq!(parse_merge_command(&case), Err(CommandError), "{case}");
        }
    }

    #[test]
    fn multi_line_comment_is_rejected() {
        let comment = format!("/merge head={SHA}\n@alice");
        assert_eq!(parse_merge_command(&comment), Err(CommandError));
    }

    proptest! {
        #[test]
        fn anything_without_prefix_is_no_match(body in "[^/].*") {
            prop_assert_eq!(parse_merge_command(&body), Ok(None));
        }

        #[test]
        fn valid_heads_round_trip(head in "[0-9a-f]{40}") {
            let request = parse_merge_command(&format!("/merge head={head}")).unwrap().unwrap();
            prop_assert_eq!(request.approved_head.as_str(), head.as_str());
        }

        #[test]
        fn wrong_length_heads_fail(head in "[0-9a-f]{1,39}|[0-9a-f]{41,60}") {
            prop_assert_eq!(parse_merge_command(&format!("/merge head={head}")), Err(CommandError));
        }
    }
}

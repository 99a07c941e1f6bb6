//! Reviewer attribution.
//!
//! Works out which requested reviewers still owe an approval on each stale
//! merge request and groups the requests by those reviewers.

use crate::error::AppError;
use crate::models::{Approval, MergeRequest};
use crate::services::gitlab_client::MergeRequestSource;
use std::collections::HashMap;

/// Requested reviewers absent from the approval set, in reviewer order.
pub fn pending_reviewers(reviewers: &[String], approval: &Approval) -> Vec<String> {
    let mut pending: Vec<String> = Vec::with_capacity(reviewers.len());
    for reviewer in reviewers {
        if !approval.has_approved(reviewer) && !pending.contains(reviewer) {
            pending.push(reviewer.clone());
        }
    }
    pending
}

/// Merge requests waiting on one reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerBucket {
    pub username: String,
    pub requests: Vec<MergeRequest>,
}

/// Reviewer → merge requests still waiting on them.
///
/// Reviewers are kept in first-seen order and each bucket in processing
/// order, so two builds from the same snapshot are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingReviewSet {
    buckets: Vec<ReviewerBucket>,
}

impl PendingReviewSet {
    /// Fold `(request, approval)` pairs into a finished set.
    ///
    /// Requests without an approval record are skipped entirely.
    pub fn build(pairs: &[(MergeRequest, Option<Approval>)]) -> Self {
        let (buckets, _) = pairs.iter().fold(
            (Vec::<ReviewerBucket>::new(), HashMap::<String, usize>::new()),
            |(mut buckets, mut index), (mr, approval)| {
                let Some(approval) = approval else {
                    return (buckets, index);
                };
                for username in pending_reviewers(&mr.reviewers, approval) {
                    let slot = *index.entry(username.clone()).or_insert_with(|| {
                        buckets.push(ReviewerBucket {
                            username,
                            requests: Vec::new(),
                        });
                        buckets.len() - 1
                    });
                    buckets[slot].requests.push(mr.clone());
                }
                (buckets, index)
            },
        );
        Self { buckets }
    }

    /// Requests waiting on `username`.
    pub fn get(&self, username: &str) -> Option<&[MergeRequest]> {
        self.buckets
            .iter()
            .find(|b| b.username == username)
            .map(|b| b.requests.as_slice())
    }

    pub fn buckets(&self) -> &[ReviewerBucket] {
        &self.buckets
    }

    /// Usernames in first-seen order.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.username.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}

/// Fetch approvals for each stale request and build the pending set.
///
/// Stops at the first failed approval fetch.
pub async fn attribute<S: MergeRequestSource>(
    source: &S,
    stale: &[MergeRequest],
) -> Result<PendingReviewSet, AppError> {
    let mut pairs = Vec::with_capacity(stale.len());

    for mr in stale {
        let approval = source.approvals(mr).await.map_err(|e| {
            log::error!("Failed to fetch approvals for {}: {}", mr.web_url, e);
            e
        })?;
        if approval.is_none() {
            log::debug!("No approval record for {}, skipping", mr.web_url);
        }
        pairs.push((mr.clone(), approval));
    }

    Ok(PendingReviewSet::build(&pairs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mr(iid: i64, reviewers: &[&str]) -> MergeRequest {
        MergeRequest {
            id: 1000 + iid,
            iid,
            project_id: 1,
            title: format!("MR {}", iid),
            web_url: format!("https://gitlab.com/g/p/-/merge_requests/{}", iid),
            author_username: "carol".to_string(),
            created_at: None,
            updated_at: None,
            reviewers: reviewers.iter().map(|r| r.to_string()).collect(),
            draft: false,
        }
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pending_is_set_difference() {
        let approval = Approval::new(1, ["alice"]);
        assert_eq!(
            pending_reviewers(&names(&["alice", "bob"]), &approval),
            names(&["bob"])
        );
    }

    #[test]
    fn test_pending_preserves_reviewer_order() {
        let approval = Approval::new(1, ["bob"]);
        assert_eq!(
            pending_reviewers(&names(&["dave", "bob", "alice", "carol"]), &approval),
            names(&["dave", "alice", "carol"])
        );
    }

    #[test]
    fn test_pending_empty_when_all_approved() {
        let approval = Approval::new(1, ["alice", "bob", "zed"]);
        assert!(pending_reviewers(&names(&["alice", "bob"]), &approval).is_empty());
    }

    #[test]
    fn test_pending_case_sensitive() {
        let approval = Approval::new(1, ["Alice"]);
        assert_eq!(
            pending_reviewers(&names(&["alice"]), &approval),
            names(&["alice"])
        );
    }

    #[test]
    fn test_build_buckets() {
        let a = mr(1, &["alice", "bob"]);
        let pairs = vec![(a.clone(), Some(Approval::new(a.id, ["alice"])))];
        let set = PendingReviewSet::build(&pairs);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("bob").unwrap(), &[a]);
        assert!(set.get("alice").is_none());
    }

    #[test]
    fn test_build_skips_missing_approval() {
        let a = mr(1, &["alice"]);
        let b = mr(2, &["alice"]);
        let pairs = vec![(a, None), (b.clone(), Some(Approval::new(b.id, Vec::<String>::new())))];
        let set = PendingReviewSet::build(&pairs);

        assert_eq!(set.get("alice").unwrap(), &[b]);
    }

    #[test]
    fn test_build_processing_order() {
        let a = mr(1, &["bob"]);
        let b = mr(2, &["alice", "bob"]);
        let c = mr(3, &["bob"]);
        let pairs: Vec<_> = [a.clone(), b.clone(), c.clone()]
            .into_iter()
            .map(|m| {
                let id = m.id;
                (m, Some(Approval::new(id, Vec::<String>::new())))
            })
            .collect();
        let set = PendingReviewSet::build(&pairs);

        let users: Vec<&str> = set.usernames().collect();
        assert_eq!(users, vec!["bob", "alice"]);
        assert_eq!(set.get("bob").unwrap(), &[a, b.clone(), c]);
        assert_eq!(set.get("alice").unwrap(), &[b]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let pairs = vec![
            (mr(1, &["alice", "bob"]), Some(Approval::new(1001, ["bob"]))),
            (mr(2, &["bob", "carol"]), Some(Approval::new(1002, Vec::<String>::new()))),
            (mr(3, &["carol"]), None),
        ];
        assert_eq!(PendingReviewSet::build(&pairs), PendingReviewSet::build(&pairs));
    }

    #[test]
    fn test_duplicate_reviewer_counted_once() {
        let a = mr(1, &["bob", "bob"]);
        let pairs = vec![(a.clone(), Some(Approval::new(a.id, Vec::<String>::new())))];
        let set = PendingReviewSet::build(&pairs);
        assert_eq!(set.get("bob").unwrap().len(), 1);
    }
}

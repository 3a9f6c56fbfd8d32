use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::config::LABEL_PREFIX;
use crate::gitea::{Label, LabelId, PullRequestNumber, Review, ReviewState};
use crate::lgtm::{LgtmError, RepositoryClient};

/// Approval status label that should be attached to a PR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalLabel {
    /// No approvals yet.
    NeedTwo,
    NeedOne,
    Done,
}

impl ApprovalLabel {
    pub fn from_approvals(approvals: usize) -> Self {
        match approvals {
            0 => ApprovalLabel::NeedTwo,
            1 => ApprovalLabel::NeedOne,
            _ => ApprovalLabel::Done,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApprovalLabel::NeedTwo => "lgtm/need 2",
            ApprovalLabel::NeedOne => "lgtm/need 1",
            ApprovalLabel::Done => "lgtm/done",
        }
    }
}

pub fn count_approvals(reviews: &[Review]) -> usize {
    reviews
        .iter()
        .filter(|review| review.state == ReviewState::Approved)
        .count()
}

/// What a reconciliation did to a pull request.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub approvals: usize,
    pub label: ApprovalLabel,
    /// Stale status labels that were detached.
    pub removed: Vec<Label>,
    /// Stale status labels that could not be detached.
    pub failed_removals: Vec<Label>,
    /// Set if the status label had to be attached.
    pub added: Option<LabelId>,
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = |labels: &[Label]| labels.iter().map(|l| &l.name).join(", ");
        write!(
            f,
            "{} approval(s), label `{}` {}",
            self.approvals,
            self.label.name(),
            if self.added.is_some() {
                "added"
            } else {
                "already present"
            }
        )?;
        if !self.removed.is_empty() {
            write!(f, ", removed [{}]", names(&self.removed))?;
        }
        if !self.failed_removals.is_empty() {
            write!(f, ", could not remove [{}]", names(&self.failed_removals))?;
        }
        Ok(())
    }
}

/// Makes sure that the PR carries exactly the status label matching its approval count.
///
/// Stale status labels are removed on a best-effort basis, a failed removal does not prevent
/// the correct label from being attached. The correct label must already exist in the
/// repository, it is never created.
pub async fn reconcile_approval_label<Client: RepositoryClient + ?Sized>(
    client: &Client,
    pr: PullRequestNumber,
) -> Result<ReconcileOutcome, LgtmError> {
    let pull_request = client
        .get_pull_request(pr)
        .await
        .map_err(LgtmError::Fetch)?;
    let reviews = client.get_reviews(pr).await.map_err(LgtmError::Fetch)?;

    let approvals = count_approvals(&reviews);
    let label = ApprovalLabel::from_approvals(approvals);
    tracing::debug!("PR has {approvals} approval(s), expected label `{}`", label.name());

    let (present, stale): (Vec<Label>, Vec<Label>) = pull_request
        .labels
        .into_iter()
        .filter(|l| l.name.starts_with(LABEL_PREFIX))
        .partition(|l| l.name == label.name());

    let mut outcome = ReconcileOutcome {
        approvals,
        label,
        removed: vec![],
        failed_removals: vec![],
        added: None,
    };

    if !stale.is_empty() {
        tracing::info!(
            "Removing stale label(s) {}",
            stale.iter().map(|l| &l.name).join(", ")
        );
        // Gitea only allows removing labels one by one, so we remove all of them in parallel.
        let results =
            futures::future::join_all(stale.iter().map(|l| client.remove_label(pr, l.id))).await;
        for (stale_label, result) in stale.into_iter().zip(results) {
            match result {
                Ok(()) => outcome.removed.push(stale_label),
                Err(error) => {
                    tracing::warn!("Cannot remove stale label `{}`: {error:?}", stale_label.name);
                    outcome.failed_removals.push(stale_label);
                }
            }
        }
    }

    if !present.is_empty() {
        tracing::info!("Label `{}` is already present", label.name());
        return Ok(outcome);
    }

    let repository_labels = client.get_labels().await.map_err(LgtmError::Fetch)?;
    let Some(label_id) = repository_labels
        .iter()
        .find(|l| l.name == label.name())
        .map(|l| l.id)
    else {
        return Err(LgtmError::LabelNotFound {
            label: label.name().to_string(),
            repository: client.repository().clone(),
        });
    };

    tracing::info!("Adding label `{}`", label.name());
    client
        .add_labels(pr, &[label_id])
        .await
        .map_err(|error| LgtmError::LabelApply {
            label: label.name().to_string(),
            error,
        })?;
    outcome.added = Some(label_id);
    Ok(outcome)
}

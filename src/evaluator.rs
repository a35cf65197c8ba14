use tracing::debug;

use crate::config::{Site, Target};
use crate::models::{AssertionError, AssertionKind, EvaluationOutcome, Expected, ProbeOutcome, ProbeResult};
use crate::probe::Probe;

pub async fn evaluate<P: Probe>(prober: &P, site: &Site, target: &Target) -> EvaluationOutcome {
    let outcome = prober.probe(&target.url).await;
    if let ProbeOutcome::Failed { error, partial } = &outcome {
        debug!(
            url = %target.url,
            status = ?partial.as_ref().and_then(|p| p.status),
            "probe failed, using best-effort result: {}",
            error
        );
    }
    assess(site, target, &outcome.into_best_effort())
}

/// Check one probe result against the target's assertions. Both checks run
/// independently and may both fail.
pub fn assess(site: &Site, target: &Target, response: &ProbeResult) -> EvaluationOutcome {
    let mut errors = Vec::new();

    if let Some(expected) = target.expected_status() {
        if response.status != Some(expected) {
            errors.push(AssertionError {
                url: target.url.clone(),
                kind: AssertionKind::InvalidStatusCode,
                failed_assertion: Expected::Status(expected),
            });
        }
    }

    if let Some(needle) = target.expected_text() {
        let body = String::from_utf8_lossy(&response.body);
        if body.find(needle).is_none() {
            errors.push(AssertionError {
                url: target.url.clone(),
                kind: AssertionKind::DidNotSee,
                failed_assertion: Expected::Text(needle.to_string()),
            });
        }
    }

    EvaluationOutcome {
        title: site.title.clone(),
        target_title: target.title.clone(),
        url: target.url.clone(),
        pass: errors.is_empty(),
        errors,
    }
}

//! IMAGE-TAG-PINNED: images pinned to exact tags or digests, never `:latest`.
//!
//! Services built from a local context (no `image`) have nothing to pin
//! and are skipped.

use crate::validator::model::Service;
use crate::validator::rules::{outcome, RuleContext, RuleDef, Scope};
use crate::validator::types::{Finding, RuleId, Severity};

const DESCRIPTION: &str = "Images must be pinned to an exact version tag or digest.";

pub fn def() -> RuleDef {
    RuleDef {
        id: RuleId::ImageTagPinned,
        description: DESCRIPTION,
        severity: Severity::Warning,
        scope: Scope::Service,
        allows_exception: false,
        check,
    }
}

fn check(ctx: &RuleContext, service: Option<&Service>) -> Vec<Finding> {
    let Some(service) = service else {
        return Vec::new();
    };
    let Some(image) = &service.image else {
        return Vec::new();
    };

    let compliant = is_pinned(image);
    let fail_msg = format!(
        "service `{}` image `{}` is not pinned to an exact version tag",
        service.name, image
    );

    vec![outcome(
        ctx,
        &def(),
        service,
        compliant,
        "image is pinned to an exact tag",
        fail_msg,
    )]
}

/// Pinned means a digest, or an explicit tag other than `latest`.
///
/// The tag separator is the `:` after the last `/`, so registries with a
/// port (`registry.local:5000/app`) are not mistaken for tags.
fn is_pinned(image: &str) -> bool {
    if image.contains('@') {
        return true;
    }
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    match last_segment.split_once(':') {
        Some((_, tag)) => !tag.is_empty() && tag != "latest",
        None => false,
    }
}

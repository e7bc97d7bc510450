//! Access-point reconciliation and lookup.
//!
//! The stored set for a reference is only ever replaced wholesale. The
//! lookups resolve the public URLs of a tenant's surfaces from that set:
//! the first overriding entry wins, otherwise the first entry.

use keel_core::KeelResult;
use keel_core::models::access_point::{AccessPoint, AccessPointTarget, NewAccessPoint};
use keel_core::models::reference::Reference;
use keel_core::repository::AccessPointRepository;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A host the gateway is allowed to serve for an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedDomain {
    pub domain: String,
    pub secured: bool,
}

/// Replace the access points of `reference` with `desired`.
pub async fn replace<R: AccessPointRepository>(
    repo: &R,
    reference: &Reference,
    desired: Vec<NewAccessPoint>,
) -> KeelResult<Vec<AccessPoint>> {
    let count = desired.len();
    let stored = repo.replace(reference, desired).await?;
    debug!(%reference, count, "access points replaced");
    Ok(stored)
}

/// The organization or environment a host is registered for.
pub async fn reference_context_by_host<R: AccessPointRepository>(
    repo: &R,
    host: &str,
) -> KeelResult<Option<Reference>> {
    Ok(repo.find_by_host(host).await?.map(|ap| ap.reference))
}

pub async fn console_url<R: AccessPointRepository>(
    repo: &R,
    organization_id: &str,
) -> KeelResult<Option<String>> {
    target_url(repo, &Reference::organization(organization_id), AccessPointTarget::Console).await
}

pub async fn console_urls<R: AccessPointRepository>(
    repo: &R,
    organization_id: &str,
    include_default: bool,
) -> KeelResult<Vec<String>> {
    let aps = repo
        .find_by_reference_and_target(
            &Reference::organization(organization_id),
            AccessPointTarget::Console,
        )
        .await?;
    Ok(select_urls(&aps, include_default))
}

pub async fn console_api_url<R: AccessPointRepository>(
    repo: &R,
    organization_id: &str,
) -> KeelResult<Option<String>> {
    target_url(
        repo,
        &Reference::organization(organization_id),
        AccessPointTarget::ConsoleApi,
    )
    .await
}

pub async fn portal_url<R: AccessPointRepository>(
    repo: &R,
    environment_id: &str,
) -> KeelResult<Option<String>> {
    target_url(repo, &Reference::environment(environment_id), AccessPointTarget::Portal).await
}

pub async fn portal_urls<R: AccessPointRepository>(
    repo: &R,
    environment_id: &str,
    include_default: bool,
) -> KeelResult<Vec<String>> {
    let aps = repo
        .find_by_reference_and_target(
            &Reference::environment(environment_id),
            AccessPointTarget::Portal,
        )
        .await?;
    Ok(select_urls(&aps, include_default))
}

pub async fn portal_api_url<R: AccessPointRepository>(
    repo: &R,
    environment_id: &str,
) -> KeelResult<Option<String>> {
    target_url(
        repo,
        &Reference::environment(environment_id),
        AccessPointTarget::PortalApi,
    )
    .await
}

pub async fn gateway_restricted_domains<R: AccessPointRepository>(
    repo: &R,
    environment_id: &str,
) -> KeelResult<Vec<RestrictedDomain>> {
    let aps = repo
        .find_by_reference_and_target(
            &Reference::environment(environment_id),
            AccessPointTarget::Gateway,
        )
        .await?;
    Ok(restricted_domains(&aps))
}

async fn target_url<R: AccessPointRepository>(
    repo: &R,
    reference: &Reference,
    target: AccessPointTarget,
) -> KeelResult<Option<String>> {
    let aps = repo.find_by_reference_and_target(reference, target).await?;
    Ok(select_url(&aps))
}

/// First overriding entry, else the first entry.
pub fn select_url(access_points: &[AccessPoint]) -> Option<String> {
    access_points
        .iter()
        .find(|ap| ap.overriding)
        .or_else(|| access_points.first())
        .map(AccessPoint::url)
}

/// Every URL, or only the overriding ones when `include_default` is false.
pub fn select_urls(access_points: &[AccessPoint], include_default: bool) -> Vec<String> {
    access_points
        .iter()
        .filter(|ap| include_default || ap.overriding)
        .map(AccessPoint::url)
        .collect()
}

/// Overriding hosts replace the defaults entirely when there are any.
pub fn restricted_domains(access_points: &[AccessPoint]) -> Vec<RestrictedDomain> {
    let any_overriding = access_points.iter().any(|ap| ap.overriding);
    access_points
        .iter()
        .filter(|ap| !any_overriding || ap.overriding)
        .map(|ap| RestrictedDomain {
            domain: ap.host.clone(),
            secured: ap.secured,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ap(host: &str, secured: bool, overriding: bool) -> AccessPoint {
        AccessPoint {
            id: host.into(),
            reference: Reference::environment("env"),
            target: AccessPointTarget::Portal,
            host: host.into(),
            secured,
            overriding,
        }
    }

    #[test]
    fn url_prefers_overriding_entry() {
        let aps = vec![ap("default.io", false, false), ap("custom.io", true, true)];
        assert_eq!(select_url(&aps).as_deref(), Some("https://custom.io"));
    }

    #[test]
    fn url_falls_back_to_first_entry() {
        let aps = vec![ap("first.io", false, false), ap("second.io", true, false)];
        assert_eq!(select_url(&aps).as_deref(), Some("http://first.io"));
        assert_eq!(select_url(&[]), None);
    }

    #[test]
    fn urls_without_default_keep_only_overriding() {
        let aps = vec![ap("default.io", false, false), ap("custom.io", true, true)];
        assert_eq!(
            select_urls(&aps, true),
            vec!["http://default.io".to_string(), "https://custom.io".to_string()]
        );
        assert_eq!(select_urls(&aps, false), vec!["https://custom.io".to_string()]);
    }

    #[test]
    fn restricted_domains_use_overriding_hosts_when_present() {
        let aps = vec![ap("gw.default.io", false, false), ap("gw.custom.io", true, true)];
        assert_eq!(
            restricted_domains(&aps),
            vec![RestrictedDomain {
                domain: "gw.custom.io".into(),
                secured: true
            }]
        );

        let defaults = vec![ap("a.io", false, false), ap("b.io", true, false)];
        assert_eq!(restricted_domains(&defaults).len(), 2);
    }
}

use tracing::{debug, info};

use super::CompanySyncService;
use crate::delta::{DeltaAt, ensure_fresh};
use crate::error::Result;
use crate::etag;
use crate::model::{CompanyRecord, LinkType, ProfileDelta, Updated, company_uri};
use crate::store::WriteOutcome;

/// Delta-type tag for full profile deltas.
pub const COMPANY_DELTA: &str = "company_delta";

/// Builds the record a full-profile delta produces.
///
/// The caller must already have checked `delta_at` against `existing`.
pub fn merge_profile(
    company_number: &str,
    existing: Option<&CompanyRecord>,
    delta: &ProfileDelta,
    delta_at: DeltaAt,
    context_id: &str,
) -> CompanyRecord {
    let mut profile = delta.data.clone();
    profile.company_number = Some(company_number.to_string());

    // uk-establishments is owned by the coordinator, never by the payload.
    profile.links.unset(LinkType::UkEstablishments);
    if let Some(existing) = existing {
        profile.links.carry_over_from(&existing.profile.links);
    }

    profile.links.self_link = Some(company_uri(company_number));
    match delta.parent() {
        Some(parent) => profile
            .links
            .set(LinkType::Overseas, LinkType::Overseas.canonical_uri(parent)),
        None => {
            profile.links.unset(LinkType::Overseas);
        }
    }

    if let Some(address) = profile.registered_office_address.as_mut() {
        address.normalise_care_of();
    }
    profile.etag = Some(etag::generate(&profile));

    CompanyRecord {
        id: company_number.to_string(),
        profile,
        delta_at: Some(delta_at),
        parent_company_number: delta.parent().map(str::to_string),
        has_mortgages: delta.has_mortgages,
        updated: Some(Updated::now(context_id, COMPANY_DELTA)),
        version: Some(existing.map_or(0, CompanyRecord::next_version)),
    }
}

impl CompanySyncService {
    /// Applies a full-profile delta.
    ///
    /// Subordinate deltas (those naming a parent) first make sure the parent
    /// exists and carries the "uk-establishments" link. When the delta moves
    /// the company away from a previous parent, that parent's link is
    /// re-evaluated after the write. Changed notifications for the parents and
    /// for the company itself go out after the write, so a notifier outage
    /// surfaces as an error without blocking the merge.
    pub async fn put_profile(
        &self,
        company_number: &str,
        delta: ProfileDelta,
        context_id: &str,
    ) -> Result<CompanyRecord> {
        let delta_at = delta.validate_for(company_number)?;

        // Stale deltas must not touch the parent either.
        if let Some(existing) = self.load(company_number).await? {
            self.reject_stale(company_number, delta_at, &existing)?;
        }

        let attached = match delta.parent() {
            Some(parent) => self.attach_to_parent(parent, context_id).await?,
            None => false,
        };

        let written = self
            .write_merged(company_number, &delta, delta_at, context_id)
            .await;

        // Notification failures never stop a committed write. Every side
        // effect runs and the first failure is reported once all are done.
        let mut side_effects: Result<()> = Ok(());
        if let (true, Some(parent)) = (attached, delta.parent()) {
            side_effects = self.notify_changed(context_id, parent).await;
        }
        let (previous, merged) = written?;

        let previous_parent = previous
            .as_ref()
            .and_then(|record| record.parent_company_number.as_deref());
        if let Some(previous_parent) = previous_parent {
            if Some(previous_parent) != delta.parent() {
                let released = self
                    .release_parent(company_number, previous_parent, context_id)
                    .await;
                side_effects = side_effects.and(released);
            }
        }

        let notified = self.notify_changed(context_id, company_number).await;
        side_effects.and(notified)?;
        Ok(merged)
    }

    /// Merge loop. Returns the record the winning write replaced, if any,
    /// alongside the record now stored.
    async fn write_merged(
        &self,
        company_number: &str,
        delta: &ProfileDelta,
        delta_at: DeltaAt,
        context_id: &str,
    ) -> Result<(Option<CompanyRecord>, CompanyRecord)> {
        let mut attempt = 1usize;
        loop {
            let existing = self.load(company_number).await?;
            if let Some(existing) = &existing {
                self.reject_stale(company_number, delta_at, existing)?;
            }

            let merged = merge_profile(company_number, existing.as_ref(), delta, delta_at, context_id);
            let outcome = match &existing {
                None => {
                    self.bounded("insert", company_number, self.store.insert(merged.clone()))
                        .await?
                }
                Some(existing) => {
                    self.bounded(
                        "compare_and_swap",
                        company_number,
                        self.store
                            .compare_and_swap(merged.clone(), existing.current_version()),
                    )
                    .await?
                }
            };

            if let WriteOutcome::Written(version) = outcome {
                debug!(
                    company_number,
                    version,
                    created = existing.is_none(),
                    "profile delta merged"
                );
                return Ok((existing, merged));
            }

            if !self.should_retry("put_profile", company_number, attempt) {
                return Err(self.retries_exhausted("put_profile", company_number));
            }
            attempt += 1;
        }
    }

    fn reject_stale(
        &self,
        company_number: &str,
        delta_at: DeltaAt,
        existing: &CompanyRecord,
    ) -> Result<()> {
        ensure_fresh(company_number, delta_at, existing.delta_at).inspect_err(|_| {
            info!(
                company_number,
                delta_at = %delta_at,
                stored_delta_at = ?existing.delta_at.map(|at| at.to_wire()),
                "rejected stale delta"
            );
        })
    }
}

//! Cloudflare reconciler
//!
//! [`CloudflareProvider`] implements [`DnsProvider`] on top of a
//! [`CloudflareApi`] client.
//!
//! ## Reads
//!
//! `zones()` and `records()` fail on the first listing error. An
//! incomplete snapshot is never handed to the planner.
//!
//! ## Writes
//!
//! `apply_changes()` routes every change to the zone that owns its
//! hostname and processes zones concurrently (bounded by
//! `zone_concurrency`). Within one zone:
//!
//! 1. The zone's records are listed once, before any write, if the batch
//!    contains updates or deletes
//! 2. Creates are sent
//! 3. Updates are sent under the id of the existing record; a missing
//!    record is created instead
//! 4. Deletes are sent; a record that is already gone is skipped
//!
//! Every failed write is collected. The call returns an [`ApplyError`]
//! listing all of them once every zone has been processed.

use async_trait::async_trait;
use extdns_core::{
    ApplyError, ChangeAction, Changes, DnsProvider, DomainFilter, Endpoint, Error,
    ProviderConfig, Result, WriteFailure, Zone, suitable_zone,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::changes::{find_record_id, new_changes};
use crate::client::{CloudflareApi, HttpCloudflareClient};
use crate::mapper;
use crate::types::{DnsRecord, RecordFilter};

/// Default number of zones written concurrently
pub const DEFAULT_ZONE_CONCURRENCY: usize = 4;

/// Behaviour switches of a [`CloudflareProvider`]
#[derive(Debug, Clone)]
pub struct CloudflareOptions {
    /// Only zones and hostnames under this suffix are touched
    pub domain_filter: DomainFilter,
    /// Route created and updated records through the Cloudflare edge
    pub proxied: bool,
    /// Log intended writes instead of sending them
    pub dry_run: bool,
    /// Maximum number of zones written concurrently
    pub zone_concurrency: usize,
}

impl Default for CloudflareOptions {
    fn default() -> Self {
        Self {
            domain_filter: DomainFilter::any(),
            proxied: false,
            dry_run: false,
            zone_concurrency: DEFAULT_ZONE_CONCURRENCY,
        }
    }
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all listing requests
/// - Log every intended create, update and delete
/// - **NOT** send any write to Cloudflare
pub struct CloudflareProvider {
    client: Arc<dyn CloudflareApi>,

    /// Account (or token) id resolved at construction
    account_id: String,

    options: CloudflareOptions,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("account_id", &self.account_id)
            .field("domain_filter", &self.options.domain_filter)
            .field("proxied", &self.options.proxied)
            .field("dry_run", &self.options.dry_run)
            .field("zone_concurrency", &self.options.zone_concurrency)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider, resolving the account behind the client's credentials
    ///
    /// # Errors
    ///
    /// - `Error::Authentication` if the account identity cannot be resolved
    /// - `Error::Config` if `zone_concurrency` is zero
    pub async fn connect(client: Arc<dyn CloudflareApi>, options: CloudflareOptions) -> Result<Self> {
        if options.zone_concurrency == 0 {
            return Err(Error::config("Cloudflare zone concurrency must be > 0"));
        }

        let account_id = client
            .account_identity()
            .await
            .map_err(|e| Error::auth(format!("could not resolve Cloudflare account: {e}")))?;

        info!(
            account_id = %account_id,
            domain_filter = %options.domain_filter,
            proxied = options.proxied,
            "Connected to Cloudflare"
        );
        if options.dry_run {
            warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            client,
            account_id,
            options,
        })
    }

    /// Create a provider talking HTTPS to the Cloudflare API
    pub async fn from_config(config: &ProviderConfig) -> Result<Self> {
        let ProviderConfig::Cloudflare {
            auth,
            domain_filter,
            proxied,
            dry_run,
            zone_concurrency,
        } = config
        else {
            return Err(Error::config("Invalid config for Cloudflare provider"));
        };
        config.validate()?;

        let client = HttpCloudflareClient::new(auth.clone())?;
        let options = CloudflareOptions {
            domain_filter: domain_filter.clone(),
            proxied: *proxied,
            dry_run: *dry_run,
            zone_concurrency: *zone_concurrency,
        };

        Self::connect(Arc::new(client), options).await
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn options(&self) -> &CloudflareOptions {
        &self.options
    }

    /// Drop every change whose hostname is outside the domain filter
    ///
    /// Update pairs are kept or dropped together.
    fn filter_changes(&self, changes: &Changes) -> Changes {
        let in_scope = |endpoint: &Endpoint| {
            let matches = self.options.domain_filter.matches(&endpoint.dns_name);
            if !matches {
                debug!(
                    record = %endpoint.dns_name,
                    domain_filter = %self.options.domain_filter,
                    "Skipping endpoint outside domain filter"
                );
            }
            matches
        };

        let mut filtered = Changes::new();
        filtered.create = changes.create.iter().filter(|e| in_scope(*e)).cloned().collect();
        filtered.delete = changes.delete.iter().filter(|e| in_scope(*e)).cloned().collect();
        for (old, new) in changes.updates() {
            if in_scope(new) {
                filtered.update_old.push(old.clone());
                filtered.update_new.push(new.clone());
            }
        }
        filtered
    }

    /// Group changes into one batch per owning zone
    fn route(&self, changes: &Changes, zones: &[Zone], report: &mut ApplyReport) -> Vec<ZoneBatch> {
        let proxied = self.options.proxied;
        let mut batches: Vec<ZoneBatch> = zones.iter().cloned().map(ZoneBatch::new).collect();

        for change in new_changes(ChangeAction::Create, &changes.create, proxied) {
            match zone_index(zones, &change.record.name) {
                Some(i) => batches[i].creates.push(change.record),
                None => report.drop_unroutable(change.action, &change.record),
            }
        }

        let olds = new_changes(ChangeAction::UpdateOld, &changes.update_old, proxied);
        let news = new_changes(ChangeAction::UpdateNew, &changes.update_new, proxied);
        for (old, new) in olds.into_iter().zip(news) {
            match zone_index(zones, &new.record.name) {
                Some(i) => batches[i].updates.push((old.record, new.record)),
                None => report.drop_unroutable(new.action, &new.record),
            }
        }

        for change in new_changes(ChangeAction::Delete, &changes.delete, proxied) {
            match zone_index(zones, &change.record.name) {
                Some(i) => batches[i].deletes.push(change.record),
                None => report.drop_unroutable(change.action, &change.record),
            }
        }

        batches.retain(|batch| !batch.is_empty());
        batches
    }

    async fn apply_zone(&self, batch: ZoneBatch) -> ApplyReport {
        let mut report = ApplyReport::default();
        let zone = &batch.zone;

        debug!(
            zone = %zone.name,
            creates = batch.creates.len(),
            updates = batch.updates.len(),
            deletes = batch.deletes.len(),
            "Applying zone batch"
        );

        let existing = if batch.needs_snapshot() {
            self.client
                .list_records(&zone.id, &RecordFilter::default())
                .await
                .map_err(|e| {
                    warn!(
                        zone = %zone.name,
                        error = %e,
                        "Failed to list zone records, skipping its updates and deletes"
                    );
                    e
                })
        } else {
            Ok(Vec::new())
        };

        for record in &batch.creates {
            self.create(zone, record, &mut report).await;
        }

        match &existing {
            Ok(existing) => {
                for (old, new) in &batch.updates {
                    self.update(zone, existing, old, new, &mut report).await;
                }
                for record in &batch.deletes {
                    self.delete(zone, existing, record, &mut report).await;
                }
            }
            Err(e) => {
                let message = format!("listing zone records failed: {e}");
                for (_, new) in &batch.updates {
                    report.fail(zone, ChangeAction::UpdateNew, new, message.clone());
                }
                for record in &batch.deletes {
                    report.fail(zone, ChangeAction::Delete, record, message.clone());
                }
            }
        }

        report
    }

    async fn create(&self, zone: &Zone, record: &DnsRecord, report: &mut ApplyReport) {
        info!(
            zone = %zone.name,
            record = %record.name,
            record_type = %record.record_type,
            content = %record.content,
            action = "create",
            "Creating DNS record"
        );

        if self.options.dry_run {
            info!(
                "[DRY-RUN] Would send POST /zones/{}/dns_records with payload: {}",
                zone.id,
                serde_json::to_string(record).unwrap_or_default()
            );
            report.created += 1;
            return;
        }

        match self.client.create_record(&zone.id, record).await {
            Ok(created) => {
                debug!(id = created.id.as_deref().unwrap_or_default(), "DNS record created");
                report.created += 1;
            }
            Err(e) => report.fail(zone, ChangeAction::Create, record, e.to_string()),
        }
    }

    async fn update(
        &self,
        zone: &Zone,
        existing: &[DnsRecord],
        old: &DnsRecord,
        new: &DnsRecord,
        report: &mut ApplyReport,
    ) {
        let Some(record_id) = find_record_id(existing, old) else {
            info!(
                zone = %zone.name,
                record = %new.name,
                record_type = %new.record_type,
                "Record to update does not exist, creating it"
            );
            report.fallback_creates += 1;
            self.create(zone, new, report).await;
            return;
        };

        info!(
            zone = %zone.name,
            record = %new.name,
            record_type = %new.record_type,
            content = %new.content,
            previous = %old.content,
            action = "update",
            "Updating DNS record"
        );

        if self.options.dry_run {
            info!(
                "[DRY-RUN] Would send PUT /zones/{}/dns_records/{} with payload: {}",
                zone.id,
                record_id,
                serde_json::to_string(new).unwrap_or_default()
            );
            report.updated += 1;
            return;
        }

        match self.client.update_record(&zone.id, &record_id, new).await {
            Ok(()) => report.updated += 1,
            Err(e) => report.fail(zone, ChangeAction::UpdateNew, new, e.to_string()),
        }
    }

    async fn delete(&self, zone: &Zone, existing: &[DnsRecord], record: &DnsRecord, report: &mut ApplyReport) {
        let Some(record_id) = find_record_id(existing, record) else {
            debug!(
                zone = %zone.name,
                record = %record.name,
                record_type = %record.record_type,
                "Record to delete is already absent"
            );
            report.skipped_deletes += 1;
            return;
        };

        info!(
            zone = %zone.name,
            record = %record.name,
            record_type = %record.record_type,
            action = "delete",
            "Deleting DNS record"
        );

        if self.options.dry_run {
            info!(
                "[DRY-RUN] Would send DELETE /zones/{}/dns_records/{}",
                zone.id, record_id
            );
            report.deleted += 1;
            return;
        }

        match self.client.delete_record(&zone.id, &record_id).await {
            Ok(()) => report.deleted += 1,
            Err(e) => report.fail(zone, ChangeAction::Delete, record, e.to_string()),
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn zones(&self) -> Result<Vec<Zone>> {
        let zones = self
            .client
            .list_zones(&[])
            .await
            .map_err(|e| Error::remote_list(format!("listing zones: {e}")))?;

        let total = zones.len();
        let zones: Vec<Zone> = zones
            .into_iter()
            .filter(|zone| self.options.domain_filter.matches(&zone.name))
            .collect();

        debug!(total, in_scope = zones.len(), "Listed zones");
        Ok(zones)
    }

    async fn records(&self) -> Result<Vec<Endpoint>> {
        let zones = self.zones().await?;
        let mut endpoints = Vec::new();

        for zone in &zones {
            let records = self
                .client
                .list_records(&zone.id, &RecordFilter::default())
                .await
                .map_err(|e| {
                    Error::remote_list(format!("listing records of zone {}: {e}", zone.name))
                })?;

            let before = endpoints.len();
            endpoints.extend(records.iter().filter_map(mapper::to_endpoint));
            debug!(
                zone = %zone.name,
                listed = records.len(),
                managed = endpoints.len() - before,
                "Listed zone records"
            );
        }

        Ok(endpoints)
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<()> {
        changes.validate()?;
        if changes.is_empty() {
            debug!("No changes to apply");
            return Ok(());
        }

        let changes = self.filter_changes(changes);
        if changes.is_empty() {
            debug!("All changes are outside the domain filter");
            return Ok(());
        }

        let zones = self.zones().await?;
        let mut report = ApplyReport::default();
        let batches = self.route(&changes, &zones, &mut report);

        let zone_reports: Vec<ApplyReport> = stream::iter(batches)
            .map(|batch| self.apply_zone(batch))
            .buffered(self.options.zone_concurrency)
            .collect()
            .await;
        for zone_report in zone_reports {
            report.merge(zone_report);
        }

        info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            skipped_deletes = report.skipped_deletes,
            fallback_creates = report.fallback_creates,
            unroutable = report.unroutable,
            failed = report.failures.len(),
            dry_run = self.options.dry_run,
            "Applied changes"
        );

        if report.failures.is_empty() {
            Ok(())
        } else {
            Err(ApplyError::new(report.failures).into())
        }
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Position of the zone owning `hostname`
fn zone_index(zones: &[Zone], hostname: &str) -> Option<usize> {
    let zone = suitable_zone(hostname, zones)?;
    zones.iter().position(|candidate| candidate.id == zone.id)
}

/// Writes routed to one zone
struct ZoneBatch {
    zone: Zone,
    creates: Vec<DnsRecord>,
    /// (old, new) pairs
    updates: Vec<(DnsRecord, DnsRecord)>,
    deletes: Vec<DnsRecord>,
}

impl ZoneBatch {
    fn new(zone: Zone) -> Self {
        Self {
            zone,
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Updates and deletes need the ids of existing records
    fn needs_snapshot(&self) -> bool {
        !self.updates.is_empty() || !self.deletes.is_empty()
    }
}

/// Outcome counters of one `apply_changes` call
#[derive(Debug, Default)]
struct ApplyReport {
    created: usize,
    updated: usize,
    deleted: usize,
    skipped_deletes: usize,
    fallback_creates: usize,
    unroutable: usize,
    failures: Vec<WriteFailure>,
}

impl ApplyReport {
    fn merge(&mut self, other: ApplyReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped_deletes += other.skipped_deletes;
        self.fallback_creates += other.fallback_creates;
        self.unroutable += other.unroutable;
        self.failures.extend(other.failures);
    }

    fn drop_unroutable(&mut self, action: ChangeAction, record: &DnsRecord) {
        let err = Error::zone_routing(record.name.clone());
        warn!(
            %action,
            record_type = %record.record_type,
            "{err}, dropping change"
        );
        self.unroutable += 1;
    }

    fn fail(&mut self, zone: &Zone, action: ChangeAction, record: &DnsRecord, message: String) {
        warn!(
            zone = %zone.name,
            %action,
            record = %record.name,
            record_type = %record.record_type,
            error = %message,
            "DNS record write failed"
        );
        self.failures.push(WriteFailure {
            zone: zone.name.clone(),
            action,
            record: record.name.clone(),
            record_type: record.record_type.clone(),
            message,
        });
    }
}

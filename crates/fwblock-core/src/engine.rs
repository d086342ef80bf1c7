// ── Reconciliation engine ──
//
// Drives a batch of addresses to a terminal outcome in rounds. Each round
// partitions the remaining work by address-book type, lists the managed
// groups for that partition and either places (block) or removes
// (unblock) addresses. Gateway failures become per-address outcomes; only
// bad input fails the whole run.

use std::collections::HashMap;

use strum::Display;
use tracing::{debug, info, warn};

use crate::allocator::GroupAllocator;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::gateway::FirewallGateway;
use crate::matcher::{equivalent, group_type_of, parse_address_list};
use crate::model::{AddressGroup, Direction, GroupType};
use crate::report::{
    BatchReport, FailureReason, GroupRef, Outcome, OutcomeRecord, ResultAggregator,
};

/// Partitions processed each round, in order.
const PARTITIONS: [GroupType; 2] = [GroupType::Ip, GroupType::Domain];

/// What a batch does to its addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BatchMode {
    Block,
    Unblock,
}

impl BatchMode {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Block => "blocked",
            Self::Unblock => "unblocked",
        }
    }

    /// Reason recorded for addresses left when the stagnation guard fires.
    fn stalled_reason(self) -> FailureReason {
        match self {
            Self::Block => FailureReason::Stagnation,
            Self::Unblock => FailureReason::NotFound,
        }
    }
}

// ── Work set ─────────────────────────────────────────────────────────

/// Owned, indexed set of addresses still awaiting an outcome.
struct WorkSet {
    addresses: Vec<String>,
    open: Vec<bool>,
    index: HashMap<String, usize>,
    remaining: usize,
}

impl WorkSet {
    fn new(addresses: Vec<String>) -> Self {
        let index = addresses
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i))
            .collect();
        let remaining = addresses.len();
        Self {
            open: vec![true; remaining],
            addresses,
            index,
            remaining,
        }
    }

    fn len(&self) -> usize {
        self.remaining
    }

    fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    fn pending(&self) -> impl Iterator<Item = &String> {
        self.addresses
            .iter()
            .zip(&self.open)
            .filter_map(|(addr, open)| open.then_some(addr))
    }

    /// Mark `address` done. Returns `false` if it was unknown or already done.
    fn consume(&mut self, address: &str) -> bool {
        match self.index.get(address).and_then(|&i| self.open.get_mut(i)) {
            Some(open) if *open => {
                *open = false;
                self.remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn drain(&mut self) -> Vec<String> {
        let left: Vec<String> = self.pending().cloned().collect();
        self.open.fill(false);
        self.remaining = 0;
        left
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// Batch block/unblock over a [`FirewallGateway`].
pub struct Engine<G> {
    gateway: G,
    config: EngineConfig,
}

impl<G: FirewallGateway> Engine<G> {
    pub fn new(gateway: G, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `direction`, parse `raw` and run the batch.
    ///
    /// Only a bad direction is an error. An empty address list yields a
    /// 400 report with `total = 0`.
    pub async fn run(
        &self,
        mode: BatchMode,
        direction: &str,
        raw: &str,
    ) -> Result<BatchReport, CoreError> {
        let direction = Direction::parse(direction)?;
        Ok(self.reconcile(mode, direction, raw).await)
    }

    pub async fn block(&self, direction: Direction, raw: &str) -> BatchReport {
        self.reconcile(BatchMode::Block, direction, raw).await
    }

    pub async fn unblock(&self, direction: Direction, raw: &str) -> BatchReport {
        self.reconcile(BatchMode::Unblock, direction, raw).await
    }

    async fn reconcile(&self, mode: BatchMode, direction: Direction, raw: &str) -> BatchReport {
        let addresses = parse_address_list(raw);
        let total = addresses.len();
        let mut results = ResultAggregator::default();

        if addresses.is_empty() {
            warn!(%mode, %direction, "empty address list");
            return results.into_report(mode.past_tense(), 0);
        }
        info!(%mode, %direction, total, "batch started");

        let mut work = WorkSet::new(addresses);
        let mut stalled_rounds = 0;
        let mut awaiting_fill = false;
        let mut round = 0;

        while !work.is_empty() {
            round += 1;
            let start = work.len();
            debug!(round, remaining = start, "round started");

            skip_ipv6(&mut work, &mut results);
            let mut created = false;

            for group_type in PARTITIONS {
                let pending: Vec<String> = work
                    .pending()
                    .filter(|a| group_type_of(a) == Some(group_type))
                    .cloned()
                    .collect();
                if pending.is_empty() {
                    continue;
                }

                let (records, created_group) = self
                    .process_partition(mode, direction, group_type, &pending)
                    .await;
                created |= created_group;
                for record in records {
                    if work.consume(&record.address) {
                        results.record(record);
                    }
                }
            }

            if work.len() < start {
                stalled_rounds = 0;
                awaiting_fill = false;
                continue;
            }
            // A new group is only filled on the following round.
            if created && !awaiting_fill {
                awaiting_fill = true;
                continue;
            }

            stalled_rounds += 1;
            if stalled_rounds >= self.config.max_stalled_rounds {
                let left = work.drain();
                warn!(round, left = left.len(), "no progress, giving up on remaining addresses");
                for address in left {
                    results.record(OutcomeRecord::failed(address, None, mode.stalled_reason()));
                }
            }
        }

        let report = results.into_report(mode.past_tense(), total);
        info!(
            %mode,
            %direction,
            success = report.success_count,
            failed = report.failed_count,
            existed = report.existed_count,
            "batch finished"
        );
        report
    }

    async fn process_partition(
        &self,
        mode: BatchMode,
        direction: Direction,
        group_type: GroupType,
        pending: &[String],
    ) -> (Vec<OutcomeRecord>, bool) {
        let allocator = GroupAllocator::new(&self.gateway, &self.config);

        let groups = match allocator.list_groups(direction, group_type).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(%group_type, error = %e, "group listing failed, skipping partition this round");
                return (Vec::new(), false);
            }
        };

        match mode {
            BatchMode::Block => {
                let (mut records, rest) = split_present(&groups, pending);
                let mut created = false;
                if !rest.is_empty() {
                    let placement = allocator.place(direction, group_type, &groups, &rest).await;
                    records.extend(placement.records);
                    if let Some(group) = placement.created {
                        debug!(group = %group.name, "new group ready for next round");
                        created = true;
                    }
                }
                (records, created)
            }
            BatchMode::Unblock => (allocator.remove(direction, &groups, pending).await, false),
        }
    }
}

/// Record every pending IPv6 address as skipped.
fn skip_ipv6(work: &mut WorkSet, results: &mut ResultAggregator) {
    let ipv6: Vec<String> = work
        .pending()
        .filter(|a| group_type_of(a).is_none())
        .cloned()
        .collect();
    for address in ipv6 {
        debug!(%address, "IPv6 is out of policy scope");
        work.consume(&address);
        results.record(OutcomeRecord::new(address, Outcome::SkippedIpv6));
    }
}

/// Split `pending` into already-present records and addresses still to place.
fn split_present(groups: &[AddressGroup], pending: &[String]) -> (Vec<OutcomeRecord>, Vec<String>) {
    let mut present = Vec::new();
    let mut rest = Vec::new();
    for address in pending {
        let holder = groups
            .iter()
            .find(|g| g.members.iter().any(|m| equivalent(m, address)));
        match holder {
            Some(group) => present.push(OutcomeRecord::new(
                address.as_str(),
                Outcome::AlreadyPresent {
                    group: GroupRef::from(group),
                },
            )),
            None => rest.push(address.clone()),
        }
    }
    (present, rest)
}

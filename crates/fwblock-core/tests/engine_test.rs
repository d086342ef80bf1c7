// Batch reconciliation end to end against the in-memory gateway.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{Call, FakeGateway, Op, test_config};
use fwblock_core::{
    BatchMode, CoreError, Direction, Engine, EngineConfig, FailureReason, GroupType, Outcome,
};

fn engine(gw: FakeGateway, capacity: usize) -> Engine<FakeGateway> {
    Engine::new(gw, test_config(capacity))
}

// ── Block ───────────────────────────────────────────────────────────

#[tokio::test]
async fn block_into_empty_firewall_creates_one_group_with_both() {
    let engine = engine(FakeGateway::new(), 2);

    let report = engine.block(Direction::In, "1.2.3.4,5.6.7.8").await;

    assert_eq!(report.status_code, 200);
    assert_eq!(report.total, 2);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failed_count, 0);

    let gw = engine.gateway();
    let groups = gw.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members, vec!["1.2.3.4/32".to_owned(), "5.6.7.8/32".to_owned()]);
    assert_eq!(gw.count(Op::CreateGroup), 1);
    assert_eq!(gw.count(Op::UpdateGroup), 1);

    let policies = gw.policies();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].source, groups[0].uuid);
    assert_eq!(policies[0].description, groups[0].name);
}

#[tokio::test]
async fn already_present_address_issues_no_update() {
    let gw = FakeGateway::new();
    let uuid = gw.with_group("soar-In-aaaaaa", GroupType::Ip, &["1.2.3.4/32"]);
    gw.with_paired_policy(Direction::In, &uuid);
    let engine = engine(gw, 10);

    let report = engine.block(Direction::In, "1.2.3.4").await;

    assert_eq!(engine.gateway().count(Op::UpdateGroup), 0);
    assert_eq!(report.existed_count, 1);
    assert_eq!(report.status_code, 400);
    assert!(matches!(
        &report.results[0].outcome,
        Outcome::AlreadyPresent { group } if group.uuid == uuid
    ));
}

#[tokio::test]
async fn overflow_spills_into_a_new_group_next_round() {
    let gw = FakeGateway::new();
    let uuid = gw.with_group("soar-Out-aaaaaa", GroupType::Ip, &["9.9.9.9/32"]);
    gw.with_paired_policy(Direction::Out, &uuid);
    let engine = engine(gw, 2);

    let report = engine.block(Direction::Out, "1.1.1.1;2.2.2.2;3.3.3.3").await;

    assert_eq!(report.success_count, 3);
    let gw = engine.gateway();
    assert_eq!(gw.group(&uuid).unwrap().members.len(), 2);
    assert_eq!(gw.groups().len(), 2);
    assert_eq!(gw.policies().len(), 2);
    // Every group holds at most the capacity.
    assert!(gw.groups().iter().all(|g| g.members.len() <= 2));
}

#[tokio::test]
async fn ip_and_domain_partitions_get_their_own_groups() {
    let engine = engine(FakeGateway::new(), 10);

    let report = engine
        .block(Direction::Out, "1.2.3.4, evil.example.com, 10.0.0.0/8")
        .await;

    assert_eq!(report.success_count, 3);
    let groups = engine.gateway().groups();
    let ip = groups.iter().find(|g| g.group_type == GroupType::Ip).unwrap();
    let domain = groups.iter().find(|g| g.group_type == GroupType::Domain).unwrap();
    assert_eq!(ip.members, vec!["1.2.3.4/32".to_owned(), "10.0.0.0/8".to_owned()]);
    assert_eq!(domain.members, vec!["evil.example.com".to_owned()]);

    let tcp = engine
        .gateway()
        .policies()
        .into_iter()
        .filter(|p| p.proto == "TCP")
        .count();
    assert_eq!(tcp, 1);
}

#[tokio::test]
async fn ipv6_is_skipped_without_gateway_calls() {
    let engine = engine(FakeGateway::new(), 10);

    for mode in [BatchMode::Block, BatchMode::Unblock] {
        let report = engine
            .run(mode, "in", "2001:db8::1, 2001:db8::/32")
            .await
            .unwrap();
        assert_eq!(report.existed_count, 2);
        assert_eq!(report.status_code, 400);
        assert!(report.results.iter().all(|r| r.outcome == Outcome::SkippedIpv6));
    }
    assert!(engine.gateway().calls().is_empty());
}

#[tokio::test]
async fn persistent_failures_trip_the_stagnation_guard() {
    let gw = FakeGateway::new();
    gw.fail_everything();
    let engine = engine(gw, 10);

    let report = engine.block(Direction::In, "1.2.3.4, a.com").await;

    assert_eq!(report.status_code, 400);
    assert_eq!(report.failed_count, 2);
    assert!(report.results.iter().all(|r| matches!(
        r.outcome,
        Outcome::Failed { reason: FailureReason::Stagnation, .. }
    )));
    // Two rounds, two partitions, one listing each.
    assert_eq!(engine.gateway().count(Op::ListGroups), 4);
}

#[tokio::test]
async fn stagnation_threshold_is_configurable() {
    let gw = FakeGateway::new();
    gw.fail(Op::ListGroups);
    let engine = Engine::new(
        gw,
        EngineConfig {
            max_stalled_rounds: 4,
            ..test_config(10)
        },
    );

    engine.block(Direction::In, "1.2.3.4").await;
    assert_eq!(engine.gateway().count(Op::ListGroups), 4);
}

#[tokio::test]
async fn single_stall_round_still_fills_a_new_group() {
    let engine = Engine::new(
        FakeGateway::new(),
        EngineConfig {
            max_stalled_rounds: 1,
            ..test_config(10)
        },
    );

    let report = engine.block(Direction::In, "1.2.3.4").await;

    assert_eq!(report.status_code, 200);
    assert_eq!(report.success_count, 1);
    let gw = engine.gateway();
    assert_eq!(gw.groups().len(), 1);
    assert_eq!(gw.groups()[0].members, vec!["1.2.3.4/32".to_owned()]);
    assert_eq!(gw.policies().len(), 1);
}

#[tokio::test]
async fn repeated_group_creation_still_trips_the_guard() {
    let gw = FakeGateway::new();
    // New groups exist but their policies never show up, so none is usable.
    gw.fail(Op::ListPolicies);
    let engine = engine(gw, 10);

    let report = engine.block(Direction::In, "1.2.3.4").await;

    assert_eq!(report.failed_count, 1);
    assert!(matches!(
        report.results[0].outcome,
        Outcome::Failed { reason: FailureReason::Stagnation, .. }
    ));
    // One excused round, then two stalled ones.
    assert_eq!(engine.gateway().count(Op::CreateGroup), 3);
}

#[tokio::test]
async fn placeholder_filling_the_group_creates_nothing() {
    let engine = Engine::new(
        FakeGateway::new(),
        EngineConfig {
            placeholder_members: vec!["1.1.1.1/32".into()],
            ..test_config(1)
        },
    );

    let report = engine.block(Direction::In, "1.2.3.4").await;

    assert_eq!(report.status_code, 400);
    assert_eq!(report.failed_count, 1);
    assert!(matches!(
        report.results[0].outcome,
        Outcome::Failed { reason: FailureReason::Stagnation, .. }
    ));
    let gw = engine.gateway();
    assert_eq!(gw.count(Op::CreateGroup), 0);
    assert!(gw.groups().is_empty());
    assert!(gw.policies().is_empty());
}

#[tokio::test]
async fn failing_policy_creation_leaves_no_groups_behind() {
    let gw = FakeGateway::new();
    gw.fail(Op::CreatePolicy);
    let engine = engine(gw, 10);

    let report = engine.block(Direction::In, "1.2.3.4").await;

    assert_eq!(report.status_code, 400);
    assert!(engine.gateway().groups().is_empty());
    assert_eq!(
        engine.gateway().count(Op::CreateGroup),
        engine.gateway().count(Op::DeleteGroup)
    );
}

#[tokio::test]
async fn failed_update_is_recorded_once_and_not_retried() {
    let gw = FakeGateway::new();
    let uuid = gw.with_group("soar-In-aaaaaa", GroupType::Ip, &[]);
    gw.with_paired_policy(Direction::In, &uuid);
    gw.fail(Op::UpdateGroup);
    let engine = engine(gw, 10);

    let report = engine.block(Direction::In, "1.2.3.4, 5.6.7.8").await;

    assert_eq!(report.failed_count, 2);
    assert_eq!(engine.gateway().count(Op::UpdateGroup), 1);
    assert!(matches!(
        report.results[0].outcome,
        Outcome::Failed { reason: FailureReason::Gateway(_), .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_gateway_counts_as_failure() {
    let gw = FakeGateway::new();
    gw.delay_listings(Duration::from_secs(120));
    let engine = engine(gw, 10);

    let report = engine.block(Direction::In, "1.2.3.4").await;

    assert_eq!(report.failed_count, 1);
    // Timed-out listings never reach the call log.
    assert_eq!(engine.gateway().count(Op::ListGroups), 0);
}

#[tokio::test]
async fn duplicates_collapse_before_processing() {
    let engine = engine(FakeGateway::new(), 10);

    let report = engine.block(Direction::In, "1.2.3.4, 1.2.3.4/32\n1.2.3.4").await;

    assert_eq!(report.total, 1);
    assert_eq!(report.success_count, 1);
}

// ── Unblock ─────────────────────────────────────────────────────────

#[tokio::test]
async fn unblocking_sole_member_removes_group_and_policy() {
    let gw = FakeGateway::new();
    let uuid = gw.with_group("soar-In-aaaaaa", GroupType::Ip, &["1.2.3.4/32"]);
    let rule_id = gw.with_paired_policy(Direction::In, &uuid);
    let engine = engine(gw, 10);

    let report = engine.unblock(Direction::In, "1.2.3.4").await;

    assert_eq!(report.status_code, 200);
    assert_eq!(report.success_count, 1);
    let gw = engine.gateway();
    assert_eq!(
        gw.mutations(),
        vec![Call::DeletePolicy { rule_id }, Call::DeleteGroup { uuid }]
    );
    assert!(gw.policies().is_empty());
}

#[tokio::test]
async fn unblocking_unknown_address_reports_not_found() {
    let gw = FakeGateway::new();
    gw.with_group("soar-In-aaaaaa", GroupType::Ip, &["9.9.9.9/32"]);
    let engine = engine(gw, 10);

    let report = engine.unblock(Direction::In, "1.2.3.4").await;

    assert_eq!(report.status_code, 400);
    assert!(matches!(
        report.results[0].outcome,
        Outcome::Failed { reason: FailureReason::NotFound, group: None }
    ));
    assert!(engine.gateway().mutations().is_empty());
}

#[tokio::test]
async fn unblock_mixes_found_and_missing() {
    let gw = FakeGateway::new();
    let uuid = gw.with_group("soar-Out-aaaaaa", GroupType::Domain, &["a.com", "b.com"]);
    gw.with_paired_policy(Direction::Out, &uuid);
    let engine = engine(gw, 10);

    let report = engine.unblock(Direction::Out, "a.com, c.com").await;

    assert_eq!(report.status_code, 200);
    assert_eq!((report.success_count, report.failed_count), (1, 1));
    assert_eq!(
        engine.gateway().group(&uuid).unwrap().members,
        vec!["b.com".to_owned()]
    );
}

// ── Validation ──────────────────────────────────────────────────────

#[tokio::test]
async fn bad_direction_is_rejected_before_any_call() {
    let engine = engine(FakeGateway::new(), 10);

    let err = engine.run(BatchMode::Block, "both", "1.2.3.4").await.unwrap_err();

    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert!(engine.gateway().calls().is_empty());
}

#[tokio::test]
async fn empty_list_is_an_immediate_failure_report() {
    let engine = engine(FakeGateway::new(), 10);

    let report = engine.run(BatchMode::Unblock, "out", " , ;").await.unwrap();

    assert_eq!(report.status_code, 400);
    assert_eq!(report.total, 0);
    assert!(engine.gateway().calls().is_empty());
}

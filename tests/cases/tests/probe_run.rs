use std::{sync::Arc, time::Duration};

use deadline_probe_core::{Account, NodeClient, Verdict, observer::ObserverError};
use deadline_probe_workflows::{CaseConfig, CaseError, CaseReport, run_probe};
use tests_cases::{ConfirmMode, StubConnection, StubNode, test_account, wait_until};
use tokio::time::sleep;

const ACK_SETTLE: Duration = Duration::from_millis(50);

fn probe_config() -> CaseConfig {
    CaseConfig::new("http://localhost:3000", tests_cases::TEST_PRIVATE_KEY)
}

fn spawn_probe(
    node: Arc<StubNode>,
    connection: Arc<StubConnection>,
    config: CaseConfig,
) -> tokio::task::JoinHandle<Result<CaseReport, CaseError>> {
    let account: Arc<Account> = Arc::new(test_account());
    let client: Arc<dyn NodeClient> = node;
    tokio::spawn(async move { run_probe(client, connection.as_ref(), &account, &config).await })
}

/// Lets announce acknowledgments win the race before blocks start flowing.
async fn settle_announcements(node: &StubNode, connection: &StubConnection) {
    wait_until("block subscription", || connection.block_subscribers() > 0).await;
    wait_until("both announcements", || node.announced_count() == 2).await;
    sleep(ACK_SETTLE).await;
}

#[tokio::test]
async fn both_confirmations_yield_success() {
    let node = StubNode::new(ConfirmMode::All);
    let connection = StubConnection::new();
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), probe_config());

    settle_announcements(&node, &connection).await;
    for height in [101, 102, 103] {
        connection.send_block(height);
    }

    let report = probe.await.expect("probe task").expect("probe run");
    assert_eq!(report.verdict, Verdict::Success { matched: 2 });
    assert_eq!(report.block_heights, vec![101, 102, 103]);
    assert!(report.dynamic_hash.is_some());
    assert!(report.static_hash.is_some());
    assert_eq!(connection.close_count(), 1);
}

#[tokio::test]
async fn partial_confirmation_yields_failure_with_count() {
    let node = StubNode::new(ConfirmMode::DynamicOnly);
    let connection = StubConnection::new();
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), probe_config());

    settle_announcements(&node, &connection).await;
    for height in [200, 201, 202] {
        connection.send_block(height);
    }

    let report = probe.await.expect("probe task").expect("probe run");
    assert_eq!(report.verdict, Verdict::Failure { matched: 1 });
    assert_eq!(connection.close_count(), 1);
}

#[tokio::test]
async fn blocks_winning_the_announce_race_yield_zero_matches() {
    // Acknowledgments stay blocked behind the gate, so the block threshold
    // wins and evaluation runs against uncaptured hashes.
    let (node, _gate) = StubNode::gated(ConfirmMode::All);
    let connection = StubConnection::new();
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), probe_config());

    wait_until("block subscription", || connection.block_subscribers() > 0).await;
    for height in [300, 301, 302] {
        connection.send_block(height);
    }

    let report = probe.await.expect("probe task").expect("probe run");
    assert_eq!(report.verdict, Verdict::Failure { matched: 0 });
    assert!(report.dynamic_hash.is_none());
    assert!(report.static_hash.is_none());
    assert_eq!(connection.close_count(), 1);
}

#[tokio::test]
async fn too_few_blocks_time_out_distinctly() {
    let node = StubNode::new(ConfirmMode::All);
    let connection = StubConnection::new();
    let config = probe_config().with_timeout(Some(Duration::from_millis(1_000)));
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), config);

    settle_announcements(&node, &connection).await;
    connection.send_block(400);
    connection.send_block(401);

    let report = probe.await.expect("probe task").expect("probe run");
    assert_eq!(report.verdict, Verdict::TimedOut { blocks_seen: 2 });
    assert_eq!(report.verdict.matched(), None);
    assert_eq!(report.block_heights, vec![400, 401]);
    assert_eq!(connection.close_count(), 1);
}

#[tokio::test]
async fn late_blocks_do_not_extend_observation() {
    let node = StubNode::new(ConfirmMode::All);
    let connection = StubConnection::new();
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), probe_config());

    settle_announcements(&node, &connection).await;
    for height in [500, 501, 502, 503, 504] {
        connection.send_block(height);
    }

    let report = probe.await.expect("probe task").expect("probe run");
    assert_eq!(report.block_heights, vec![500, 501, 502]);
    assert_eq!(report.verdict, Verdict::Success { matched: 2 });
}

#[tokio::test]
async fn status_events_stay_diagnostic() {
    let node = StubNode::new(ConfirmMode::All);
    let connection = StubConnection::new();
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), probe_config());

    settle_announcements(&node, &connection).await;
    connection.send_status(test_account().address().clone(), "rejected: deadline expired");
    for height in [600, 601, 602] {
        connection.send_block(height);
    }

    let report = probe.await.expect("probe task").expect("probe run");
    assert_eq!(report.verdict, Verdict::Success { matched: 2 });
    assert_eq!(report.block_heights, vec![600, 601, 602]);
}

#[tokio::test]
async fn history_fetch_failure_still_closes_connection() {
    let node = StubNode::failing_history();
    let connection = StubConnection::new();
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), probe_config());

    settle_announcements(&node, &connection).await;
    for height in [700, 701, 702] {
        connection.send_block(height);
    }

    let err = probe
        .await
        .expect("probe task")
        .expect_err("history failure must surface");
    assert!(matches!(
        err,
        CaseError::Observer(ObserverError::HistoryFetch(_))
    ));
    assert_eq!(connection.close_count(), 1);
}

#[tokio::test]
async fn lost_connectivity_aborts_the_run() {
    let node = StubNode::new(ConfirmMode::All);
    let connection = StubConnection::new();
    let probe = spawn_probe(Arc::clone(&node), Arc::clone(&connection), probe_config());

    settle_announcements(&node, &connection).await;
    connection.send_block(800);
    connection.sever();

    let err = probe
        .await
        .expect("probe task")
        .expect_err("severed connection must abort");
    assert!(matches!(
        err,
        CaseError::Observer(ObserverError::FunnelClosed)
    ));
    assert_eq!(connection.close_count(), 1);
}

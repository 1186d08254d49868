//! Transaction execution over the wire

use serde_json::json;
use uuid::Uuid;
use varlock_core::{ErrorCause, LockStatement, LockTransaction, SessionData};
use varlock_daemon::protocol::{Request, Response};

use super::harness::TestDaemon;

fn execute(session: &str, transaction: LockTransaction) -> Request {
    Request::Execute {
        session: SessionData::new(session),
        transaction,
    }
}

fn result_of(response: Response) -> varlock_core::LockTransactionResult {
    match response {
        Response::Result { result } => result,
        other => panic!("expected a transaction result, got {:?}", other),
    }
}

#[tokio::test]
async fn set_then_fetch_round_trips() {
    let daemon = TestDaemon::start().await;

    let set = result_of(
        daemon
            .request(execute(
                "s1",
                LockTransaction::new(
                    Uuid::new_v4(),
                    "orders",
                    vec![LockStatement::set("jobs", "x", json!({"job": 7}))],
                ),
            ))
            .await,
    );
    assert!(set.is_ok());
    assert_eq!(set.server_host, "spec-node");

    let fetched = result_of(
        daemon
            .request(execute(
                "s2",
                LockTransaction::new(
                    Uuid::new_v4(),
                    "orders",
                    vec![LockStatement::fetch("jobs", "x")],
                ),
            ))
            .await,
    );
    assert_eq!(fetched.data, vec![("x".to_string(), json!({"job": 7}))]);
}

#[tokio::test]
async fn aborted_transaction_rolls_back_earlier_statements() {
    let daemon = TestDaemon::start().await;

    // seed jobs/held under another session
    daemon
        .request(execute(
            "s2",
            LockTransaction::new(
                Uuid::new_v4(),
                "orders",
                vec![LockStatement::set("jobs", "held", json!(1))],
            ),
        ))
        .await;

    let result = result_of(
        daemon
            .request(execute(
                "s1",
                LockTransaction::new(
                    Uuid::new_v4(),
                    "orders",
                    vec![
                        LockStatement::set("jobs", "mine", json!(2)),
                        LockStatement::require_absent("jobs", "held"),
                    ],
                ),
            ))
            .await,
    );
    assert_eq!(result.error_cause, ErrorCause::Statement);
    assert_eq!(
        result.failed_statement.as_deref(),
        Some("require absent jobs/held: already present")
    );

    let check = result_of(
        daemon
            .request(execute(
                "s3",
                LockTransaction::new(
                    Uuid::new_v4(),
                    "orders",
                    vec![LockStatement::fetch("jobs", "mine")],
                ),
            ))
            .await,
    );
    assert!(check.is_ok());
    assert!(check.data.is_empty());
}

#[tokio::test]
async fn lock_is_held_until_released() {
    let daemon = TestDaemon::start().await;

    let acquire = |session: &str| {
        execute(
            session,
            LockTransaction::new(
                Uuid::new_v4(),
                "ci",
                vec![
                    LockStatement::require_absent("locks", "deploy"),
                    LockStatement::set("locks", "deploy", json!(session)),
                ],
            ),
        )
    };

    assert!(result_of(daemon.request(acquire("s1")).await).is_ok());
    // the same composition fails while the lock is held
    let contended = result_of(daemon.request(acquire("s2")).await);
    assert_eq!(contended.error_cause, ErrorCause::Statement);

    // owner releases, then the other session can acquire
    let release = result_of(
        daemon
            .request(execute(
                "s1",
                LockTransaction::new(
                    Uuid::new_v4(),
                    "ci",
                    vec![LockStatement::delete("locks", "deploy")],
                ),
            ))
            .await,
    );
    assert!(release.is_ok());
    assert!(result_of(daemon.request(acquire("s2")).await).is_ok());
}

#[tokio::test]
async fn admission_rejects_unreachable_requirements() {
    let daemon = TestDaemon::start().await;

    let rejected = result_of(
        daemon
            .request(execute(
                "s1",
                LockTransaction::new(
                    Uuid::new_v4(),
                    "orders",
                    vec![LockStatement::fetch("jobs", "x")],
                )
                .with_minimum_runtime_secs(3600),
            ))
            .await,
    );
    assert_eq!(rejected.error_cause, ErrorCause::MinimumRequirements);
}

#[tokio::test]
async fn transport_ping_does_not_create_sessions() {
    let daemon = TestDaemon::start().await;
    assert_eq!(daemon.request(Request::Ping).await, Response::Pong);
    assert_eq!(daemon.server.session_count(), 0);
}

//! Session lifecycle over the wire

use serde_json::json;
use uuid::Uuid;
use varlock_core::{ErrorCause, LockStatement, LockTransaction, SessionData};
use varlock_daemon::protocol::{Request, Response};

use super::harness::TestDaemon;

#[tokio::test]
async fn session_ping_registers_and_keeps_a_session() {
    let daemon = TestDaemon::start().await;

    let response = daemon
        .request(Request::Execute {
            session: SessionData::new("worker-1").with_description("spec worker"),
            transaction: LockTransaction::ping(Uuid::new_v4()),
        })
        .await;

    match response {
        Response::Result { result } => assert!(result.is_ok()),
        other => panic!("expected a transaction result, got {:?}", other),
    }
    assert_eq!(daemon.server.session_count(), 1);
    assert_eq!(daemon.server.namespace_count(), 0);
}

#[tokio::test]
async fn ended_session_expires_and_loses_its_variables() {
    let daemon = TestDaemon::start().await;

    daemon
        .request(Request::Execute {
            session: SessionData::new("worker-1"),
            transaction: LockTransaction::new(
                Uuid::new_v4(),
                "orders",
                vec![LockStatement::set("jobs", "claimed", json!("worker-1"))],
            ),
        })
        .await;

    let ended = daemon
        .request(Request::EndSession {
            session_id: "worker-1".to_string(),
        })
        .await;
    assert_eq!(ended, Response::SessionEnded { ended: true });

    let again = daemon
        .request(Request::EndSession {
            session_id: "worker-1".to_string(),
        })
        .await;
    assert_eq!(again, Response::SessionEnded { ended: false });

    // the variable is gone for everyone
    let response = daemon
        .request(Request::Execute {
            session: SessionData::new("worker-2"),
            transaction: LockTransaction::new(
                Uuid::new_v4(),
                "orders",
                vec![LockStatement::fetch("jobs", "claimed")],
            ),
        })
        .await;
    match response {
        Response::Result { result } => {
            assert!(result.is_ok());
            assert!(result.data.is_empty());
        }
        other => panic!("expected a transaction result, got {:?}", other),
    }
}

#[tokio::test]
async fn status_reflects_activity() {
    let daemon = TestDaemon::start().await;

    daemon
        .request(Request::Execute {
            session: SessionData::new("worker-1"),
            transaction: LockTransaction::new(
                Uuid::new_v4(),
                "orders",
                vec![LockStatement::set("jobs", "x", json!(1))],
            ),
        })
        .await;

    let response = daemon.request(Request::Status).await;
    match response {
        Response::Status(report) => {
            assert_eq!(report.host, "spec-node");
            assert_eq!(report.sessions, 1);
            assert_eq!(report.namespaces, 1);
            assert_eq!(report.trust_level, 1.0);
            assert_eq!(report.stats.transactions_ok, 1);
        }
        other => panic!("expected a status report, got {:?}", other),
    }
}

#[tokio::test]
async fn hello_negotiates_protocol_version() {
    let daemon = TestDaemon::start().await;
    let response = daemon
        .request(Request::Hello {
            version: "1".to_string(),
        })
        .await;
    assert_eq!(
        response,
        Response::Hello {
            version: "1".to_string()
        }
    );
}

#[tokio::test]
async fn sweep_expires_idle_sessions_end_to_end() {
    let daemon = TestDaemon::start().await;

    daemon
        .request(Request::Execute {
            session: SessionData::new("worker-1").with_max_age(std::time::Duration::ZERO),
            transaction: LockTransaction::new(
                Uuid::new_v4(),
                "orders",
                vec![LockStatement::set("jobs", "x", json!(1))],
            ),
        })
        .await;

    // zero max age: the next sweep evicts the session immediately
    let report = daemon.server.sweep_tick();
    assert_eq!(report.sessions_expired, 1);
    assert_eq!(daemon.server.session_count(), 0);
}

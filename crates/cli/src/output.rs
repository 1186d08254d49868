// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable and JSON output for CLI commands

use varlock_core::{LockTransactionResult, TransactionStatus};
use varlock_daemon::protocol::StatusReport;

/// Print a transaction result
pub fn print_result(result: &LockTransactionResult, json: bool) {
    if json {
        print_json(result);
        return;
    }

    match result.status {
        TransactionStatus::Ok => {
            println!("ok ({}, trust {:.2})", result.server_host, result.trust_level);
            for (key, value) in &result.data {
                println!("{} = {}", key, value);
            }
        }
        TransactionStatus::Error => {
            println!("error: {:?}", result.error_cause);
            if let Some(failed) = &result.failed_statement {
                println!("failed statement: {}", failed);
            }
        }
    }
}

/// Print the outcome of an end-session request
pub fn print_session_ended(ended: bool, json: bool) {
    if json {
        println!(r#"{{"ended": {}}}"#, ended);
    } else if ended {
        println!("session ended");
    } else {
        println!("no live session with that id");
    }
}

/// Print a daemon status report
pub fn print_status(report: &StatusReport, json: bool) {
    if json {
        print_json(report);
        return;
    }

    println!("host:        {}", report.host);
    println!("uptime:      {}s", report.uptime_secs);
    println!("trust level: {:.3}", report.trust_level);
    println!("call norm:   {:.1}", report.calls_norm);
    println!("sessions:    {}", report.sessions);
    println!("namespaces:  {}", report.namespaces);
    let stats = &report.stats;
    println!(
        "transactions: {} ok, {} rejected, {} expired-session, {} failed-statement, {} call-failed",
        stats.transactions_ok,
        stats.transactions_rejected,
        stats.transactions_session_expired,
        stats.transactions_statement_failed,
        stats.transactions_call_failed
    );
    println!(
        "sweep: {} variables expired, {} tables removed, {} sessions expired, {} sessions ended, {} pings",
        stats.variables_expired,
        stats.tables_removed,
        stats.sessions_expired,
        stats.sessions_ended,
        stats.pings
    );
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(encoded) => println!("{}", encoded),
        Err(e) => eprintln!("failed to encode output: {}", e),
    }
}

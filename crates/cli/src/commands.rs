// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI commands and their mapping onto lock transactions

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::Value;
use uuid::Uuid;
use varlock_core::{LockOp, LockStatement, LockTransaction, SessionData};
use varlock_daemon::protocol::{Request, Response};

use crate::client::DaemonClient;
use crate::output;

/// Client for the varlock coordination daemon
#[derive(Debug, Parser)]
#[command(name = "varlock", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Socket path (defaults to $VARLOCK_SOCKET_DIR/varlockd.sock)
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    /// Session id; generated per invocation when omitted
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Print raw JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep the session alive without running any statements
    Ping,

    /// Set a variable
    Set {
        namespace: String,
        table: String,
        name: String,
        /// JSON value; bare words are treated as strings
        value: String,
        /// Variable time-to-live, e.g. "30s" or "5m"
        #[arg(long)]
        ttl: Option<humantime::Duration>,
        #[arg(long)]
        description: Option<String>,
        /// Append even when the name is already taken
        #[arg(long)]
        allow_duplicates: bool,
    },

    /// Fetch variable value(s)
    Get {
        namespace: String,
        table: String,
        name: String,
        /// Fetch every match instead of the first
        #[arg(long)]
        many: bool,
        /// Skip variables owned by this session
        #[arg(long)]
        ignore_self: bool,
        /// Fail when nothing matches
        #[arg(long)]
        required: bool,
    },

    /// Delete this session's variables under a name
    Delete {
        namespace: String,
        table: String,
        name: String,
        /// Only delete variables matching this JSON value
        #[arg(long)]
        value: Option<String>,
        /// Fail when nothing matched
        #[arg(long)]
        required: bool,
    },

    /// Acquire a mutex-style lock (require absent + set, atomically)
    Acquire {
        namespace: String,
        table: String,
        name: String,
        /// Lock time-to-live, e.g. "30s"
        #[arg(long)]
        ttl: Option<humantime::Duration>,
    },

    /// Release a lock held by this session
    Release {
        namespace: String,
        table: String,
        name: String,
    },

    /// Run a transaction script: a JSON array of statements
    Txn {
        namespace: String,
        /// Path to the statement file
        file: PathBuf,
    },

    /// End a session and purge its variables
    EndSession { session_id: String },

    /// Show daemon status and counters
    Status,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Parse a CLI value: JSON if it parses, bare string otherwise
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Run one CLI command against the daemon
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "varlock",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let client = DaemonClient::connect(cli.socket.clone())?;
    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(|| format!("cli-{}", Uuid::new_v4()));
    let session = SessionData::new(&session_id).with_description("varlock cli");

    match cli.command {
        Command::Ping => {
            let response = client
                .request(Request::Execute {
                    session,
                    transaction: LockTransaction::ping(Uuid::new_v4()),
                })
                .await?;
            finish_transaction(response, cli.json)
        }

        Command::Set {
            namespace,
            table,
            name,
            value,
            ttl,
            description,
            allow_duplicates,
        } => {
            let statement = LockStatement {
                table,
                op: LockOp::Set {
                    name,
                    value: parse_value(&value),
                    description,
                    ttl: ttl.map(Duration::from),
                    allow_duplicates,
                },
            };
            execute(&client, session, &namespace, vec![statement], cli.json).await
        }

        Command::Get {
            namespace,
            table,
            name,
            many,
            ignore_self,
            required,
        } => {
            let statement = LockStatement {
                table,
                op: LockOp::Fetch {
                    name,
                    output: None,
                    many,
                    ignore_self,
                    required,
                },
            };
            execute(&client, session, &namespace, vec![statement], cli.json).await
        }

        Command::Delete {
            namespace,
            table,
            name,
            value,
            required,
        } => {
            let statement = LockStatement {
                table,
                op: LockOp::Delete {
                    name,
                    value: value.as_deref().map(parse_value),
                    required,
                },
            };
            execute(&client, session, &namespace, vec![statement], cli.json).await
        }

        Command::Acquire {
            namespace,
            table,
            name,
            ttl,
        } => {
            let statements = vec![
                LockStatement::require_absent(&table, &name),
                LockStatement {
                    table,
                    op: LockOp::Set {
                        name,
                        value: Value::String(session_id.clone()),
                        description: None,
                        ttl: ttl.map(Duration::from),
                        allow_duplicates: false,
                    },
                },
            ];
            execute(&client, session, &namespace, statements, cli.json).await
        }

        Command::Release {
            namespace,
            table,
            name,
        } => {
            let statement = LockStatement {
                table,
                op: LockOp::Delete {
                    name,
                    value: None,
                    required: true,
                },
            };
            execute(&client, session, &namespace, vec![statement], cli.json).await
        }

        Command::Txn { namespace, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let statements: Vec<LockStatement> = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", file.display()))?;
            execute(&client, session, &namespace, statements, cli.json).await
        }

        Command::EndSession { session_id } => {
            let response = client.request(Request::EndSession { session_id }).await?;
            match response {
                Response::SessionEnded { ended } => {
                    output::print_session_ended(ended, cli.json);
                    if !ended {
                        bail!("session was not live");
                    }
                    Ok(())
                }
                _ => bail!("unexpected response from daemon"),
            }
        }

        Command::Status => {
            let response = client.request(Request::Status).await?;
            match response {
                Response::Status(report) => {
                    output::print_status(&report, cli.json);
                    Ok(())
                }
                _ => bail!("unexpected response from daemon"),
            }
        }

        Command::Completions { .. } => unreachable!("handled above"),
    }
}

async fn execute(
    client: &DaemonClient,
    session: SessionData,
    namespace: &str,
    statements: Vec<LockStatement>,
    json: bool,
) -> anyhow::Result<()> {
    let transaction = LockTransaction::new(Uuid::new_v4(), namespace, statements);
    let response = client
        .request(Request::Execute {
            session,
            transaction,
        })
        .await?;
    finish_transaction(response, json)
}

fn finish_transaction(response: Response, json: bool) -> anyhow::Result<()> {
    match response {
        Response::Result { result } => {
            output::print_result(&result, json);
            if !result.is_ok() {
                bail!(
                    "transaction failed: {:?}{}",
                    result.error_cause,
                    result
                        .failed_statement
                        .map(|s| format!(" ({})", s))
                        .unwrap_or_default()
                );
            }
            Ok(())
        }
        _ => bail!("unexpected response from daemon"),
    }
}

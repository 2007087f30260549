//! Warren broker administration utility.
//!
//! Connects to an AMQP 0-9-1 broker, runs one management command once the
//! handshake completes, then disconnects cleanly.
//!
//! # Usage
//!
//! ```bash
//! warren declare-queue --durable jobs
//! warren --host broker.internal --vhost /prod bind-queue jobs events -k job.*
//! warren delete-exchange --if-unused events
//! ```
//!
//! Exit code is 0 on success and 1 on any fatal error.

use std::{collections::VecDeque, process::ExitCode, time::Duration};

use bytes::Bytes;
use clap::{Parser, Subcommand};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::Instant,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use warren_client::{
    Client, ClientAction, ClientConfig, ClientEvent, ExchangeDeclareOptions,
    ExchangeDeleteOptions, ExchangeType, QueueDeclareOptions, QueueDeleteOptions,
};
use warren_proto::FieldTable;

/// AMQP broker administration utility
#[derive(Parser, Debug)]
#[command(name = "warren")]
#[command(about = "Manage exchanges, queues and bindings on an AMQP 0-9-1 broker")]
#[command(version)]
struct Cli {
    /// The host to connect to
    #[arg(short = 's', long, default_value = "localhost")]
    host: String,

    /// The port to connect to
    #[arg(short, long, default_value_t = 5672)]
    port: u16,

    /// The user name
    #[arg(short, long, default_value = "guest")]
    user: String,

    /// The password
    #[arg(short = 'w', long, default_value = "guest")]
    password: String,

    /// The virtual host
    #[arg(short = 'i', long, default_value = "/")]
    vhost: String,

    /// Enable verbose mode
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an exchange
    DeclareExchange {
        /// The name of the exchange
        name: String,

        /// The type of the exchange (direct, fanout, topic, headers)
        exchange_type: ExchangeType,

        /// Assert the exchange exists instead of creating it
        #[arg(long)]
        passive: bool,

        /// Create a durable exchange
        #[arg(short, long)]
        durable: bool,

        /// Delete the exchange when all queues have finished using it
        #[arg(short, long)]
        auto_delete: bool,

        /// Create an internal exchange
        #[arg(long)]
        internal: bool,
    },

    /// Delete an exchange
    DeleteExchange {
        /// The name of the exchange
        name: String,

        /// Only delete the exchange if it has no queue bindings
        #[arg(short = 'u', long)]
        if_unused: bool,
    },

    /// Create a queue
    DeclareQueue {
        /// The name of the queue
        name: String,

        /// Create a durable queue
        #[arg(short, long)]
        durable: bool,

        /// Create an exclusive queue
        #[arg(short, long)]
        exclusive: bool,

        /// Delete the queue when it has no consumer
        #[arg(short, long)]
        auto_delete: bool,
    },

    /// Delete a queue
    DeleteQueue {
        /// The name of the queue
        name: String,

        /// Only delete the queue if it has no consumer
        #[arg(short = 'u', long)]
        if_unused: bool,

        /// Only delete the queue if it is empty
        #[arg(short = 'e', long)]
        if_empty: bool,
    },

    /// Bind a queue to an exchange
    BindQueue {
        /// The name of the queue
        queue: String,

        /// The name of the exchange
        exchange: String,

        /// The routing key
        #[arg(short = 'k', long, default_value = "")]
        routing_key: String,
    },

    /// Unbind a queue from an exchange
    UnbindQueue {
        /// The name of the queue
        queue: String,

        /// The name of the exchange
        exchange: String,

        /// The routing key
        #[arg(short = 'k', long, default_value = "")]
        routing_key: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("fatal error: {err}");
            ExitCode::FAILURE
        },
    }
}

/// Connect, run the command once Ready, disconnect. Returns whether the
/// whole session stayed error-free.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let Cli { host, port, user, password, vhost, verbose: _, command } = cli;

    let mut client = Client::new(ClientConfig::new(user, password).vhost(vhost))?;

    let addr = format!("{host}:{port}");
    let mut stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(err) => {
            client.handle(ClientEvent::ConnFailed);
            return Err(format!("cannot connect to {addr}: {err}").into());
        },
    };
    tracing::debug!(%addr, "tcp connection established");

    let mut queue: VecDeque<ClientAction> = client.handle(ClientEvent::Connected).into();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut buf = [0u8; 16 * 1024];
    let mut ok = true;
    let mut done = false;

    loop {
        while let Some(action) = queue.pop_front() {
            match action {
                ClientAction::Send(bytes) => stream.write_all(&bytes).await?,
                ClientAction::Disconnect => {
                    let _ = stream.shutdown().await;
                    let closed = client.handle(ClientEvent::Closed);
                    queue.extend(closed);
                },
                ClientAction::ConnEstablished => tracing::debug!("connection established"),
                ClientAction::ConnFailed => {
                    ok = false;
                    done = true;
                },
                ClientAction::ConnClosed => {
                    tracing::debug!("connection closed");
                    done = true;
                },
                ClientAction::Ready => {
                    tracing::debug!("ready, executing command");
                    let mut actions = execute(&mut client, &command)?;
                    actions.extend(client.disconnect()?);
                    queue.extend(actions);
                },
                ClientAction::Error(text) => {
                    eprintln!("error: {text}");
                    ok = false;
                },
                ClientAction::Trace(text) => tracing::debug!("{text}"),
            }
        }

        if done {
            break;
        }

        tokio::select! {
            read = stream.read(&mut buf) => match read {
                Ok(0) => queue.extend(client.handle(ClientEvent::Closed)),
                Ok(n) => {
                    let data = Bytes::copy_from_slice(&buf[..n]);
                    queue.extend(client.handle(ClientEvent::Data(data)));
                },
                Err(err) => {
                    tracing::debug!(error = %err, "read failed");
                    queue.extend(client.handle(ClientEvent::Closed));
                },
            },
            _ = ticker.tick() => {
                queue.extend(client.handle(ClientEvent::Tick { now: Instant::now().into_std() }));
            },
        }
    }

    Ok(ok)
}

/// Issue the frames for one management command.
fn execute(
    client: &mut Client,
    command: &Command,
) -> Result<Vec<ClientAction>, warren_client::ClientError> {
    match command {
        Command::DeclareExchange { name, exchange_type, passive, durable, auto_delete, internal } => {
            let options = ExchangeDeclareOptions {
                passive: *passive,
                durable: *durable,
                auto_delete: *auto_delete,
                internal: *internal,
            };
            client.declare_exchange(name, *exchange_type, options, FieldTable::new())
        },
        Command::DeleteExchange { name, if_unused } => {
            client.delete_exchange(name, ExchangeDeleteOptions { if_unused: *if_unused })
        },
        Command::DeclareQueue { name, durable, exclusive, auto_delete } => {
            let options = QueueDeclareOptions {
                passive: false,
                durable: *durable,
                exclusive: *exclusive,
                auto_delete: *auto_delete,
            };
            client.declare_queue(name, options, FieldTable::new())
        },
        Command::DeleteQueue { name, if_unused, if_empty } => {
            let options = QueueDeleteOptions { if_unused: *if_unused, if_empty: *if_empty };
            client.delete_queue(name, options)
        },
        Command::BindQueue { queue, exchange, routing_key } => {
            client.bind_queue(queue, exchange, routing_key, FieldTable::new())
        },
        Command::UnbindQueue { queue, exchange, routing_key } => {
            client.unbind_queue(queue, exchange, routing_key, FieldTable::new())
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_common_options_and_command() {
        let cli = Cli::parse_from([
            "warren",
            "--host",
            "broker",
            "--port",
            "5673",
            "declare-queue",
            "--durable",
            "jobs",
        ]);

        assert_eq!(cli.host, "broker");
        assert_eq!(cli.port, 5673);
        assert_eq!(cli.user, "guest");
        assert_eq!(cli.vhost, "/");
        match cli.command {
            Command::DeclareQueue { name, durable, exclusive, auto_delete } => {
                assert_eq!(name, "jobs");
                assert!(durable);
                assert!(!exclusive);
                assert!(!auto_delete);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_bind_with_routing_key() {
        let cli = Cli::parse_from(["warren", "bind-queue", "jobs", "events", "-k", "job.*"]);
        match cli.command {
            Command::BindQueue { queue, exchange, routing_key } => {
                assert_eq!(queue, "jobs");
                assert_eq!(exchange, "events");
                assert_eq!(routing_key, "job.*");
            },
            other => panic!("unexpected command {other:?}"),
        }
    }
}

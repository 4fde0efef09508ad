//! comlink - A Network Command Protocol Server
//!
//! This is the main entry point for the comlink server. It registers the
//! device collaborators, seals the command registry, and starts the
//! listener.

use std::sync::Arc;

use comlink::devices::{Focuser, TemperatureProbe};
use comlink::dispatch::RegistryBuilder;
use comlink::server::{ConcurrencyPolicy, Server, ServerConfig};
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Parse configuration from command-line arguments
fn config_from_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                if i + 1 < args.len() {
                    config.host = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("Error: --host requires a value");
                    std::process::exit(1);
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    config.port = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --port requires a value");
                    std::process::exit(1);
                }
            }
            "--serial" => {
                config.concurrency = ConcurrencyPolicy::Serialized;
                i += 1;
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("comlink version {}", comlink::VERSION);
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

fn print_help() {
    println!(
        r#"
comlink - A Network Command Protocol Server

USAGE:
    comlink [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>    Port to listen on (default: 3564)
        --serial         Serve one connection at a time
    -v, --version        Print version information
        --help           Print this help message

EXAMPLES:
    comlink                        # Start on 127.0.0.1:3564
    comlink --port 4000            # Start on port 4000
    comlink --host 0.0.0.0         # Listen on all interfaces

CONNECTING:
    Any line-based TCP client works:
    $ nc 127.0.0.1 3564
    <F1,234,MoveTo=12345>
    !234
    Position = 12345
    END
"#
    );
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
comlink v{} - Network Command Protocol Server
──────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        comlink::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = config_from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    // Register every device collaborator, then seal. Registration must
    // complete before the first connection is accepted; the sealed
    // registry is read-only from here on.
    let mut builder = RegistryBuilder::new();
    builder.register(&Focuser::new("F1"))?;
    builder.register(&TemperatureProbe::new("T1", 12.5))?;
    let registry = Arc::new(builder.seal());
    info!(capabilities = registry.len(), "command registry sealed");

    let server = Server::new(config, registry);

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // The server loop never returns on its own.
    tokio::select! {
        _ = server.run() => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

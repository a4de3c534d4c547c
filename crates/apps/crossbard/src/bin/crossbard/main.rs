use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crossbar_api::StubBroker;
use crossbar_daemon::config::DaemonConfig;
use crossbar_daemon::transport::TcpTransport;
use crossbar_rpc::{RpcConfig, RpcServer};

#[derive(Parser, Debug)]
#[command(name = "crossbard")]
struct Args {
    /// Address to listen on; overrides the config file.
    #[arg(long)]
    listen: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Worker task count; 0 behaves as 1.
    #[arg(long)]
    workers: Option<usize>,
    /// Bounded receive wait per worker iteration, in microseconds.
    #[arg(long)]
    recv_timeout_us: Option<u64>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let file = match args.config.as_ref() {
        Some(path) => match DaemonConfig::from_path(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("crossbard: could not load {}: {}", path.display(), err);
                std::process::exit(1);
            }
        },
        None => DaemonConfig::default(),
    };

    let listen = args
        .listen
        .or(file.listen)
        .unwrap_or_else(|| "127.0.0.1:4250".to_string());
    let addr: SocketAddr = match listen.parse() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("crossbard: invalid listen address {listen}: {err}");
            std::process::exit(1);
        }
    };
    let config = RpcConfig {
        recv_timeout_us: args
            .recv_timeout_us
            .or(file.recv_timeout_us)
            .unwrap_or(1_000_000),
        num_workers: args.workers.or(file.workers).unwrap_or(4),
    };

    let transport = match TcpTransport::bind(addr).await {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("crossbard: could not bind {addr}: {err}");
            std::process::exit(1);
        }
    };
    println!("crossbard listening on {}", transport.local_addr());

    let server = RpcServer::start(transport.clone(), Arc::new(StubBroker), config);

    if let Err(err) = tokio::signal::ctrl_c().await {
        eprintln!("crossbard: could not wait for ctrl-c: {err}");
    }
    log::info!("crossbard: shutting down");
    server.shutdown().await;
    transport.close();
}

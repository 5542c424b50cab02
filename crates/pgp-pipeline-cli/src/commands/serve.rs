//! `pgp-pipeline serve` — run the Assuan-style command dispatch server
//! (spec.md §4.G), either over stdio (the mode a parent process spawns a
//! helper in) or as a standalone TCP listener for local testing.

use std::net::TcpListener;

pub fn run(port: Option<u16>) {
    match port {
        None => {
            if let Err(e) = pgp_pipeline_server::serve_stdio() {
                eprintln!("pgp-pipeline: server error: {e}");
                std::process::exit(1);
            }
        }
        Some(port) => {
            let listener = match TcpListener::bind(("127.0.0.1", port)) {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("pgp-pipeline: cannot bind 127.0.0.1:{port}: {e}");
                    std::process::exit(1);
                }
            };

            let shutdown = match pgp_pipeline_server::install_sigint_handler() {
                Ok(flag) => flag,
                Err(e) => {
                    eprintln!("pgp-pipeline: failed to install signal handler: {e}");
                    std::process::exit(1);
                }
            };

            if let Err(e) = pgp_pipeline_server::serve_tcp(&listener, shutdown) {
                eprintln!("pgp-pipeline: server error: {e}");
                std::process::exit(1);
            }
        }
    }
}

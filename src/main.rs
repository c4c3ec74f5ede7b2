mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;

use server::{supervisor, worker, Role};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

    let result = match Role::from_env()? {
        Role::Worker(worker_id) => worker::run(&cfg, worker_id),
        Role::Supervisor if cfg.server.supervise => supervisor::run(&cfg),
        // Single-process mode: serve directly without forking workers
        Role::Supervisor => worker::run(&cfg, 0),
    };

    if let Err(ref e) = result {
        logger::log_error(&format!("Fatal: {e}"));
    }
    Ok(result?)
}

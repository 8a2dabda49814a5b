#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::unwrap_used)]

mod argument;
mod boot;
mod logging;

use argument::Arguments;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use wyvern_vm::{ConfigurationBuilder, Result, Scheduler, TcpServer};

fn main() -> Result<()> {
    let arguments = Arguments::parse();
    logging::initialize()?;
    if let Err(error) = serve(&arguments) {
        error!("{error}");
        std::process::exit(1);
    }
    Ok(())
}

fn serve(arguments: &Arguments) -> Result<()> {
    let configuration = ConfigurationBuilder::new()
        .slice_budget(arguments.slice_budget)
        .gc_interval_ticks(arguments.gc_interval)
        .tick_timeout(Duration::from_millis(arguments.tick_millis))
        .listen_port(arguments.port)
        .build();

    let mut world = boot::boot_world()?;
    let mut server = TcpServer::bind(configuration.listen_port)
        .map_err(|error| wyvern_vm::Error::InternalError(error.to_string()))?;
    let mut scheduler = Scheduler::new(configuration);

    info!("wyvern listening on port {}", arguments.port);
    scheduler.run(&mut world, &mut server);
    for (kind, count) in world.kind_counts() {
        info!("shutdown with {count} live {kind} objects");
    }
    info!("wyvern shut down after {} ticks", scheduler.ticks());
    Ok(())
}

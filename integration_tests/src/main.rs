//! Integration tests for the Si4463 link controller.
//!
//! Run after flashing the firmware; drives the host line protocol.

mod device;
mod protocol;
mod tests;

use clap::Parser;
use colored::Colorize;

use device::{resolve_port, DeviceClient};
use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the Si4463 link controller")]
struct Args {
    /// Serial port for the controller (use "auto" to auto-detect)
    #[arg(short, long, default_value = "auto")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "38400")]
    baud: u32,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let port = resolve_port(&args.port, args.baud)?;

    println!("{}", "Si4463 Link Integration Tests".bold());
    println!("Port: {}", port);
    println!("Baud: {}", args.baud);
    println!();

    println!("Connecting to controller...");
    let mut device = DeviceClient::new(&port, args.baud)?;

    // Wait for boot output to finish, then clear buffer
    std::thread::sleep(std::time::Duration::from_secs(1));
    device.clear_buffer()?;
    println!("{}", "Connected!".green());

    println!("\nRunning tests...\n");

    let results = run_all_tests(&mut device);
    print_results(&results);

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

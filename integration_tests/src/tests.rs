//! Integration test cases.

use colored::Colorize;

use crate::device::DeviceClient;
use crate::protocol::{cmd, error, state, Reply};

/// Test result.
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: Some(message.to_string()),
        }
    }
}

/// Run a test function and print results as it happens.
fn run_test<F>(name: &str, device: &mut DeviceClient, test_fn: F) -> TestResult
where
    F: FnOnce(&mut DeviceClient) -> TestResult,
{
    print!("  {} ... ", name);
    std::io::Write::flush(&mut std::io::stdout()).ok();

    let mut result = test_fn(device);
    result.name = name.to_string();

    if result.passed {
        println!("{}", "PASS".green().bold());
    } else {
        println!("{}", "FAIL".red().bold());
        if let Some(msg) = &result.message {
            println!("    {}", msg.red());
        }
    }

    result
}

/// Run all tests and return results.
///
/// Order matters: the controller is deactivated, then activated as node 1.
pub fn run_all_tests(device: &mut DeviceClient) -> Vec<TestResult> {
    let mut results = Vec::new();

    results.push(run_test("Dynamic status reports state", device, test_dynamic_status));
    results.push(run_test("Static status reports firmware", device, test_static_status));
    results.push(run_test("Unknown channel letter rejected", device, test_invalid_channel));
    results.push(run_test("Stray character rejected", device, test_unexpected_character));
    results.push(run_test("Remote packet refused until active", device, test_not_active));
    results.push(run_test("Local activation", device, test_activation));
    results.push(run_test("SET_CHANNEL enables a channel", device, test_set_channel));
    results.push(run_test("Disabled channel rejected", device, test_disabled_channel));
    results.push(run_test("Local EEPROM write and read", device, test_eeprom));

    results
}

/// Print test results summary.
pub fn print_results(results: &[TestResult]) {
    println!("\n{}", "=".repeat(60));
    println!("{}", "Test Results".bold());
    println!("{}", "=".repeat(60));

    let mut passed = 0;
    let mut failed = 0;

    for result in results {
        if result.passed {
            println!("  {} {}", "[PASS]".green().bold(), result.name);
            passed += 1;
        } else {
            println!("  {} {}", "[FAIL]".red().bold(), result.name);
            if let Some(msg) = &result.message {
                println!("         {}", msg.red());
            }
            failed += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!(
        "  Total: {} passed, {} failed",
        passed.to_string().green(),
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );
    println!("{}", "=".repeat(60));
}

// --- Individual Tests ---

/// Ask for `>S` and return (node, data)
fn own_status(device: &mut DeviceClient, line: &str) -> Result<(u8, Vec<u8>), String> {
    match device.send_line(line) {
        Ok(Reply::Packet {
            channel: 'A',
            node,
            cmd: cmd::STATUS_RESPONSE,
            data,
            ..
        }) => Ok((node, data)),
        Ok(other) => Err(format!("Expected status packet, got {:?}", other)),
        Err(e) => Err(format!("Error: {}", e)),
    }
}

fn expect_ack(device: &mut DeviceClient, line: &str) -> Option<TestResult> {
    match device.send_line(line) {
        Ok(Reply::Ack) => None,
        Ok(other) => Some(TestResult::fail(
            "test",
            &format!("{:?}: expected <+, got {:?}", line, other),
        )),
        Err(e) => Some(TestResult::fail("test", &format!("Error: {}", e))),
    }
}

fn expect_error(device: &mut DeviceClient, line: &str, code: u8) -> TestResult {
    match device.send_line(line) {
        Ok(Reply::Error { code: got, state }) if got == code => {
            print!("(state {}) ", state);
            TestResult::pass("test")
        }
        Ok(other) => TestResult::fail("test", &format!("Expected <-{}/.., got {:?}", code, other)),
        Err(e) => TestResult::fail("test", &format!("Error: {}", e)),
    }
}

fn test_dynamic_status(device: &mut DeviceClient) -> TestResult {
    match own_status(device, ">S\n") {
        Ok((_, data)) if data.len() == 9 && data[0] == 0 => {
            print!("(state {}) ", data[1]);
            TestResult::pass("test")
        }
        Ok((_, data)) => TestResult::fail("test", &format!("Unexpected status block {:?}", data)),
        Err(msg) => TestResult::fail("test", &msg),
    }
}

fn test_static_status(device: &mut DeviceClient) -> TestResult {
    match own_status(device, ">T\n") {
        Ok((_, data)) if data.len() == 7 && data[0] == 1 => {
            print!("(v{}.{}) ", data[5], data[6]);
            TestResult::pass("test")
        }
        Ok((_, data)) => TestResult::fail("test", &format!("Unexpected status block {:?}", data)),
        Err(msg) => TestResult::fail("test", &msg),
    }
}

fn test_invalid_channel(device: &mut DeviceClient) -> TestResult {
    expect_error(device, ">Z1:2.\n", error::INVALID_CHANNEL)
}

fn test_unexpected_character(device: &mut DeviceClient) -> TestResult {
    expect_error(device, "x\n", error::UNEXPECTED_CHARACTER)
}

fn test_not_active(device: &mut DeviceClient) -> TestResult {
    let node = match own_status(device, ">S\n") {
        Ok((node, _)) => node,
        Err(msg) => return TestResult::fail("test", &msg),
    };
    // DEACTIVATE addressed to the controller itself runs locally
    if let Some(fail) = expect_ack(device, &format!(">A{}:{}.\n", node, cmd::DEACTIVATE)) {
        return fail;
    }
    expect_error(device, ">A9:20.\n", error::NOT_ACTIVE)
}

fn test_activation(device: &mut DeviceClient) -> TestResult {
    if let Some(fail) = expect_ack(device, &format!(">A9:{}:0,1.\n", cmd::ACTIVATE)) {
        return fail;
    }
    match own_status(device, ">S\n") {
        Ok((1, data)) if data.get(1) == Some(&state::ACTIVE) => TestResult::pass("test"),
        Ok((node, data)) => TestResult::fail(
            "test",
            &format!("Expected node 1 ACTIVE, got node {} status {:?}", node, data),
        ),
        Err(msg) => TestResult::fail("test", &msg),
    }
}

fn test_set_channel(device: &mut DeviceClient) -> TestResult {
    if let Some(fail) = expect_ack(device, &format!(">A1:{}:1,2.\n", cmd::SET_CHANNEL)) {
        return fail;
    }
    // NOOP to ourselves through the new channel
    match expect_ack(device, ">B1:0.\n") {
        Some(fail) => fail,
        None => TestResult::pass("test"),
    }
}

fn test_disabled_channel(device: &mut DeviceClient) -> TestResult {
    if let Some(fail) = expect_ack(device, &format!(">A1:{}:1,0.\n", cmd::SET_CHANNEL)) {
        return fail;
    }
    expect_error(device, ">B1:0.\n", error::INVALID_CHANNEL)
}

fn test_eeprom(device: &mut DeviceClient) -> TestResult {
    let write = format!(">A1:{}:3,16,0,7,8,9.\n", cmd::WRITE_EEPROM);
    if let Some(fail) = expect_ack(device, &write) {
        return fail;
    }
    match device.submit('A', 1, cmd::READ_EEPROM, &[0, 0, 3, 16, 0]) {
        Ok(Reply::Packet {
            cmd: cmd::EEPROM_RESPONSE,
            data,
            ..
        }) if data == [7, 8, 9] => TestResult::pass("test"),
        Ok(other) => TestResult::fail("test", &format!("Expected EEPROM bytes, got {:?}", other)),
        Err(e) => TestResult::fail("test", &format!("Error: {}", e)),
    }
}

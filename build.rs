use std::env;

/// Forward an optional environment variable to the compiler, falling back to `default`.
fn forward(name: &str, default: &str) {
    println!("cargo:rerun-if-env-changed={}", name);
    match env::var(name) {
        Ok(value) => {
            println!("cargo:rustc-env={}={}", name, value);
            println!("cargo:warning=Using {} from environment: {}", name, value);
        }
        Err(_) => println!("cargo:rustc-env={}={}", name, default),
    }
}

fn main() {
    // Task periods in scheduler ticks (milliseconds)
    forward("DAQ_TELEMETRY_PERIOD_MS", "500");
    forward("DAQ_COMMAND_POLL_MS", "20");
    forward("DAQ_MOCK_PERIOD_MS", "500");

    // Serial links
    forward("DAQ_RADIO_BAUD", "57600");
    forward("DAQ_CONSOLE_BAUD", "115200");
}

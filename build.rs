fn main() {
    // Load .env file for LoRaWAN identity configuration
    load_env_config();

    // The host build (unit and integration tests) links against std and needs
    // none of the ESP linker scripts.
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch == "riscv32" {
        linker_be_nice();
        // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
        println!("cargo:rustc-link-arg=-Tlinkall.x");
    }
}

/// Hex-encoded keys and identifiers, with their length in bytes
const HEX_VARS: [(&str, usize); 6] = [
    ("LORA_DEV_EUI", 8),
    ("LORA_APP_EUI", 8),
    ("LORA_APP_KEY", 16),
    ("LORA_APPS_KEY", 16),
    ("LORA_NWKS_KEY", 16),
    ("LORA_DEV_ADDR", 4),
];

/// Small decimal settings with their fallback value
const NUMBER_VARS: [(&str, u8); 3] = [
    ("LORA_NETWORK_MODE", 1),
    ("LORA_REGION", 4),
    ("LORA_JOIN_OTAA", 1),
];

/// Load environment configuration from .env file
/// Environment variables take priority over .env file values
fn load_env_config() {
    use std::path::Path;

    // Tell cargo to rerun this build script if .env file changes
    println!("cargo:rerun-if-changed=.env");

    for (name, _) in HEX_VARS {
        println!("cargo:rerun-if-env-changed={}", name);
    }
    for (name, _) in NUMBER_VARS {
        println!("cargo:rerun-if-env-changed={}", name);
    }

    // Try to load .env file if it exists
    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    for (name, len) in HEX_VARS {
        let value = read_var(name);
        let valid = value.len() == len * 2 && value.chars().all(|c| c.is_ascii_hexdigit());

        let value = if valid {
            value.to_ascii_uppercase()
        } else {
            if !value.is_empty() {
                println!(
                    "cargo:warning={} must be {} hex characters, got {:?} - using zeros",
                    name,
                    len * 2,
                    value
                );
            }
            "0".repeat(len * 2)
        };
        println!("cargo:rustc-env={}={}", name, value);
    }

    for (name, fallback) in NUMBER_VARS {
        let value = read_var(name);
        let number = match value.parse::<u8>() {
            Ok(number) => number,
            Err(_) => {
                if !value.is_empty() {
                    println!(
                        "cargo:warning={} is not a number ({:?}) - using {}",
                        name, value, fallback
                    );
                }
                fallback
            }
        };
        println!("cargo:rustc-env={}={}", name, number);
    }

    if read_var("LORA_DEV_EUI").is_empty() {
        println!("cargo:warning=LORA_DEV_EUI is empty - device identity will be all zeros");
    }
}

fn read_var(name: &str) -> String {
    // Note: We need to handle the case where env vars are set to empty strings
    std::env::var(name)
        .unwrap_or_else(|_| String::new())
        .trim()
        .to_string()
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_defmt_timestamp" => {
                    eprintln!();
                    eprintln!("💡 `defmt` not found - make sure `defmt.x` is added as a linker script and you have included `use defmt_rtt as _;`");
                    eprintln!();
                }
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    println!(
        "cargo:rustc-link-arg=--error-handling-script={}",
        std::env::current_exe().unwrap().display()
    );
}

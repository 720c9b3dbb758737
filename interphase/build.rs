use std::path::Path;
use std::{env, fs};

use const_gen::*;
use serde::Deserialize;

/// `keyboard.toml` layout understood by the build script. Every field is optional.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct KeyboardTomlConfig {
    #[serde(default)]
    radio: RadioToml,
    #[serde(default)]
    schedule: ScheduleToml,
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RadioToml {
    max_tx_attempts: u16,
    base_address_0: u32,
    base_address_1: u32,
    left_pipe: u8,
    right_pipe: u8,
}

impl Default for RadioToml {
    fn default() -> Self {
        Self {
            max_tx_attempts: 100,
            base_address_0: 0x0102_0304,
            base_address_1: 0x0506_0708,
            left_pipe: 0,
            right_pipe: 1,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ScheduleToml {
    maintenance_hz: u32,
    continuous_min_interval_us: u64,
    poll_interval_ms: u64,
}

impl Default for ScheduleToml {
    fn default() -> Self {
        Self {
            maintenance_hz: 8,
            continuous_min_interval_us: 0,
            poll_interval_ms: 10,
        }
    }
}

fn main() {
    // Ensure build.rs is re-run when files change
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=KEYBOARD_TOML_PATH");

    // Read keyboard.toml if it's present
    let user_config_str = if let Ok(toml_path) = env::var("KEYBOARD_TOML_PATH") {
        println!("cargo:rerun-if-changed={toml_path}");
        fs::read_to_string(&toml_path).expect("Failed to read user config file")
    } else {
        "".to_string()
    };

    let user_toml: KeyboardTomlConfig =
        toml::from_str(&user_config_str).expect("Failed to parse KEYBOARD_TOML_PATH file\n");

    if user_toml.schedule.maintenance_hz == 0 {
        panic!("schedule.maintenance_hz must be greater than 0");
    }
    if user_toml.radio.left_pipe > 7 || user_toml.radio.right_pipe > 7 {
        panic!("radio pipes must be in 0..=7");
    }

    let constants = get_constants_str(&user_toml);

    // Write to constants.rs file
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("constants.rs");
    fs::write(&dest_path, constants).expect("Failed to write constants.rs file");
}

fn get_constants_str(config: &KeyboardTomlConfig) -> String {
    let radio = &config.radio;
    let schedule = &config.schedule;
    let constant_strs = vec![
        const_declaration!(pub(crate) MAX_TX_ATTEMPTS = radio.max_tx_attempts),
        format!("pub(crate) const BASE_ADDRESS_0: u32 = {:#010x};\n", radio.base_address_0),
        format!("pub(crate) const BASE_ADDRESS_1: u32 = {:#010x};\n", radio.base_address_1),
        const_declaration!(pub(crate) LEFT_PIPE = radio.left_pipe),
        const_declaration!(pub(crate) RIGHT_PIPE = radio.right_pipe),
        const_declaration!(pub(crate) MAINTENANCE_HZ = schedule.maintenance_hz),
        const_declaration!(pub(crate) CONTINUOUS_MIN_INTERVAL_US = schedule.continuous_min_interval_us),
        const_declaration!(pub(crate) POLL_INTERVAL_MS = schedule.poll_interval_ms),
    ];

    constant_strs
        .into_iter()
        .map(|s| "#[allow(clippy::redundant_static_lifetimes)]\n".to_owned() + s.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

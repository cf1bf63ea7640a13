use std::env;
use std::fs;
use std::path::Path;

// 把 .env 中的变量转发为编译期环境变量，供 option_env! 读取
fn main() {
    let env_file = Path::new(".env");

    if env_file.exists() {
        println!("cargo:rerun-if-changed=.env");

        if let Ok(contents) = fs::read_to_string(env_file) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"');

                    // 已经设置的环境变量优先
                    if env::var(key).is_err() {
                        println!("cargo:rustc-env={}={}", key, value);
                    }
                }
            }
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
    for key in [
        "API_BASE_URL",
        "MEDIA_PORT",
        "DEV_PORTS",
        "INACTIVITY_TIMEOUT_MS",
        "SCANNER_START_DELAY_MS",
        "FORM_RESET_DELAY_MS",
        "DEFAULT_RETENTION_DAYS",
        "ENVIRONMENT",
    ] {
        println!("cargo:rerun-if-env-changed={}", key);
    }
}

use std::env;

fn main() {
    // Local timezone offset applied to GNSS UTC timestamps, in whole hours.
    // Read from the environment at build time so deployments in other
    // timezones do not need a source change.
    if let Ok(offset) = env::var("AIRMON_TZ_OFFSET_HOURS") {
        println!("cargo:rustc-env=AIRMON_TZ_OFFSET_HOURS={}", offset);
        println!(
            "cargo:warning=Using AIRMON_TZ_OFFSET_HOURS from environment: {}",
            offset
        );
    } else {
        println!("cargo:rustc-env=AIRMON_TZ_OFFSET_HOURS=8");
    }

    println!("cargo:rerun-if-env-changed=AIRMON_TZ_OFFSET_HOURS");
}

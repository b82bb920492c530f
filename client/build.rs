//! Stamps the binary with the commit and time it was built from

use std::process::Command;

use chrono::Utc;

const UNKNOWN: &str = "unknown";

/// Short commit hash. `VMLAB_GIT_HASH` wins so packagers building from a
/// source archive can supply it; outside a checkout git exits non-zero and
/// its empty output must not be taken as a hash.
fn git_hash() -> String {
    if let Some(hash) = std::env::var("VMLAB_GIT_HASH")
        .ok()
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
    {
        return hash;
    }

    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|stdout| stdout.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", git_hash());
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );

    println!("cargo:rerun-if-env-changed=VMLAB_GIT_HASH");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}

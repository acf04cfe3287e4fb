use std::process::Command;

fn main() {
    let version = get_version();
    println!("cargo:rustc-env=PACSMITH_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn get_version() -> String {
    if let Some(version) = git(&["describe", "--tags", "--always", "--dirty"]) {
        return version;
    }

    if let Some(commit) = git(&["rev-parse", "--short", "HEAD"]) {
        return format!("{}-{}", env!("CARGO_PKG_VERSION"), commit);
    }

    env!("CARGO_PKG_VERSION").to_string()
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

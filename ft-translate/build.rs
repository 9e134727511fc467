use std::{env, process::Command};

const TAG_KEY: &str = "FT_BUILD_GIT_TAG";
const COMMIT_KEY: &str = "FT_BUILD_GIT_COMMIT";
const DIRTY_KEY: &str = "FT_BUILD_GIT_DIRTY";

fn main() {
    for key in [TAG_KEY, COMMIT_KEY, DIRTY_KEY] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    let tag = env_or(TAG_KEY, || {
        git(&["describe", "--tags", "--exact-match"]).unwrap_or_else(|| "untagged".to_string())
    });
    let commit = env_or(COMMIT_KEY, || {
        git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".to_string())
    });
    let dirty = env_or(DIRTY_KEY, || {
        git(&["status", "--porcelain", "--untracked-files=no"])
            .is_some_and(|changes| !changes.is_empty())
            .to_string()
    });

    for (key, value) in [(TAG_KEY, tag), (COMMIT_KEY, commit), (DIRTY_KEY, dirty)] {
        println!("cargo:rustc-env={key}={value}");
    }
}

fn env_or(key: &str, fallback: impl FnOnce() -> String) -> String {
    env::var(key).unwrap_or_else(|_| fallback())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

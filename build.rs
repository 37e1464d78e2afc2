extern crate time;

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

fn main() {
    write_git_rev();
    write_compile_date();
}

/// Write the current git hash to ${OUT_DIR}/git-commit so `--version` can
/// show it. Builds outside a git checkout get "unknown commit".
fn write_git_rev() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dst_path = Path::new(&out_dir).join("git-commit");
    let mut f = File::create(&dst_path).unwrap();

    let rev = git(&["rev-parse", "--short", "HEAD"]);
    let status = git(&["status", "--porcelain"]);

    match (rev, status) {
        (Some(hash), Some(changes)) => {
            if !changes.is_empty() {
                f.write_all(b"WIP ").unwrap();
            }
            f.write_all(hash.trim().as_bytes()).unwrap();
        }
        _ => f.write_all(b"unknown commit").unwrap(),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

fn write_compile_date() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dst_path = Path::new(&out_dir).join("compile-date");
    let mut f = File::create(&dst_path).unwrap();

    let now = time::now_utc();
    let date = time::strftime("%Y-%m-%d", &now).unwrap();

    f.write_all(date.as_bytes()).unwrap();
}

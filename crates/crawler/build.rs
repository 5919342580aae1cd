use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=CCRAWLER_GIT_COMMIT");
    if std::path::Path::new("../../.git/HEAD").exists() {
        println!("cargo:rerun-if-changed=../../.git/HEAD");
    }

    // explicit env wins; otherwise ask git, and stay quiet outside a checkout
    if std::env::var("CCRAWLER_GIT_COMMIT").is_ok() {
        return;
    }
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output();
    if let Ok(output) = output {
        if output.status.success() {
            let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !commit.is_empty() {
                println!("cargo:rustc-env=CCRAWLER_GIT_COMMIT={}", commit);
            }
        }
    }
}

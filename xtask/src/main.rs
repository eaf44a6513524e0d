use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

fn repo_root() -> PathBuf {
    let xtask_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    xtask_dir
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or(xtask_dir)
}

fn run(cmd: &str, args: &[&str]) -> Result<(), String> {
    let status = Command::new(cmd)
        .args(args)
        .current_dir(repo_root())
        .status()
        .map_err(|e| format!("failed to spawn {cmd}: {e}"))?;
    if !status.success() {
        return Err(format!("command failed: {} {}", cmd, args.join(" ")));
    }
    Ok(())
}

/// Runs `cargo run` against the zipswarm binary and captures stdout.
fn zipswarm_output(args: &[&str]) -> Result<Vec<u8>, String> {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--bin", "zipswarm", "--"])
        .args(args)
        .current_dir(repo_root())
        .output()
        .map_err(|e| format!("failed to spawn cargo: {e}"))?;
    if !output.status.success() {
        return Err(format!(
            "zipswarm {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(output.stdout)
}

fn print_usage() {
    eprintln!("xtask usage:\n  cargo xtask ci\n  cargo xtask dist\n  cargo xtask help");
}

fn main() -> ExitCode {
    let cmd = env::args().nth(1).unwrap_or_else(|| "help".to_string());

    let res = match cmd.as_str() {
        "ci" => task_ci(),
        "dist" => task_dist(),
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("unknown subcommand: {other}\n");
            print_usage();
            Err("unknown subcommand".into())
        }
    };

    match res {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

fn task_ci() -> Result<(), String> {
    println!("🤖 Running CI checks (fmt, clippy, test)...");
    run("cargo", &["fmt", "--", "--check"])?;
    run("cargo", &["clippy", "--all-targets", "--", "-D", "warnings"])?;
    run("cargo", &["test"])?;
    println!("✅ CI checks passed");
    Ok(())
}

/// Writes shell completions and the man page into `dist/`.
fn task_dist() -> Result<(), String> {
    let dist = repo_root().join("dist");
    fs::create_dir_all(dist.join("completions")).map_err(|e| e.to_string())?;

    for (shell, file) in [
        ("bash", "zipswarm.bash"),
        ("zsh", "_zipswarm"),
        ("fish", "zipswarm.fish"),
    ] {
        let script = zipswarm_output(&["completions", shell])?;
        fs::write(dist.join("completions").join(file), script).map_err(|e| e.to_string())?;
    }

    let man = zipswarm_output(&["man"])?;
    fs::write(dist.join("zipswarm.1"), man).map_err(|e| e.to_string())?;

    println!("📦 Wrote completions and man page to {}", dist.display());
    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for crt-pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks (fmt, clippy, build, test)
    Ci {
        #[arg(long)]
        verbose: bool,
    },
    /// Quick checks before commit (fmt, clippy)
    Check {
        #[arg(long)]
        verbose: bool,
    },
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Build the project
    Build {
        #[arg(long)]
        release: bool,
        /// Build without the wgpu/winit backend
        #[arg(long)]
        headless: bool,
    },
    /// Run tests
    Test {
        #[arg(long)]
        doc: bool,
        #[arg(long)]
        ignored: bool,
        /// Run only upscale factor tests (unit and property)
        #[arg(long)]
        upscale: bool,
        /// Run only pipeline lifecycle and presentation tests
        #[arg(long)]
        pipeline: bool,
        /// Run only render backend tests
        #[arg(long)]
        backend: bool,
        /// Number of cases per property test
        #[arg(long)]
        cases: Option<u32>,
    },
    /// Run benchmarks
    Bench {
        /// Run a single benchmark target (present_bench, upscale_bench)
        #[arg(long)]
        name: Option<String>,
    },
    /// Open the demo window
    Run {
        /// Build in release mode
        #[arg(long)]
        release: bool,
        /// Log filter passed through RUST_LOG
        #[arg(long, default_value = "info")]
        log: String,
    },
    /// Pre-commit hook (fmt, clippy, test)
    PreCommit,
    /// Install git hooks
    InstallHooks,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { verbose } => run_ci(verbose),
        Commands::Check { verbose } => run_check(verbose),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Build { release, headless } => run_build(release, headless),
        Commands::Test {
            doc,
            ignored,
            upscale,
            pipeline,
            backend,
            cases,
        } => run_test(
            doc,
            ignored,
            TestFilter {
                upscale,
                pipeline,
                backend,
            },
            cases,
        ),
        Commands::Bench { name } => run_bench(name.as_deref()),
        Commands::Run { release, log } => run_demo(release, &log),
        Commands::PreCommit => run_pre_commit(),
        Commands::InstallHooks => install_hooks(),
    }
}

/// Test groups selected on the command line
#[derive(Clone, Copy, Default)]
struct TestFilter {
    upscale: bool,
    pipeline: bool,
    backend: bool,
}

impl TestFilter {
    fn any(&self) -> bool {
        self.upscale || self.pipeline || self.backend
    }
}

/// One cargo test invocation
enum TestTarget {
    /// Library unit tests whose path matches a module name
    Lib(&'static str),
    /// A file under tests/
    Integration(&'static str),
}

/// Build without the windowing stack under CI
fn headless_ci() -> bool {
    std::env::var("CI").is_ok()
}

fn feature_args(cmd: &mut Command, headless: bool) {
    if headless {
        cmd.arg("--no-default-features");
    } else {
        cmd.arg("--all-features");
    }
}

fn run_ci(verbose: bool) -> Result<()> {
    println!("{}", "=== Running CI Pipeline ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;
    run_task("Build", || run_build(false, headless_ci()), verbose)?;
    run_task(
        "Build (headless)",
        || run_build(false, true),
        verbose,
    )?;
    run_task(
        "Test",
        || run_test(false, false, TestFilter::default(), None),
        verbose,
    )?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ CI passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_check(verbose: bool) -> Result<()> {
    println!("{}", "=== Running Quick Checks ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ Checks passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("fmt").arg("--all");

    if check {
        cmd.arg("--").arg("--check");
    }

    execute_command(&mut cmd)
}

fn run_clippy(fix: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("clippy").arg("--all-targets");

    feature_args(&mut cmd, headless_ci());

    if fix {
        cmd.arg("--fix");
    } else {
        cmd.arg("--").arg("-D").arg("warnings");
    }

    execute_command(&mut cmd)
}

fn run_build(release: bool, headless: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("build");

    if headless {
        cmd.arg("--no-default-features");
    }

    if release {
        cmd.arg("--release");
    }

    execute_command(&mut cmd)
}

fn run_test(doc: bool, ignored: bool, filter: TestFilter, cases: Option<u32>) -> Result<()> {
    let headless = headless_ci();

    let cargo_test = || {
        let mut cmd = Command::new("cargo");
        cmd.arg("test");
        feature_args(&mut cmd, headless);
        if let Some(cases) = cases {
            cmd.env("PROPTEST_CASES", cases.to_string());
        }
        cmd
    };

    if doc {
        let mut cmd = cargo_test();
        cmd.arg("--doc");

        if ignored {
            cmd.arg("--").arg("--ignored");
        }

        return execute_command(&mut cmd);
    }

    if !filter.any() {
        // Run all tests
        let mut cmd = cargo_test();

        if ignored {
            cmd.arg("--").arg("--ignored");
        }

        return execute_command(&mut cmd);
    }

    let groups: [(bool, &str, &[TestTarget]); 3] = [
        (
            filter.upscale,
            "Upscale",
            &[
                TestTarget::Lib("upscale"),
                TestTarget::Integration("upscale_properties"),
            ],
        ),
        (
            filter.pipeline,
            "Pipeline",
            &[
                TestTarget::Lib("pipeline"),
                TestTarget::Integration("pipeline_lifecycle"),
                TestTarget::Integration("present_frame"),
            ],
        ),
        (filter.backend, "Backend", &[TestTarget::Lib("backend")]),
    ];
    let group_count = groups.iter().filter(|(enabled, _, _)| *enabled).count();

    let mut all_success = true;

    for (enabled, group_name, targets) in groups {
        if !enabled {
            continue;
        }

        println!("{} Running {} tests...", "→".blue(), group_name.bold());

        let mut group_result = Ok(());
        for target in targets {
            let mut cmd = cargo_test();
            match target {
                TestTarget::Lib(module) => cmd.arg("--lib").arg(module),
                TestTarget::Integration(name) => cmd.arg("--test").arg(name),
            };
            if ignored {
                cmd.arg("--").arg("--ignored");
            }

            if let Err(e) = execute_command(&mut cmd) {
                group_result = Err(e);
                break;
            }
        }

        match group_result {
            Ok(()) => {
                println!("{} {} tests passed\n", "✓".green(), group_name);
            }
            Err(e) => {
                println!("{} {} tests failed\n", "✗".red(), group_name);
                all_success = false;
                if group_count == 1 {
                    // If only one group was requested, return the error immediately
                    return Err(e);
                }
            }
        }
    }

    if all_success {
        Ok(())
    } else {
        anyhow::bail!("Some test groups failed")
    }
}

fn run_bench(name: Option<&str>) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("bench");

    if let Some(name) = name {
        cmd.arg("--bench").arg(name);
    }

    execute_command(&mut cmd)
}

fn run_demo(release: bool, log: &str) -> Result<()> {
    println!("{}", "=== Demo Window ===".bold().blue());
    println!(
        "{} Build mode: {}",
        "→".blue(),
        if release {
            "release".green().bold()
        } else {
            "debug".yellow().bold()
        }
    );
    println!("{} RUST_LOG={}", "→".blue(), log.cyan());
    println!(
        "{} F11 or Alt+Enter toggles fullscreen, Escape quits",
        "ℹ".blue()
    );
    println!();

    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("run");

    if release {
        cmd.arg("--release");
    }

    let status = cmd
        .env("RUST_LOG", log)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        println!("\n{} Demo exited with an error", "✗".red().bold());
        anyhow::bail!("Demo failed with exit code: {}", status);
    }

    let elapsed = start.elapsed();
    println!(
        "\n{} Demo closed after {}",
        "✓".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn run_pre_commit() -> Result<()> {
    println!("{}", "=== Pre-commit Checks ===".bold().blue());

    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), false)?;
    run_task("Clippy", || run_clippy(false), false)?;
    run_task(
        "Test",
        || run_test(false, false, TestFilter::default(), None),
        false,
    )?;

    let elapsed = start.elapsed();
    println!(
        "\n{} {}",
        "✓ Pre-commit checks passed in".green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).bold()
    );

    Ok(())
}

fn install_hooks() -> Result<()> {
    use std::fs;

    println!("{}", "Installing git hooks...".bold());

    let hook_content = r#"#!/bin/sh
# Auto-generated by cargo x install-hooks
set -e

echo "Running pre-commit checks..."
cargo x pre-commit
"#;

    let hook_path = ".git/hooks/pre-commit";
    fs::write(hook_path, hook_content)?;

    // Make executable (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(hook_path, perms)?;
    }

    println!("{}", "✓ Git hooks installed".green());
    println!("  Pre-commit hook will run: fmt, clippy, test");

    Ok(())
}

fn run_task<F>(name: &str, task: F, verbose: bool) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    print!("{} {} ... ", "→".blue(), name);

    let start = Instant::now();

    match task() {
        Ok(_) => {
            let elapsed = start.elapsed();
            println!(
                "{} {}",
                "✓".green().bold(),
                if verbose {
                    format!("({:.2}s)", elapsed.as_secs_f64())
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", "✗".red().bold());
            Err(e)
        }
    }
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("Command failed with exit code: {}", status);
    }

    Ok(())
}

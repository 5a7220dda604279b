use anyhow::Result;
use ksynth::cli;
use ksynth::error::exit_code_for;
use ksynth::orchestrator;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cwd = std::env::current_dir().unwrap_or_default();

    if let Err(e) = run(&args, cwd) {
        eprintln!("error: {:#}", e);
        eprintln!("\n{}", cli::usage());
        std::process::exit(exit_code_for(&e));
    }
}

fn run(args: &[String], cwd: std::path::PathBuf) -> Result<()> {
    let invocation = cli::parse(args, cwd)?;
    if invocation.cu_paths.is_empty() && args.iter().any(|a| a == "--version") {
        return Ok(());
    }
    orchestrator::run(&invocation)?;
    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use phase_life_cli::{
    benchmark, format_summary, init_tracing, load_config, run, write_outputs, BENCHMARK_TURNS,
    WARMUP_TURNS,
};
use phase_life_core::SimConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phase-life")]
#[command(about = "Phase-life cellular simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation from a config file
    Run {
        /// Path to config file (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Output directory for results (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of turns to run (defaults to the config's `turns`)
        #[arg(long)]
        turns: Option<usize>,

        /// Record metrics every N turns
        #[arg(long, default_value_t = 100)]
        sample_every: usize,
    },
    /// Time turns on a range of grid sizes
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&SimConfig::default())?);
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p phase-life-cli --release -- benchmark");
                eprintln!();
            }
            println!("Warmup: {WARMUP_TURNS} turns, Benchmark: {BENCHMARK_TURNS} turns");
            for grid_size in [25, 50, 100, 200] {
                let result = benchmark(grid_size, 42, BENCHMARK_TURNS)?;
                println!(
                    "--- {0}x{0} grid, {1} cells ---",
                    result.grid_size, result.initial_cells
                );
                println!(
                    "  Avg turn:      {:.0} us ({:.1} turns/sec)",
                    result.avg_turn_us, result.turns_per_sec
                );
                println!("  Alive at end:  {}", result.final_alive);
                println!();
            }
        }
        Commands::Run {
            config,
            out,
            turns,
            sample_every,
        } => {
            let sim_config = load_config(&config)?;
            println!("Loaded config from {:?}", config);
            let output = run(sim_config, turns, sample_every)?;
            println!("{}", format_summary(&output));
            if let Some(out_dir) = out {
                write_outputs(&out_dir, &output)?;
                println!("Results saved to {:?}", out_dir);
            }
        }
    }
    Ok(())
}

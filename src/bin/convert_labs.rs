//! Convert a CSV of lab values from the command line
//! Usage: cargo run --bin convert_labs -- <input.csv> [output.csv]

use labconv::config::Config;
use labconv::tools::batch::convert_csv_file;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(labconv::config::DEFAULT_LOG_DIRECTIVE.parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let input = match args.get(1) {
        Some(path) => path.as_str(),
        None => {
            eprintln!("Usage: convert_labs <input.csv> [output.csv]");
            std::process::exit(2);
        }
    };
    let output = args.get(2).map(|s| s.as_str());

    let config = Config::from_env();
    let table = config.load_table()?;

    let resp = convert_csv_file(&table, input, output, config.output_dir.as_deref())?;
    if !resp.success {
        eprintln!("Error: {}", resp.message);
        std::process::exit(1);
    }

    println!("{}", resp.message);
    if let Some(path) = &resp.output_path {
        println!("Output: {}", path);
    }
    for row in &resp.failures {
        println!(
            "  Row {}: {} {} {} -> {}",
            row.row,
            row.lab,
            row.value,
            row.unit,
            row.outcome.unit_cell()
        );
    }

    Ok(())
}

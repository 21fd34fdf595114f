//! Lab Value Converter (labconv)
//!
//! An MCP server for converting lab test results between units.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use labconv::build_info;
use labconv::config::{Config, DEFAULT_LOG_DIRECTIVE};
use labconv::mcp::LabconvService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Log to stderr so stdout stays free for MCP stdio
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(DEFAULT_LOG_DIRECTIVE.parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    // Read configuration from the environment
    let config = Config::from_env();
    eprintln!("Conversion table: {}", config.table_source());
    if let Some(dir) = &config.output_dir {
        eprintln!("CSV output directory: {}", dir.display());
    }

    // Load and validate the conversion table before serving anything
    let table = config.load_table()?;
    eprintln!("Loaded {} lab conversions", table.len());

    // Create the labconv service
    let service = LabconvService::new(&config, table);

    // Create stdio transport
    let transport = (stdin(), stdout());

    // Start the MCP server
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}

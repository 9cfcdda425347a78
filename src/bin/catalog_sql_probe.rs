use std::num::NonZeroUsize;

use catalog_sql::prelude::*;
use clap::Parser;
use tracing::Level;

/// Run one catalog query through the cursor layer and print the rows.
#[derive(Parser, Debug)]
#[command(name = "catalog-sql-probe", version)]
struct Cli {
    #[command(flatten)]
    connect: ConnectParams,

    /// SQL with `?` placeholders
    sql: String,

    /// Bind value for the next `?`; repeat in placeholder order
    #[arg(long = "bind")]
    binds: Vec<String>,

    /// Fetch this many rows per round-trip instead of everything at once
    #[arg(long)]
    page_size: Option<NonZeroUsize>,

    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let conn = PgConnection::connect(&cli.connect).await?;
    let mut session = CatalogSession::new(conn);

    let (handle, mut step) = match cli.page_size {
        Some(page_size) => {
            session
                .open_paged_query(cli.sql.clone(), cli.binds.clone(), 0, page_size)
                .await?
        }
        None => session.open_query(cli.sql.clone(), cli.binds.clone()).await?,
    };

    let mut header_printed = false;
    let mut printed = 0usize;
    while step == CursorStep::HasRow {
        let cursor = session.cursor(handle)?;
        if !header_printed {
            let names: Vec<&str> = (0..cursor.column_count())
                .filter_map(|i| cursor.column_name(i))
                .collect();
            println!("{}", names.join("\t"));
            header_printed = true;
        }
        if let Some(row) = cursor.current_row() {
            let values: Vec<String> = (0..row.len())
                .filter_map(|i| row.get_text(i))
                .collect();
            println!("{}", values.join("\t"));
            printed += 1;
        }
        step = session.advance(handle).await?;
    }
    tracing::info!(rows = printed, "done");

    session.free_cursor(handle)?;
    session.into_backend().disconnect().await?;
    Ok(())
}

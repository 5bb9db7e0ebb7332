use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use zekke_cli::args::{parse_coordinate, parse_radius};
use zekke_cli::output::{render_names, render_place, render_places, render_route, OutputFormat};
use zekke_lib::{
    import_csv_files, resolve_database_path, AreaQuery, Coordinate, Geocoder, RouteFinder,
    RouteFinderOptions, SqliteGateway, DEFAULT_AREA_LIMIT, POSITION_TOLERANCE_METERS,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "ZeKKe geocoder and route finder")]
struct Cli {
    /// Place database (defaults to ZEKKE_DATABASE_PATH, then the platform data directory).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database from place and path CSV files.
    Import {
        /// CSV with header id,name,latitude,longitude.
        #[arg(long)]
        places: PathBuf,
        /// CSV with header from,to,distance[,bidirectional].
        #[arg(long)]
        paths: PathBuf,
        /// Replace an existing database file.
        #[arg(long)]
        force: bool,
    },
    /// Shortest route between two coordinates.
    Route {
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        from: Coordinate,
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: Coordinate,
        /// Load the whole graph into memory before searching.
        #[arg(long)]
        preload: bool,
    },
    /// Place at a coordinate, or the nearest one within the position tolerance.
    Locate {
        #[arg(value_parser = parse_coordinate, allow_hyphen_values = true)]
        position: Coordinate,
    },
    /// Places whose name contains NAME.
    Search {
        name: String,
        /// Suggestions to offer when nothing matches.
        #[arg(long, default_value_t = 5)]
        suggestions: usize,
    },
    /// Names matching NAME within a radius, nearest first.
    Nearby {
        name: String,
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        center: Coordinate,
        /// Radius in meters.
        #[arg(long, value_parser = parse_radius)]
        radius: f64,
        #[arg(long, default_value_t = DEFAULT_AREA_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let database = resolve_database_path(cli.database.as_deref())
        .context("failed to resolve the place database location")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Import {
            places,
            paths,
            force,
        } => handle_import(&database, &places, &paths, force, &mut out),
        Command::Route { from, to, preload } => {
            handle_route(&database, &from, &to, preload, cli.format, &mut out)
        }
        Command::Locate { position } => handle_locate(&database, &position, cli.format, &mut out),
        Command::Search { name, suggestions } => {
            handle_search(&database, &name, suggestions, cli.format, &mut out)
        }
        Command::Nearby {
            name,
            center,
            radius,
            limit,
            offset,
        } => {
            let query = AreaQuery::new(name, center, radius).with_page(offset, limit);
            handle_nearby(&database, &query, cli.format, &mut out)
        }
    }
}

fn open_gateway(database: &Path) -> Result<SqliteGateway> {
    SqliteGateway::open(database)
        .with_context(|| format!("failed to open place database {}", database.display()))
}

fn handle_import(
    database: &Path,
    places: &Path,
    paths: &Path,
    force: bool,
    out: &mut impl Write,
) -> Result<()> {
    let graph = import_csv_files(places, paths).with_context(|| {
        format!(
            "failed to import {} and {}",
            places.display(),
            paths.display()
        )
    })?;

    if database.exists() {
        if !force {
            bail!(
                "database {} already exists; pass --force to replace it",
                database.display()
            );
        }
        fs::remove_file(database)
            .with_context(|| format!("failed to remove {}", database.display()))?;
    }

    let gateway = SqliteGateway::create(database)
        .with_context(|| format!("failed to create {}", database.display()))?;
    gateway
        .insert_graph(&graph)
        .context("failed to store the imported graph")?;
    info!(path = %database.display(), "import complete");

    writeln!(
        out,
        "Imported {} places and {} paths into {}",
        graph.len(),
        graph.path_count(),
        database.display()
    )?;
    Ok(())
}

fn handle_route(
    database: &Path,
    from: &Coordinate,
    to: &Coordinate,
    preload: bool,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let gateway = open_gateway(database)?;
    let finder = RouteFinder::with_options(
        gateway,
        RouteFinderOptions {
            preload,
            require_symmetric: false,
        },
    );
    let route = finder
        .find_route(from, to)
        .with_context(|| format!("no route from {from} to {to}"))?;
    render_route(out, &route, format)?;
    Ok(())
}

fn handle_locate(
    database: &Path,
    position: &Coordinate,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let geocoder = Geocoder::new(open_gateway(database)?);
    let Some(place) = geocoder.find_by_position(position)? else {
        bail!(
            "no place within {} m of {}",
            POSITION_TOLERANCE_METERS,
            position
        );
    };
    render_place(out, &place, format)?;
    Ok(())
}

fn handle_search(
    database: &Path,
    name: &str,
    suggestions: usize,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let geocoder = Geocoder::new(open_gateway(database)?);
    let places = geocoder.require_like_name(name, suggestions)?;
    render_places(out, &places, format)?;
    Ok(())
}

fn handle_nearby(
    database: &Path,
    query: &AreaQuery,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let geocoder = Geocoder::new(open_gateway(database)?);
    let names = geocoder.find_names_in_area_like_name(query)?;
    render_names(out, &names, format)?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

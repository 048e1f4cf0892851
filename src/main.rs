use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use amenity_finder::amenities::load_dataset;
use amenity_finder::location::{resolve_location, LocationInput, PlaceCatalog, DEFAULT_ORIGIN};
use amenity_finder::overpass::NetworkType;
use amenity_finder::presentation::{map_layers_string, render_table};
use amenity_finder::route::RoutingMode;
use amenity_finder::search::DistanceMetric;
use amenity_finder::{AmenityCategory, AmenityFinder, SearchRequest, Settings};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Find amenities around a location and route to each of them"
)]
struct Args {
    /// Location as "latitude,longitude"
    #[arg(long, conflicts_with = "place")]
    location: Option<String>,

    /// Name of a place from the catalog
    #[arg(long)]
    place: Option<String>,

    /// JSON catalog of places: [{"name": ..., "location": "lat,lon", "url": ...}]
    #[arg(long, conflicts_with = "catalog_url")]
    catalog: Option<PathBuf>,

    /// Fetch the catalog of places from this URL instead
    #[arg(long)]
    catalog_url: Option<String>,

    /// List the catalog's places and exit
    #[arg(long)]
    list_places: bool,

    /// Search radius in meters (500-2000, snapped to steps of 100)
    #[arg(long)]
    radius: Option<f64>,

    /// Amenity categories to look for; all of them when omitted
    #[arg(long = "amenity", value_delimiter = ',')]
    amenities: Vec<AmenityCategory>,

    /// Static JSON dataset of amenities instead of querying Overpass
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// How routes are produced: straight or network
    #[arg(long, default_value = "network")]
    routing: RoutingMode,

    /// Distance metric for the radius filter: haversine or planar
    #[arg(long, default_value = "haversine")]
    metric: DistanceMetric,

    /// Street network used for routing
    #[arg(long, default_value = "walk", value_parser = parse_network_type)]
    network: NetworkType,

    /// Write the map layers as GeoJSON to this file
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Overpass interpreter endpoint, overriding $OVERPASS_URL
    #[arg(long)]
    overpass_url: Option<String>,

    /// Per-amenity routing timeout
    #[arg(long, default_value_t = 10)]
    route_timeout_secs: u64,
}

fn parse_network_type(s: &str) -> Result<NetworkType, String> {
    s.parse().map_err(|err| format!("{err}"))
}

impl Args {
    fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(url) = &self.overpass_url {
            settings.overpass_url = url.clone();
        }
        settings.routing = self.routing;
        settings.metric = self.metric;
        settings.network_type = self.network;
        settings.route_timeout = Duration::from_secs(self.route_timeout_secs);
        settings
    }

    async fn catalog(
        &self,
        settings: &Settings,
    ) -> Result<PlaceCatalog, Box<dyn std::error::Error>> {
        Ok(match (&self.catalog, &self.catalog_url) {
            (Some(path), _) => PlaceCatalog::from_file(path)?,
            (None, Some(url)) => PlaceCatalog::fetch(url, settings.overpass_timeout).await?,
            (None, None) => PlaceCatalog::default(),
        })
    }

    fn categories(&self) -> Vec<AmenityCategory> {
        if self.amenities.is_empty() {
            AmenityCategory::ALL.to_vec()
        } else {
            self.amenities.clone()
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = args.settings();
    let catalog = args.catalog(&settings).await?;

    if args.list_places {
        for name in catalog.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let origin = match (&args.location, &args.place) {
        (Some(text), _) => resolve_location(&LocationInput::Manual(text.clone()), &catalog)?,
        (None, Some(name)) => resolve_location(&LocationInput::Predefined(name.clone()), &catalog)?,
        (None, None) => DEFAULT_ORIGIN,
    };
    let listing_url = args
        .place
        .as_deref()
        .and_then(|name| catalog.listing_url(name));

    let requested = args.radius.unwrap_or(settings.radius.default);
    let radius_m = settings.radius.snap(requested);
    if radius_m != requested {
        tracing::info!(requested, radius_m, "radius snapped to slider range");
    }

    let request = SearchRequest::new(origin, radius_m, args.categories());
    tracing::info!(%origin, radius_m, categories = request.categories.len(), "searching");

    let finder = AmenityFinder::new(settings);
    let result = match &args.dataset {
        Some(path) => {
            let dataset = load_dataset(path)?;
            finder.search_dataset(&request, &dataset).await
        }
        None => finder.search_overpass(&request).await?,
    };

    if let Some(path) = &args.geojson {
        std::fs::write(path, map_layers_string(&result, listing_url))?;
        tracing::info!("wrote map layers to {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_table(&result));
        if let Some(url) = listing_url {
            println!("\nView listing: {url}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amenity_finder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    let outcome = runtime.block_on(run(args));
    // route resolutions that timed out are not waited for
    runtime.shutdown_background();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

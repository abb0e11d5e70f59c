//! `volseg` command line: inspect entries on a volume server and run a
//! headless viewer session against them.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use volseg::api::{HttpVolumeServer, VolumeServer};
use volseg::entry::resolve_source;
use volseg::options::Options;
use volseg::scene::{HeadlessScene, NodeKind};
use volseg::session::EntryLoader;
use volseg::{LoadMode, SegmentFilter, Session, VolsegError};

#[derive(Parser)]
#[command(name = "volseg", version, about)]
struct Cli {
    /// Options TOML file. Missing fields use defaults.
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    /// Volume server base URL, overriding the options file.
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show an entry's annotation and available data.
    Info {
        /// Entry id, e.g. emd-1832 or empiar-10070.
        entry: String,
    },
    /// Print the API URLs used for an entry.
    Urls {
        /// Entry id.
        entry: String,
    },
    /// List entries known to the server.
    List {
        /// Maximum number of entries.
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Only entries matching this keyword.
        #[arg(long)]
        keyword: Option<String>,
    },
    /// Load an entry's mesh segments.
    Meshes {
        /// Entry id.
        entry: String,
        /// Keep background segments.
        #[arg(long)]
        all: bool,
    },
    /// Load an image volume and its z-score threshold masks.
    Image {
        /// Entry id; defaults to the configured image entry.
        entry: Option<String>,
        /// Image threshold in standard deviations.
        #[arg(long, allow_hyphen_values = true)]
        iso: Option<f64>,
    },
    /// Load everything the entry's metadata says is available.
    Auto {
        /// Entry id.
        entry: String,
        /// Seconds to wait for the background load.
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), VolsegError> {
    let mut options = match &cli.options {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    if let Some(server) = cli.server {
        options.api.base_url = server;
    }
    let api = Arc::new(HttpVolumeServer::new(&options.api.base_url));

    match cli.command {
        Command::Info { entry } => info(api.as_ref(), &entry),
        Command::Urls { entry } => {
            let entry = resolve_source(&entry)?;
            let urls = api.urls();
            let request = options.api.volume_request();
            log::info!("metadata: {}", urls.metadata(&entry));
            log::info!("volume:   {}", urls.volume(&entry, &request));
            log::info!("version:  {}", urls.version());
            Ok(())
        }
        Command::List { limit, keyword } => {
            let entries = api.list_entries(limit, keyword.as_deref())?;
            for entry in &entries {
                log::info!("{entry}");
            }
            log::info!("{} entries", entries.len());
            Ok(())
        }
        Command::Meshes { entry, all } => {
            let filter = if all {
                SegmentFilter::All
            } else {
                SegmentFilter::Foreground
            };
            let mut session = Session::new(api, HeadlessScene::new(), options);
            let result = session.load_meshes(&entry, filter);
            summarize(&session);
            result
        }
        Command::Image { entry, iso } => {
            let entry =
                entry.unwrap_or_else(|| options.loading.image_entry.clone());
            let iso = iso.unwrap_or(options.image.iso_value);
            let mut session = Session::new(api, HeadlessScene::new(), options);
            session.load_image(&entry)?;
            let result = session.set_iso_value(iso, true);
            summarize(&session);
            result
        }
        Command::Auto { entry, timeout } => {
            let mut session = Session::new(api, HeadlessScene::new(), options);
            let mut loader = EntryLoader::new(session.api())?;
            loader.submit(
                session.begin_load(resolve_source(&entry)?, LoadMode::Auto),
            );
            let fetched = loader
                .recv_timeout(Duration::from_secs(timeout))
                .ok_or_else(|| {
                    VolsegError::Fetch(format!("{entry}: timed out"))
                })?;
            loader.shutdown();
            let result = session.finish_load(fetched);
            summarize(&session);
            result
        }
    }
}

fn info(api: &dyn VolumeServer, entry: &str) -> Result<(), VolsegError> {
    let entry = resolve_source(entry)?;
    let metadata = api.metadata(&entry)?;
    log::info!(
        "{entry}: volumes {}, lattices {}, meshes {}",
        metadata.has_volumes(),
        metadata.has_lattices(),
        metadata.has_meshes()
    );
    if let Some(details) = &metadata.annotation.details {
        log::info!("{details}");
    }
    for segment in &metadata.annotation.segment_list {
        log::info!(
            "segment {:>5}  {:<32}  details {:?}",
            segment.id,
            segment.name().unwrap_or("-"),
            metadata.mesh_segment_details(segment.id)
        );
    }
    Ok(())
}

fn summarize(session: &Session<HeadlessScene>) {
    let scene = session.scene();
    let state = session.state();
    log::info!(
        "scene: {} volumes, {} lattice volumes, {} isosurfaces, {} meshes, {} streams",
        scene.nodes_of_kind(NodeKind::DensityVolume).len(),
        scene.nodes_of_kind(NodeKind::LatticeVolume).len(),
        scene.nodes_of_kind(NodeKind::Isosurface).len(),
        scene.nodes_of_kind(NodeKind::Mesh).len(),
        scene.nodes_of_kind(NodeKind::MeshStreaming).len(),
    );
    if let Some(segment) = &state.current_segment {
        log::info!(
            "current segment: {} {}",
            segment.id,
            segment.name().unwrap_or("")
        );
    }
}

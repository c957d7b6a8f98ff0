use clap::{Parser, Subcommand, ValueEnum};
use simpleapp_controller::{
    ApiClient, ApplyEngine, ApplyEngineConfig, ControllerConfig, DesiredStateGenerator,
    LastAppliedAnnotator, MockCluster, ObjectStore, Scheme, SimpleAppController,
    SimpleAppReconciler, SimpleAppSource,
};
use simpleapp_core::{SimpleApp, LAST_APPLIED_ANNOTATION};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "simpleapp", about = "SimpleApp controller")]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "SIMPLEAPP_LOG_FORMAT", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller loop
    Run {
        /// API server URL
        #[arg(long, env = "SIMPLEAPP_API_URL", default_value = "http://127.0.0.1:6443")]
        api_url: String,
        /// Only reconcile SimpleApps in this namespace
        #[arg(long, env = "SIMPLEAPP_NAMESPACE")]
        namespace: Option<String>,
        /// Seconds between reconcile cycles
        #[arg(long, env = "SIMPLEAPP_INTERVAL_SECS", default_value_t = 5)]
        interval_secs: u64,
        /// Requeue after creating a child, re-verifying it after this many seconds
        #[arg(long, env = "SIMPLEAPP_REQUEUE_AFTER_CREATE_SECS")]
        requeue_after_create_secs: Option<u64>,
        /// Annotation used to track the last applied child object
        #[arg(long, env = "SIMPLEAPP_ANNOTATION_KEY", default_value = LAST_APPLIED_ANNOTATION)]
        annotation_key: String,
        /// Default ingress annotation (key=value), may be repeated
        #[arg(long = "ingress-annotation", value_parser = parse_key_val)]
        ingress_annotations: Vec<(String, String)>,
        /// Use an in-memory cluster instead of the API server
        #[arg(long)]
        mock: bool,
        /// SimpleApp manifests to seed the in-memory cluster with
        #[arg(long, requires = "mock")]
        manifest: Vec<PathBuf>,
    },
    /// Print the children a SimpleApp manifest would produce
    Render {
        /// Path to a SimpleApp YAML manifest
        #[arg(long)]
        file: PathBuf,
        /// uid used for the owner reference when the manifest has none
        #[arg(long, default_value = "00000000-0000-0000-0000-000000000000")]
        owner_uid: String,
        /// Default ingress annotation (key=value), may be repeated
        #[arg(long = "ingress-annotation", value_parser = parse_key_val)]
        ingress_annotations: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    match cli.command {
        Commands::Run {
            api_url,
            namespace,
            interval_secs,
            requeue_after_create_secs,
            annotation_key,
            ingress_annotations,
            mock,
            manifest,
        } => {
            let config = ControllerConfig {
                reconcile_interval: Duration::from_secs(interval_secs),
                namespace,
                default_ingress_annotations: ingress_annotations.into_iter().collect(),
            };
            let apply_config = ApplyEngineConfig {
                requeue_after_create: requeue_after_create_secs.map(Duration::from_secs),
            };
            let annotator = LastAppliedAnnotator::new(annotation_key);

            if mock {
                let cluster = Arc::new(MockCluster::new());
                for path in &manifest {
                    let app: SimpleApp = simpleapp_core::read_yaml_file(path)?;
                    let app = cluster.insert_simple_app(app).await;
                    info!("Seeded SimpleApp {}/{}", app.namespace(), app.name());
                }
                run_controller(cluster.clone(), cluster, annotator, apply_config, config).await
            } else {
                let client = Arc::new(ApiClient::new(&api_url));
                info!("Using API server at {}", client.base_url());
                run_controller(client.clone(), client, annotator, apply_config, config).await
            }
        }
        Commands::Render {
            file,
            owner_uid,
            ingress_annotations,
        } => {
            let output = render(&file, &owner_uid, ingress_annotations.into_iter().collect())?;
            print!("{}", output);
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Wire the reconciler and run the controller until ctrl-c
async fn run_controller(
    source: Arc<dyn SimpleAppSource>,
    store: Arc<dyn ObjectStore>,
    annotator: LastAppliedAnnotator,
    apply_config: ApplyEngineConfig,
    config: ControllerConfig,
) -> miette::Result<()> {
    info!(
        "Starting SimpleApp controller (annotation key '{}')",
        annotator.key()
    );

    let engine = Arc::new(ApplyEngine::new(store, annotator, apply_config));
    let reconciler = SimpleAppReconciler::new(
        source.clone(),
        engine,
        Arc::new(Scheme::with_simple_app()),
        DesiredStateGenerator::new(config.default_ingress_annotations.clone()),
    );
    let controller = SimpleAppController::new(source, reconciler, config);

    let token = CancellationToken::new();
    let controller_token = token.clone();
    let controller_handle = tokio::spawn(async move {
        if let Err(e) = controller.run(controller_token).await {
            error!("SimpleApp controller error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;

    info!("Shutting down gracefully...");
    token.cancel();

    let shutdown_timeout = Duration::from_secs(5);
    let _ = tokio::time::timeout(shutdown_timeout, controller_handle).await;

    info!("Shutdown complete");

    Ok(())
}

/// Render the bound children of a manifest as a YAML stream
fn render(
    file: &Path,
    owner_uid: &str,
    default_ingress_annotations: BTreeMap<String, String>,
) -> miette::Result<String> {
    let mut app: SimpleApp = simpleapp_core::read_yaml_file(file)?;
    app.validate()?;
    if app.metadata.uid.is_none() {
        app.metadata.uid = Some(owner_uid.to_string());
    }

    // Rendering never touches a cluster; the reconciler is only used to plan
    let cluster = Arc::new(MockCluster::new());
    let reconciler = SimpleAppReconciler::new(
        cluster.clone(),
        Arc::new(ApplyEngine::new(
            cluster,
            LastAppliedAnnotator::default(),
            ApplyEngineConfig::default(),
        )),
        Arc::new(Scheme::with_simple_app()),
        DesiredStateGenerator::new(default_ingress_annotations),
    );

    let mut docs = Vec::new();
    for (child, state) in reconciler.plan(&app)? {
        let yaml = simpleapp_core::to_yaml(&child.to_value()?)?;
        docs.push(format!("# {} {}: {}\n{}", child.kind(), child.name(), state, yaml));
    }

    Ok(docs.join("---\n"))
}

/// Parse a `key=value` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no '=' found in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use arc_swap::ArcSwap;
use axum::{Router, middleware};
use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use thicket::{
    adapters::{
        FileConfigProvider, FileSystemAdapter, HandlerRegistry, HttpClientAdapter, HttpHandler,
        request_id_middleware, request_timing_middleware, router,
    },
    config::{
        ThicketConfig, ThicketConfigValidator,
        loader::{DEFAULT_CONFIG_FILE, load_config_or_default, load_config_unchecked},
    },
    core::{
        Compilation, DevServer, PluginContext, ResourcePipeline, RunMode, SiteServer,
        optimize_output,
    },
    ports::{config_provider::ConfigProvider, file_system::FileSystem, http_client::HttpClient},
    tracing_setup,
    utils::GracefulShutdown,
};
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file, relative to the project directory
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Project root holding the workspace and output directories
    #[clap(short, long, global = true, default_value = ".")]
    project_dir: PathBuf,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Run the development server with hot config reload (default)
    Develop,
    /// Serve the built output directory
    Serve,
    /// Optimize built pages in place
    Optimize,
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Develop);
    let config_path = if args.config.is_absolute() {
        args.config.clone()
    } else {
        args.project_dir.join(&args.config)
    };
    let config_str = config_path
        .to_str()
        .ok_or_else(|| eyre!("Invalid UTF-8 config path: {}", config_path.display()))?
        .to_string();

    match command {
        Commands::Validate => return validate_config_command(&config_str).await,
        Commands::Init => return init_config_command(&config_path).await,
        _ => {}
    }

    let config = load_config_or_default(&config_str)
        .with_context(|| format!("Failed to load config from {config_str}"))?;
    ThicketConfigValidator::validate(&config)
        .with_context(|| format!("Invalid configuration in {config_str}"))?;

    tracing_setup::init_tracing(&config.logging).context("Failed to initialize tracing")?;

    let provider = rustls::crypto::aws_lc_rs::default_provider();
    if let Err(e) = rustls::crypto::CryptoProvider::install_default(provider) {
        tracing::debug!("CryptoProvider already installed: {:?}", e);
    }

    let file_system: Arc<dyn FileSystem> = Arc::new(FileSystemAdapter::new());

    match command {
        Commands::Develop => develop(config, &config_path, &args.project_dir, file_system).await,
        Commands::Serve => serve(config, &args.project_dir, file_system).await,
        Commands::Optimize => optimize(config, &args.project_dir, file_system).await,
        Commands::Validate | Commands::Init => Ok(()),
    }
}

async fn build_dev_server(
    config: ThicketConfig,
    project_dir: &Path,
    file_system: Arc<dyn FileSystem>,
) -> Result<DevServer> {
    let http_client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(config.dev_server.proxy_timeout_secs)
            .context("Failed to create HTTP client adapter")?,
    );
    let compilation = Compilation::builder(config, RunMode::Develop)
        .project_dir(project_dir)
        .build()
        .await
        .context("Failed to prepare compilation")?;
    let context =
        PluginContext::new(Arc::new(compilation), file_system).with_http_client(http_client);
    DevServer::new(&context)
}

async fn develop(
    config: ThicketConfig,
    config_path: &Path,
    project_dir: &Path,
    file_system: Arc<dyn FileSystem>,
) -> Result<()> {
    let listen_addr = config.listen_addr.clone();
    let server = build_dev_server(config, project_dir, file_system.clone()).await?;
    let base_url = server.compilation().base_url();
    let server_holder = Arc::new(ArcSwap::from_pointee(server));

    if config_path.exists() {
        let provider = Arc::new(
            FileConfigProvider::new(config_path).context("Failed to create config provider")?,
        );
        spawn_config_watcher(
            provider,
            server_holder.clone(),
            project_dir.to_path_buf(),
            file_system,
            listen_addr.clone(),
        );
    } else {
        tracing::info!("No config file to watch, hot reload disabled");
    }

    let handler = Arc::new(HttpHandler::new(server_holder, base_url));
    run_http_server(&listen_addr, router(handler), "Development server").await
}

/// Rebuild the dev server whenever the config file changes. A config that
/// fails to load or build leaves the running server in place.
fn spawn_config_watcher(
    provider: Arc<FileConfigProvider>,
    server_holder: Arc<ArcSwap<DevServer>>,
    project_dir: PathBuf,
    file_system: Arc<dyn FileSystem>,
    listen_addr: String,
) {
    let debounce_duration = Duration::from_secs(1);
    let mut notify_rx = provider.watch();

    tokio::spawn(async move {
        tracing::info!("Config watcher task started for {}", provider.path().display());
        let mut last_reload = tokio::time::Instant::now()
            .checked_sub(debounce_duration)
            .unwrap_or_else(tokio::time::Instant::now);

        while notify_rx.recv().await.is_some() {
            if last_reload.elapsed() < debounce_duration {
                while notify_rx.try_recv().is_ok() {}
                continue;
            }
            last_reload = tokio::time::Instant::now();

            let new_config = match provider.load_config().await {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!("Failed to reload configuration: {:?}", e);
                    continue;
                }
            };
            if new_config.listen_addr != listen_addr {
                tracing::warn!(
                    "listen_addr changed to {}; restart the server to apply it",
                    new_config.listen_addr
                );
            }

            match build_dev_server(new_config, &project_dir, file_system.clone()).await {
                Ok(server) => {
                    server_holder.store(Arc::new(server));
                    tracing::info!("Development server reloaded");
                }
                Err(e) => tracing::error!("Failed to rebuild development server: {:?}", e),
            }
        }
        tracing::info!("Config watcher task stopped");
    });
}

async fn serve(
    config: ThicketConfig,
    project_dir: &Path,
    file_system: Arc<dyn FileSystem>,
) -> Result<()> {
    let listen_addr = config.listen_addr.clone();
    let http_client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(config.dev_server.proxy_timeout_secs)
            .context("Failed to create HTTP client adapter")?,
    );
    let compilation = Compilation::builder(config, RunMode::Serve)
        .project_dir(project_dir)
        .build()
        .await
        .context("Failed to prepare compilation")?;
    let compilation = Arc::new(compilation);

    let handlers = Arc::new(HandlerRegistry::new(&compilation.context.output_dir));
    if compilation.is_hybrid() {
        tracing::warn!(
            "Project has on-demand routes; they answer 500 until handlers are registered by an embedding application"
        );
    }

    let base_url = compilation.base_url();
    let context = PluginContext::new(compilation, file_system).with_http_client(http_client);
    let server = SiteServer::new(&context, handlers)?;

    let handler = Arc::new(HttpHandler::new(
        Arc::new(ArcSwap::from_pointee(server)),
        base_url,
    ));
    run_http_server(&listen_addr, router(handler), "Site server").await
}

async fn optimize(
    config: ThicketConfig,
    project_dir: &Path,
    file_system: Arc<dyn FileSystem>,
) -> Result<()> {
    let compilation = Compilation::builder(config, RunMode::Build)
        .project_dir(project_dir)
        .build()
        .await
        .context("Failed to prepare compilation")?;
    let compilation = Arc::new(compilation);
    let context = PluginContext::new(compilation.clone(), file_system.clone());
    let pipeline = ResourcePipeline::from_descriptors(compilation.plugins(), &context)?;

    let count = optimize_output(&compilation, &pipeline, file_system.as_ref()).await?;
    println!("✅ Optimized {count} pages in {}", compilation.context.output_dir.display());
    Ok(())
}

async fn run_http_server(listen_addr: &str, app: Router, name: &str) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {listen_addr}"))?;

    let app = app
        .layer(middleware::from_fn(request_timing_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let graceful_shutdown = GracefulShutdown::new();
    let signals = graceful_shutdown.clone();
    tokio::spawn(async move { signals.run_signal_handler().await });

    tracing::info!("{} listening on http://{}", name, addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown.signal())
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config_unchecked(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match ThicketConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Mode: {:?}", config.mode);
            println!("   • Prerender: {}", config.prerender);
            println!("   • Workspace: {}", config.workspace);
            println!("   • Output Dir: {}", config.output_dir);
            println!("   • Proxy Rules: {}", config.dev_server.proxy.len());
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure proxy targets start with http:// or https://");
            println!("   • Keep workspace and output paths relative to the project");
            println!("   • Verify listen address format (e.g., '127.0.0.1:1984')");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        eprintln!(
            "❌ Error: Configuration file '{}' already exists",
            config_path.display()
        );
        std::process::exit(1);
    }

    let default_config = r#"# Thicket project configuration

# Address the development and site servers listen on
listen_addr = "127.0.0.1:1984"

# "ssg" or "spa"
mode = "ssg"

# Render SSR pages at build time instead of on demand
prerender = false

workspace = "src"
pages_dir = "pages"
output_dir = "public"

[dev_server]
proxy_timeout_secs = 30

# Forward matching paths to another server during development
# [dev_server.proxy]
# "/api" = "http://localhost:8080"

# Headers added to every development response
# [dev_server.headers]
# "x-powered-by" = "thicket"

[logging]
level = "info"
json = false
"#;

    tokio::fs::write(config_path, default_config)
        .await
        .context("Failed to write config file")?;
    println!(
        "✅ Created default configuration at: {}",
        config_path.display()
    );
    println!("   Run 'thicket develop' to start the development server");
    Ok(())
}

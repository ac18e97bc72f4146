//! Binary entry point: wire configuration, the Kubernetes client and the
//! HTTP server together.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use eks_provisioner::config::Config;
use eks_provisioner::orchestrator::KubeOrchestrator;
use eks_provisioner::service::ClusterService;
use eks_provisioner::{api, DEFAULT_HTTP_PORT};

#[derive(Parser)]
#[command(
    name = "eks-provisioner",
    about = "HTTP control surface for Terraform-driven EKS cluster lifecycle",
    version
)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Path to a kubeconfig file; when absent the configuration is inferred
    /// (in-cluster service account or local environment)
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env());
    info!(
        namespace = %config.namespace,
        worker_image = %config.worker_image,
        storage_class = %config.storage_class,
        "starting eks-provisioner"
    );

    let client = build_client(cli.kubeconfig.as_deref()).await?;
    let orchestrator = Arc::new(KubeOrchestrator::new(client, config.namespace.clone()));
    let service = Arc::new(ClusterService::new(config, orchestrator));

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, api::router(service))
        .await
        .context("server error")?;
    Ok(())
}

async fn build_client(kubeconfig: Option<&Path>) -> anyhow::Result<Client> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kc = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default())
                .await
                .context("failed to build client config from kubeconfig")?
        }
        None => kube::Config::infer()
            .await
            .context("failed to infer Kubernetes configuration")?,
    };

    // Fail fast on an unreachable API server instead of hanging requests
    config.connect_timeout = Some(Duration::from_secs(5));
    config.read_timeout = Some(Duration::from_secs(30));

    Client::try_from(config).context("failed to construct Kubernetes client")
}

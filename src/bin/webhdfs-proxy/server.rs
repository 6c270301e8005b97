use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use webhdfs_proxy::auth::StaticUserProvider;
use webhdfs_proxy::backend::BackendSelector;
use webhdfs_proxy::config::Config;
use webhdfs_proxy::health::HealthMonitor;
use webhdfs_proxy::router::{self, middlewares, AppState};
use webhdfs_proxy::service::ProxyService;
use webhdfs_proxy::transport::{HttpTransport, Transport};

pub struct Server {
    config: Config,
    quiet: bool,
}

impl Server {
    pub fn new(config: Config, quiet: bool) -> Self {
        Server { config, quiet }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.config;

        let selector = Arc::new(BackendSelector::new(config.backend_uris.clone())?);
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(config.transport_options())?);
        let service = Arc::new(ProxyService::new(
            selector.clone(),
            transport.clone(),
            config.parameter_limits(),
        ));
        let monitor = Arc::new(HealthMonitor::new(
            selector,
            transport,
            config.monitor_options(),
        ));

        if config.users.is_empty() {
            log::warn!("No users are configured, every file request will be rejected");
        }
        let state = web::Data::new(AppState {
            service,
            auth: Arc::new(StaticUserProvider::new(config.users.clone())),
            monitor: monitor.clone(),
            download_deadline: config.download_deadline,
        });
        let max_clients =
            middlewares::MaxClients::new(config.max_connections, config.request_timeout);

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(max_clients.clone())
                .wrap(middlewares::Trace::new())
                .configure(router::configure_server_handler)
        })
        .bind(&config.listen_address)
        .with_context(|| format!("unable to listen on {}", config.listen_address))?;

        if !self.quiet {
            log::info!("Listening on {}", config.listen_address);
            for endpoint in &config.backend_uris {
                log::info!("Backend: {}", endpoint);
            }
        }

        let probes = monitor.spawn();
        let res = server.run().await;
        probes.abort();
        res.context("server stopped with an error")
    }
}

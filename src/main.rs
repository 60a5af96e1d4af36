use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum_server::tls_rustls::RustlsConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use crate::certificates::CourseCertificates;
use crate::config::{Config, StoreKind};
use crate::database::access::PgAccessPolicy;
use crate::database::course_store::PgCourseStore;
use crate::endpoints::AppState;
use crate::security::access::{AccessPolicy, MemoryAccessPolicy};
use crate::security::token::TokenDecoder;
use crate::store::CourseStore;
use crate::store::memory::{MemoryCourseStore, SeedFile};
use crate::updates::BlockUpdateFeed;
use crate::validation::CourseValidator;

mod certificates;
mod config;
mod database;
mod endpoints;
mod error;
mod keys;
mod model;
mod security;
mod store;
mod updates;
mod validation;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    // Begin logging
    let level = match config.server.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("could not install the log subscriber: {e}");
        return;
    }

    let tokens = match TokenDecoder::new(&config.jwt) {
        Ok(t) => t,
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    let (store, access) = match open_stores(&config).await {
        Ok(stores) => stores,
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    let state = AppState {
        validator: Arc::new(CourseValidator::new(
            store,
            Arc::new(CourseCertificates::new(
                config.features.certificates_html_view,
            )),
            Arc::new(BlockUpdateFeed),
        )),
        tokens: Arc::new(tokens),
        access,
    };

    // Reports are read-only, so only GET (and the preflight) are allowed
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(AllowOrigin::any());

    let app: Router = endpoints::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    if let Err(e) = serve(&config, app).await {
        error!("{e}");
    }
}

type Stores = (Arc<dyn CourseStore>, Arc<dyn AccessPolicy>);

/// Builds the course store and the access policy named by `[store].kind`.
async fn open_stores(config: &Config) -> Result<Stores, String> {
    match config.store.kind {
        StoreKind::Memory => {
            let seed = match &config.store.seed {
                Some(path) => SeedFile::load(path).map_err(|e| e.to_string())?,
                None => SeedFile::default(),
            };
            info!(
                blocks = seed.blocks.len(),
                roles = seed.roles.len(),
                "using in-memory course store"
            );

            Ok((
                Arc::new(MemoryCourseStore::new(seed.blocks)),
                Arc::new(MemoryAccessPolicy::new(seed.roles)),
            ))
        }
        StoreKind::Postgres => {
            if config.database.name.is_empty() {
                return Err("PSQL_NAME environment variable not present".into());
            }
            if config.database.pass.is_empty() {
                return Err("PSQL_PASS environment variable not present".into());
            }

            // Abort start-up if the database cannot be initialized
            let pool = database::init_database(&config.database)
                .await
                .map_err(|e| e.to_string())?;

            let store = PgCourseStore::new(pool.clone());
            let access = PgAccessPolicy::new(pool);

            if let Some(path) = &config.store.seed {
                let seed = SeedFile::load(path).map_err(|e| e.to_string())?;
                store.import(&seed.blocks).await.map_err(|e| e.to_string())?;
                access.import(&seed.roles).await.map_err(|e| e.to_string())?;
                info!(blocks = seed.blocks.len(), "seed data imported");
            }

            Ok((Arc::new(store), Arc::new(access)))
        }
    }
}

/// Serves over HTTPS when a certificate is configured, plain HTTP otherwise.
async fn serve(config: &Config, app: Router) -> Result<(), String> {
    let addr = config.server.bind_addr().map_err(|e| e.to_string())?;

    match config.server.tls().map_err(|e| e.to_string())? {
        Some((cert, key)) => {
            // The rustls backend is built without a default provider
            if rustls::crypto::aws_lc_rs::default_provider()
                .install_default()
                .is_err()
            {
                return Err("could not install the rustls crypto provider".into());
            }

            let tls = RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(|e| format!("could not load the TLS certificate: {e}"))?;

            info!(%addr, "listening (https)");
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await
                .map_err(|e| e.to_string())
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| format!("could not bind {addr}: {e}"))?;

            info!(%addr, "listening (http)");
            axum::serve(listener, app).await.map_err(|e| e.to_string())
        }
    }
}

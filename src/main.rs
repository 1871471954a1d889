// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use mango_leaf_node::{
    api::{create_router, start_server, AppState, DetectionService, ServiceSettings},
    config::ServerConfig,
    version,
    vision::{ClassRegistry, InferenceEngine, ModelHandle, ModelLoader, OnnxModelFactory},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = ServerConfig::parse();

    info!("🚀 Starting {}", version::get_version_string());
    info!("📦 BUILD VERSION: {}", version::VERSION);

    let addr = config.socket_addr()?;
    let handle = ModelHandle::new();
    let loader = ModelLoader::new(
        Arc::new(OnnxModelFactory::new(config.onnx_config())),
        config.loader_config(),
    );

    info!(
        "🧠 Loading detection model (candidates: {:?}, fallback: {})",
        config.model_candidates,
        config.fallback_model.display()
    );
    match loader.load_and_publish(&handle).await {
        Ok(loaded) => info!("✅ Model ready: {}", loaded.source.display()),
        Err(e) => {
            error!("Failed to load model: {}", e);
            warn!("⚠️ Starting without model - check /health endpoint");
        }
    }

    let engine = InferenceEngine::new(handle, ClassRegistry::default());
    let service = DetectionService::new(engine, ServiceSettings::from(&config));
    let router = create_router(AppState::new(service, loader), config.body_limit());

    start_server(router, addr).await
}

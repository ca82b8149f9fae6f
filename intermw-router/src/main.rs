/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;
mod echo_bridge;

use crate::config::RouterConfig;
use crate::echo_bridge::{EchoBridge, ECHO_PLATFORM_TYPE};
use clap::Parser;
use intermw_control::{Bridge, BridgeFactories, BridgeManager, BrokerRegistry, MiddlewareError};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command()]
struct RouterArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), MiddlewareError> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started intermw-router");

    let args = RouterArgs::parse();
    let config = RouterConfig::from_file(&args.config)?;

    let brokers = Arc::new(BrokerRegistry::with_loopback(
        config.middleware.broker.clone(),
    ));
    let mut factories = BridgeFactories::new();
    factories.register(ECHO_PLATFORM_TYPE, |platform, configuration| {
        Ok(Box::new(EchoBridge::new(platform, configuration)) as Box<dyn Bridge>)
    });

    let manager = BridgeManager::new(config.middleware, brokers, factories).await?;
    let monitor = manager.install_error_monitor().await?;
    info!(
        supported_platform_types = ?manager.supported_platform_types(),
        "bridge manager ready"
    );

    for platform in config.platforms {
        let platform_id = platform.platform_id.clone();
        if let Err(e) = manager.register_platform(platform).await {
            error!(platform_id = platform_id.as_str(), err = %e, "Unable to register platform");
        }
    }
    info!(registered = ?manager.registered_platforms().await, "platforms registered");

    tokio::signal::ctrl_c().await.map_err(|e| {
        MiddlewareError::Configuration(format!("Unable to listen for shutdown signal: {e}"))
    })?;

    info!("Shutting down intermw-router");
    let report = manager.shutdown().await;
    if !report.is_clean() {
        warn!(
            released = report.released,
            failed = report.failures.len(),
            "some broker resources could not be released"
        );
    }
    info!(
        errors_received = monitor.received(),
        errors_malformed = monitor.malformed(),
        "intermw-router stopped"
    );

    Ok(())
}

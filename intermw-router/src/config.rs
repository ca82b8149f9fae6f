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

use intermw_control::{Configuration, MiddlewareError, Platform};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    pub(crate) middleware: Configuration,
    /// Platforms registered at startup.
    #[serde(default)]
    pub(crate) platforms: Vec<Platform>,
}

impl RouterConfig {
    pub(crate) fn from_file(path: impl AsRef<Path>) -> Result<Self, MiddlewareError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MiddlewareError::Configuration(format!(
                "Unable to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json5_str(&contents)
    }

    pub(crate) fn from_json5_str(contents: &str) -> Result<Self, MiddlewareError> {
        let config: RouterConfig = json5::from_str(contents).map_err(|e| {
            MiddlewareError::Configuration(format!("Unable to parse config file: {e}"))
        })?;
        config.middleware.validate()?;
        Ok(config)
    }
}

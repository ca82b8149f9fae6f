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

use serde::{Deserialize, Serialize};

///
/// [`Platform`] is an external IoT platform instance identified by a URI-like
/// `platform_id`. The `platform_type` selects the bridge implementation.
///
/// # Examples
///
/// ```
/// use intermw_control::Platform;
///
/// let platform = Platform::new("http://test.inter-iot.eu/test-platform1", "test-platform");
/// assert_eq!(platform.platform_type, "test-platform");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Platform {
    pub platform_id: String,
    pub platform_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_endpoint: Option<String>,
}

impl Platform {
    pub fn new(platform_id: &str, platform_type: &str) -> Self {
        Self {
            platform_id: platform_id.to_string(),
            platform_type: platform_type.to_string(),
            name: None,
            base_endpoint: None,
        }
    }
}

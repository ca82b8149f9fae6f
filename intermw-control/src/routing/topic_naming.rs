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

//! Logical channel constants and the topic-name resolution shared across the system.
//!
//! Topic names are a bit-exact interop contract: `<prefix>` for global channels and
//! `<prefix>_<sanitized-platform-id>` for platform-scoped channels.

use crate::error::MiddlewareError;
use std::fmt::{Display, Formatter};

const PLATFORM_SEPARATOR: char = '_';

/// Enumerated set of logical channels. The first segment of a prefix names the
/// publishing component, the second the listening one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Channel {
    /// Global error channel.
    Error,
    PrmSrm,
    SrmPrm,
    PrmArm,
    /// Router to bridge, scoped per platform.
    IpsmrmBridge,
    /// Bridge to router, scoped per platform.
    BridgeIpsmrm,
    ArmPrm,
    IpsmrmPrm,
    PrmIpsmrm,
    BridgeEmulator,
    RestApi,
    Default,
}

impl Channel {
    pub const ALL: [Channel; 12] = [
        Channel::Error,
        Channel::PrmSrm,
        Channel::SrmPrm,
        Channel::PrmArm,
        Channel::IpsmrmBridge,
        Channel::BridgeIpsmrm,
        Channel::ArmPrm,
        Channel::IpsmrmPrm,
        Channel::PrmIpsmrm,
        Channel::BridgeEmulator,
        Channel::RestApi,
        Channel::Default,
    ];

    pub const fn prefix(self) -> &'static str {
        match self {
            Channel::Error => "error",
            Channel::PrmSrm => "prm_srm",
            Channel::SrmPrm => "srm_prm",
            Channel::PrmArm => "prm_arm",
            Channel::IpsmrmBridge => "ipsmrm_bridge",
            Channel::BridgeIpsmrm => "bridge_ipsmrm",
            Channel::ArmPrm => "arm_prm",
            Channel::IpsmrmPrm => "ipsmrm_prm",
            Channel::PrmIpsmrm => "prm_ipsmrm",
            Channel::BridgeEmulator => "bridge_controller_emulator_topic",
            Channel::RestApi => "rest_api",
            Channel::Default => "default",
        }
    }

    pub const fn is_platform_scoped(self) -> bool {
        matches!(self, Channel::IpsmrmBridge | Channel::BridgeIpsmrm)
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

fn is_reserved(ch: char) -> bool {
    matches!(ch, ':' | '/' | '#')
}

/// Replaces every maximal run of `:`, `/`, `#` with a single `_`.
pub fn sanitize(platform_id: &str) -> String {
    let mut sanitized = String::with_capacity(platform_id.len());
    let mut in_run = false;

    for ch in platform_id.chars() {
        if is_reserved(ch) {
            if !in_run {
                sanitized.push(PLATFORM_SEPARATOR);
                in_run = true;
            }
        } else {
            sanitized.push(ch);
            in_run = false;
        }
    }

    sanitized
}

/// Resolves the concrete topic name of `channel`.
///
/// Platform-scoped channels require a non-empty platform id; global channels reject one.
pub fn resolve(channel: Channel, platform_id: Option<&str>) -> Result<String, MiddlewareError> {
    match (channel.is_platform_scoped(), platform_id) {
        (false, None) => Ok(channel.prefix().to_string()),
        (false, Some(platform_id)) => Err(MiddlewareError::Configuration(format!(
            "channel `{channel}` is global and does not take a platform id (got `{platform_id}`)"
        ))),
        (true, None) => Err(MiddlewareError::Configuration(format!(
            "channel `{channel}` is platform-scoped and requires a platform id"
        ))),
        (true, Some("")) => Err(MiddlewareError::Configuration(format!(
            "channel `{channel}` received an empty platform id"
        ))),
        (true, Some(platform_id)) => Ok(format!(
            "{}{PLATFORM_SEPARATOR}{}",
            channel.prefix(),
            sanitize(platform_id)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, sanitize, Channel};
    use crate::error::MiddlewareError;

    const TEST_PLATFORM: &str = "http://test.inter-iot.eu/test-platform1";

    #[test]
    fn platform_scoped_topics_match_interop_format() {
        assert_eq!(
            resolve(Channel::BridgeIpsmrm, Some(TEST_PLATFORM)).unwrap(),
            "bridge_ipsmrm_http_test.inter-iot.eu_test-platform1"
        );
        assert_eq!(
            resolve(Channel::IpsmrmBridge, Some(TEST_PLATFORM)).unwrap(),
            "ipsmrm_bridge_http_test.inter-iot.eu_test-platform1"
        );
    }

    #[test]
    fn global_channels_resolve_to_their_prefix() {
        for channel in Channel::ALL
            .into_iter()
            .filter(|channel| !channel.is_platform_scoped())
        {
            assert_eq!(resolve(channel, None).unwrap(), channel.prefix());
        }
        assert_eq!(resolve(Channel::Error, None).unwrap(), "error");
    }

    #[test]
    fn resolve_is_deterministic() {
        for channel in Channel::ALL {
            let platform_id = channel.is_platform_scoped().then_some("urn:a#b/c");
            let first = resolve(channel, platform_id).unwrap();
            let second = resolve(channel, platform_id).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn sanitize_collapses_runs_of_reserved_characters() {
        assert_eq!(sanitize("a::b//c##d"), "a_b_c_d");
        assert_eq!(sanitize(":/#"), "_");
        assert_eq!(sanitize("plain-id.1"), "plain-id.1");
        assert_eq!(sanitize("urn:x#/y:"), "urn_x_y_");
    }

    #[test]
    fn sanitized_topics_contain_no_reserved_characters() {
        let ids = [
            TEST_PLATFORM,
            "urn:platform:fiware#1",
            "///",
            "a:b/c#d",
            "tcp://10.0.0.1:1883/#",
        ];

        for platform_id in ids {
            let topic = resolve(Channel::IpsmrmBridge, Some(platform_id)).unwrap();
            assert!(
                !topic.contains(&[':', '/', '#'][..]),
                "topic {topic} still has reserved characters"
            );
        }
    }

    #[test]
    fn misuse_of_platform_ids_is_a_configuration_error() {
        assert!(matches!(
            resolve(Channel::BridgeIpsmrm, None),
            Err(MiddlewareError::Configuration(_))
        ));
        assert!(matches!(
            resolve(Channel::IpsmrmBridge, Some("")),
            Err(MiddlewareError::Configuration(_))
        ));
        assert!(matches!(
            resolve(Channel::Error, Some(TEST_PLATFORM)),
            Err(MiddlewareError::Configuration(_))
        ));
    }
}

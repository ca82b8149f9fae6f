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

//! Routing layer.
//!
//! Owns the fixed set of logical channels and the deterministic mapping from a
//! channel (plus optional platform id) to a concrete broker topic name.
//!
//! ```
//! use intermw_control::{resolve, Channel};
//!
//! let outbound = resolve(
//!     Channel::BridgeIpsmrm,
//!     Some("http://test.inter-iot.eu/test-platform1"),
//! )
//! .unwrap();
//! assert_eq!(outbound, "bridge_ipsmrm_http_test.inter-iot.eu_test-platform1");
//!
//! assert_eq!(resolve(Channel::Error, None).unwrap(), "error");
//! ```

pub(crate) mod topic_naming;

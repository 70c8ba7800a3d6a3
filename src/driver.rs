//
// Copyright 2025 Jeff Bush
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::error::Error;
use crate::ipcfg::IfConfig;
use crate::link::{LinkMode, LinkState};
use std::net::Ipv4Addr;

//
// The two subsystems that actually touch hardware live behind these traits.
// Both follow the driver convention of integer status codes: zero for
// success, a subsystem-specific negative value otherwise. Queries that
// produce a value return it or the failing code.
//

pub type StatusCode = i32;

pub const OK: StatusCode = 0;

/// The network manager subsystem: owns the adapter, must be initialized
/// before anything else touches the network, and answers link queries.
pub trait NetManager {
    fn init(&mut self) -> StatusCode;
    fn deinit(&mut self) -> StatusCode;
    fn set_link_mode(&mut self, mode: LinkMode) -> StatusCode;
    fn link_state(&mut self) -> Result<LinkState, StatusCode>;
}

/// The TCP/IP protocol stack: initialized with a starting address triple,
/// then configured per interface by name.
pub trait IpStack {
    fn init(&mut self, addr: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> StatusCode;
    fn deinit(&mut self) -> StatusCode;
    fn get_config(&mut self, if_name: &str) -> Result<IfConfig, StatusCode>;
    fn set_config(&mut self, if_name: &str, config: &IfConfig) -> StatusCode;
}

/// Converts a driver status code into a crate error, tagged with the
/// operation that produced it.
pub fn check(op: &'static str, code: StatusCode) -> Result<(), Error> {
    if code == OK {
        Ok(())
    } else {
        Err(Error::Driver { op, code })
    }
}

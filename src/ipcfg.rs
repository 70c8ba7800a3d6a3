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

use crate::driver::{check, IpStack};
use crate::error::{Error, Result};
use std::net::Ipv4Addr;

/// Lease lifecycle as reported by the stack. The bring-up wait treats Bound
/// and Off as complete: either a lease landed, or the stack dropped DHCP
/// and left whatever addresses were set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpState {
    Off,
    Selecting,
    Requesting,
    Bound,
    Renewing,
    Rebinding,
}

/// Per-interface configuration record, as returned by get_config and
/// accepted by set_config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfConfig {
    pub dhcp_enabled: bool,
    pub dhcp_status: DhcpState,
    pub addr: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl Default for IfConfig {
    /// An unnumbered interface with DHCP off: the state right after stack
    /// init.
    fn default() -> IfConfig {
        IfConfig {
            dhcp_enabled: false,
            dhcp_status: DhcpState::Off,
            addr: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// What the caller wants the interface to be: dynamically configured, or
/// pinned to an explicit address triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpSetting {
    Dhcp,
    Static {
        addr: Ipv4Addr,
        netmask: Ipv4Addr,
        gateway: Ipv4Addr,
    },
}

/// True when the live configuration already satisfies the desired one, in
/// which case apply skips the set_config call entirely. For DHCP the
/// address fields are the lease's business and do not participate.
pub fn matches(live: &IfConfig, desired: &IpSetting) -> bool {
    match *desired {
        IpSetting::Dhcp => live.dhcp_enabled,
        IpSetting::Static {
            addr,
            netmask,
            gateway,
        } => {
            !live.dhcp_enabled
                && live.addr == addr
                && live.netmask == netmask
                && live.gateway == gateway
        }
    }
}

/// Pushes the desired setting to the stack unless it is already in effect.
/// The live record is copied and only the relevant fields are touched, so a
/// single set_config call carries the complete new configuration.
pub fn apply<S: IpStack>(stack: &mut S, if_name: &str, desired: &IpSetting) -> Result<()> {
    let live = match stack.get_config(if_name) {
        Ok(config) => config,
        Err(code) => {
            return Err(Error::Driver {
                op: "get_config",
                code,
            })
        }
    };

    if matches(&live, desired) {
        return Ok(());
    }

    let mut next = live;
    match *desired {
        IpSetting::Dhcp => {
            // The address fields stay as they are; the DHCP process owns
            // them from here on.
            next.dhcp_enabled = true;
        }
        IpSetting::Static {
            addr,
            netmask,
            gateway,
        } => {
            next.dhcp_enabled = false;
            next.addr = addr;
            next.netmask = netmask;
            next.gateway = gateway;
        }
    }

    check("set_config", stack.set_config(if_name, &next))
}

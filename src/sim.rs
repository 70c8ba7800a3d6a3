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

use crate::driver::{IpStack, NetManager, StatusCode, OK};
use crate::ipcfg::{DhcpState, IfConfig};
use crate::link::{LinkMode, LinkState};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

//
// Simulated driver subsystems. The real manager and stack only exist on the
// console hardware; these stand-ins script the observable behavior (how
// many polls until the link is up, when the lease lands, which calls fail)
// and record every call so tests can assert exact counts and ordering. The
// demo apps run on them too.
//

/// One recorded driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    ManagerInit,
    ManagerDeinit,
    SetLinkMode(LinkMode),
    LinkState,
    StackInit,
    StackDeinit,
    GetConfig,
    SetConfig(IfConfig),
}

/// Shared, ordered record of the calls made against the simulated
/// subsystems. Clones all point at the same underlying list.
#[derive(Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
    pub fn new() -> Journal {
        Journal::default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Snapshot of everything recorded so far, in invocation order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls()
            .iter()
            .filter(|&&recorded| recorded == call)
            .count()
    }

    /// Position of the first occurrence, for ordering assertions.
    pub fn position(&self, call: Call) -> Option<usize> {
        self.calls().iter().position(|&recorded| recorded == call)
    }
}

/// Simulated network manager. The status fields are returned verbatim by
/// the corresponding calls; link_up_after is how many link polls report
/// Down before the link comes up (u32::MAX: never).
pub struct SimManager {
    pub init_status: StatusCode,
    pub deinit_status: StatusCode,
    pub set_link_mode_status: StatusCode,
    pub link_up_after: u32,
    pub link_state_error: Option<StatusCode>,
    polls: u32,
    journal: Journal,
}

impl SimManager {
    pub fn new(journal: Journal) -> SimManager {
        SimManager {
            init_status: OK,
            deinit_status: OK,
            set_link_mode_status: OK,
            link_up_after: 0,
            link_state_error: None,
            polls: 0,
            journal,
        }
    }
}

impl NetManager for SimManager {
    fn init(&mut self) -> StatusCode {
        self.journal.record(Call::ManagerInit);
        self.init_status
    }

    fn deinit(&mut self) -> StatusCode {
        self.journal.record(Call::ManagerDeinit);
        // Negotiation starts over when the manager comes back up.
        self.polls = 0;
        self.deinit_status
    }

    fn set_link_mode(&mut self, mode: LinkMode) -> StatusCode {
        self.journal.record(Call::SetLinkMode(mode));
        self.set_link_mode_status
    }

    fn link_state(&mut self) -> Result<LinkState, StatusCode> {
        self.journal.record(Call::LinkState);
        if let Some(code) = self.link_state_error {
            return Err(code);
        }

        self.polls += 1;
        if self.polls > self.link_up_after {
            Ok(LinkState::Up)
        } else {
            Ok(LinkState::Down)
        }
    }
}

/// Simulated TCP/IP stack for a single interface. Once DHCP is enabled,
/// every get_config while unbound counts as one negotiation poll; after
/// dhcp_bound_after of those the lease lands and the record reports Bound.
pub struct SimStack {
    pub if_name: &'static str,
    pub lease: (Ipv4Addr, Ipv4Addr, Ipv4Addr),
    pub dhcp_bound_after: u32,
    pub init_status: StatusCode,
    pub deinit_status: StatusCode,
    pub set_config_status: StatusCode,
    pub get_config_error: Option<StatusCode>,
    pub config: IfConfig,
    dhcp_polls: u32,
    journal: Journal,
}

impl SimStack {
    pub fn new(journal: Journal) -> SimStack {
        SimStack {
            if_name: "sm0",
            lease: (
                Ipv4Addr::new(10, 0, 2, 15),
                Ipv4Addr::new(255, 255, 255, 0),
                Ipv4Addr::new(10, 0, 2, 2),
            ),
            dhcp_bound_after: 0,
            init_status: OK,
            deinit_status: OK,
            set_config_status: OK,
            get_config_error: None,
            config: IfConfig::default(),
            dhcp_polls: 0,
            journal,
        }
    }
}

impl IpStack for SimStack {
    fn init(&mut self, addr: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> StatusCode {
        self.journal.record(Call::StackInit);
        self.config.addr = addr;
        self.config.netmask = netmask;
        self.config.gateway = gateway;
        self.init_status
    }

    fn deinit(&mut self) -> StatusCode {
        self.journal.record(Call::StackDeinit);
        // Tearing the stack down loses whatever was configured.
        self.config = IfConfig::default();
        self.dhcp_polls = 0;
        self.deinit_status
    }

    fn get_config(&mut self, if_name: &str) -> Result<IfConfig, StatusCode> {
        self.journal.record(Call::GetConfig);
        if let Some(code) = self.get_config_error {
            return Err(code);
        }
        if if_name != self.if_name {
            return Err(-1);
        }

        if self.config.dhcp_enabled && self.config.dhcp_status != DhcpState::Bound {
            self.dhcp_polls += 1;
            if self.dhcp_polls > self.dhcp_bound_after {
                let (addr, netmask, gateway) = self.lease;
                self.config.dhcp_status = DhcpState::Bound;
                self.config.addr = addr;
                self.config.netmask = netmask;
                self.config.gateway = gateway;
            }
        }

        Ok(self.config)
    }

    fn set_config(&mut self, if_name: &str, config: &IfConfig) -> StatusCode {
        self.journal.record(Call::SetConfig(*config));
        if if_name != self.if_name {
            return -1;
        }

        self.config = *config;
        if self.config.dhcp_enabled && self.config.dhcp_status != DhcpState::Bound {
            self.config.dhcp_status = DhcpState::Selecting;
        }
        self.dhcp_polls = 0;
        self.set_config_status
    }
}

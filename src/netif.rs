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

use crate::driver::{check, IpStack, NetManager, OK};
use crate::error::{Error, Result};
use crate::ipcfg::{self, DhcpState, IpSetting};
use crate::link::{LinkConfig, LinkMode, LinkState};
use crate::poll::{wait_until, PollStatus, RetryBudget, WaitError};
use log::{debug, info, warn};
use std::net::Ipv4Addr;

/// Where the bring-up state machine currently is. Bound and Failed are the
/// terminal phases; a Failed interface can be brought up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    StackInitializing,
    LinkNegotiating,
    LinkUp,
    DhcpNegotiating,
    Bound,
    Failed,
}

/// Policy for one bring-up: which interface, what link mode, how the
/// address should be obtained, and how patient the two waits are.
#[derive(Debug, Clone)]
pub struct BringUpConfig {
    pub if_name: &'static str,
    pub link_mode: LinkMode,
    pub ip: IpSetting,
    pub link_wait: RetryBudget,
    pub dhcp_wait: RetryBudget,
}

impl Default for BringUpConfig {
    fn default() -> BringUpConfig {
        BringUpConfig {
            if_name: "sm0",
            link_mode: LinkMode::Auto,
            ip: IpSetting::Dhcp,
            link_wait: RetryBudget::default(),
            dhcp_wait: RetryBudget::default(),
        }
    }
}

/// A single physical interface plus the two driver subsystems serving it.
/// Owns the bring-up sequencing: manager init, link mode, stack init, IP
/// configuration, the two bounded waits, and the rollback when any of that
/// fails.
pub struct Netif<M: NetManager, S: IpStack> {
    manager: M,
    stack: S,
    link: LinkConfig,
    config: BringUpConfig,
    phase: Phase,
}

impl<M: NetManager, S: IpStack> Netif<M, S> {
    pub fn new(manager: M, stack: S, config: BringUpConfig) -> Netif<M, S> {
        Netif {
            manager,
            stack,
            link: LinkConfig::new(),
            config,
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The manager handle, e.g. for link queries after bring-up.
    pub fn manager_mut(&mut self) -> &mut M {
        &mut self.manager
    }

    /// The stack handle; applications talk to the network through it once
    /// the interface is up.
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Runs the whole bring-up sequence. On failure both subsystems are
    /// rolled back down (stack first, then manager) and the interface lands
    /// in Failed; calling bring_up again starts over from scratch.
    pub fn bring_up(&mut self) -> Result<()> {
        match self.try_bring_up() {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("netif: bring-up failed: {}", err);
                self.roll_back();
                self.set_phase(Phase::Failed);
                Err(err)
            }
        }
    }

    fn try_bring_up(&mut self) -> Result<()> {
        self.set_phase(Phase::StackInitializing);

        // The stack starts out unnumbered; DHCP (or the static setting)
        // supplies the real addresses afterwards.
        let addr = Ipv4Addr::UNSPECIFIED;
        let netmask = Ipv4Addr::UNSPECIFIED;
        let gateway = Ipv4Addr::UNSPECIFIED;

        check("manager_init", self.manager.init())?;
        self.link.apply(&mut self.manager, self.config.link_mode)?;
        check("stack_init", self.stack.init(addr, netmask, gateway))?;
        ipcfg::apply(&mut self.stack, self.config.if_name, &self.config.ip)?;

        self.set_phase(Phase::LinkNegotiating);
        info!("netif: waiting for the link to come up");
        let budget = self.config.link_wait;
        let manager = &mut self.manager;
        wait_until(&budget, || match manager.link_state() {
            Ok(LinkState::Up) => PollStatus::Ready,
            Ok(LinkState::Down) => PollStatus::Pending,
            Err(code) => PollStatus::Failed(Error::Driver {
                op: "link_state",
                code,
            }),
        })
        .map_err(|err| match err {
            WaitError::Exhausted => Error::LinkTimeout,
            WaitError::Aborted(err) => err,
        })?;
        self.set_phase(Phase::LinkUp);

        if let IpSetting::Dhcp = self.config.ip {
            self.set_phase(Phase::DhcpNegotiating);
            info!("netif: waiting for a DHCP lease");
            let budget = self.config.dhcp_wait;
            let if_name = self.config.if_name;
            let stack = &mut self.stack;
            wait_until(&budget, || match stack.get_config(if_name) {
                Ok(config)
                    if config.dhcp_enabled
                        && matches!(config.dhcp_status, DhcpState::Bound | DhcpState::Off) =>
                {
                    PollStatus::Ready
                }
                Ok(_) => PollStatus::Pending,
                Err(code) => PollStatus::Failed(Error::Driver {
                    op: "get_config",
                    code,
                }),
            })
            .map_err(|err| match err {
                WaitError::Exhausted => Error::DhcpTimeout,
                WaitError::Aborted(err) => err,
            })?;
        }

        self.set_phase(Phase::Bound);
        self.log_config();
        Ok(())
    }

    /// Tears both subsystems back down in reverse init order. Their own
    /// failures are logged and swallowed; there is nothing useful a caller
    /// could do with them.
    fn roll_back(&mut self) {
        let code = self.stack.deinit();
        if code != OK {
            warn!("netif: stack deinit returned {}", code);
        }

        let code = self.manager.deinit();
        if code != OK {
            warn!("netif: manager deinit returned {}", code);
        }

        // The manager forgot its link mode along with everything else, so a
        // retry has to re-apply it.
        self.link = LinkConfig::new();
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!("netif: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn log_config(&mut self) {
        match self.stack.get_config(self.config.if_name) {
            Ok(config) => {
                info!("netif: ip address {}", config.addr);
                info!("netif: netmask    {}", config.netmask);
                info!("netif: gateway    {}", config.gateway);
            }
            Err(code) => warn!("netif: could not read back the configuration: {}", code),
        }
    }

    /// Current address of the managed interface, straight from the stack.
    pub fn ip(&mut self) -> Result<Ipv4Addr> {
        match self.stack.get_config(self.config.if_name) {
            Ok(config) => Ok(config.addr),
            Err(code) => Err(Error::Driver {
                op: "get_config",
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Call, Journal, SimManager, SimStack};

    // Millisecond-scale budgets so the suite doesn't sit through real
    // negotiation delays.
    fn fast_config() -> BringUpConfig {
        BringUpConfig {
            link_wait: RetryBudget::new(5, 1),
            dhcp_wait: RetryBudget::new(5, 1),
            ..BringUpConfig::default()
        }
    }

    fn sim_netif(journal: &Journal) -> Netif<SimManager, SimStack> {
        Netif::new(
            SimManager::new(journal.clone()),
            SimStack::new(journal.clone()),
            fast_config(),
        )
    }

    #[test]
    fn test_bring_up_with_dhcp() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        manager.link_up_after = 2;
        let mut stack = SimStack::new(journal.clone());
        stack.dhcp_bound_after = 1;

        let mut netif = Netif::new(manager, stack, fast_config());
        assert_eq!(netif.bring_up(), Ok(()));
        assert_eq!(netif.phase(), Phase::Bound);
        assert_eq!(netif.ip(), Ok(Ipv4Addr::new(10, 0, 2, 15)));

        assert_eq!(journal.count(Call::ManagerInit), 1);
        assert_eq!(journal.count(Call::StackInit), 1);
        assert_eq!(journal.count(Call::LinkState), 3);
        assert_eq!(journal.count(Call::StackDeinit), 0);
        assert_eq!(journal.count(Call::ManagerDeinit), 0);
    }

    #[test]
    fn test_link_timeout_rolls_back() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        manager.link_up_after = u32::MAX;
        let stack = SimStack::new(journal.clone());

        let mut config = fast_config();
        config.link_wait = RetryBudget::new(3, 1);
        let mut netif = Netif::new(manager, stack, config);

        assert_eq!(netif.bring_up(), Err(Error::LinkTimeout));
        assert_eq!(netif.phase(), Phase::Failed);
        assert_eq!(journal.count(Call::LinkState), 3);
        assert_eq!(journal.count(Call::StackDeinit), 1);
        assert_eq!(journal.count(Call::ManagerDeinit), 1);

        // Reverse of init order: the stack goes down before the manager.
        let stack_deinit = journal.position(Call::StackDeinit).unwrap();
        let manager_deinit = journal.position(Call::ManagerDeinit).unwrap();
        assert!(stack_deinit < manager_deinit);
    }

    #[test]
    fn test_dhcp_timeout_rolls_back() {
        let journal = Journal::new();
        let manager = SimManager::new(journal.clone());
        let mut stack = SimStack::new(journal.clone());
        stack.dhcp_bound_after = u32::MAX;

        let mut config = fast_config();
        config.dhcp_wait = RetryBudget::new(2, 1);
        let mut netif = Netif::new(manager, stack, config);

        assert_eq!(netif.bring_up(), Err(Error::DhcpTimeout));
        assert_eq!(netif.phase(), Phase::Failed);
        // One get_config from the applier, two from the bounded wait.
        assert_eq!(journal.count(Call::GetConfig), 3);
        assert_eq!(journal.count(Call::StackDeinit), 1);
        assert_eq!(journal.count(Call::ManagerDeinit), 1);
    }

    #[test]
    fn test_manager_init_failure_rolls_back() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        manager.init_status = -1;
        let stack = SimStack::new(journal.clone());

        let mut netif = Netif::new(manager, stack, fast_config());
        assert_eq!(
            netif.bring_up(),
            Err(Error::Driver {
                op: "manager_init",
                code: -1
            })
        );
        assert_eq!(netif.phase(), Phase::Failed);
        assert_eq!(journal.count(Call::StackDeinit), 1);
        assert_eq!(journal.count(Call::ManagerDeinit), 1);
    }

    #[test]
    fn test_set_link_mode_failure_rolls_back() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        manager.set_link_mode_status = -1;
        let stack = SimStack::new(journal.clone());

        let mut config = fast_config();
        config.link_mode = LinkMode::Fixed100Full;
        let mut netif = Netif::new(manager, stack, config);

        assert_eq!(
            netif.bring_up(),
            Err(Error::Driver {
                op: "set_link_mode",
                code: -1
            })
        );
        assert_eq!(netif.phase(), Phase::Failed);
        // Never got as far as the link wait.
        assert_eq!(journal.count(Call::LinkState), 0);
        assert_eq!(journal.count(Call::StackDeinit), 1);
        assert_eq!(journal.count(Call::ManagerDeinit), 1);
    }

    #[test]
    fn test_link_query_error_aborts_wait() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        manager.link_state_error = Some(-2);
        let stack = SimStack::new(journal.clone());

        let mut netif = Netif::new(manager, stack, fast_config());
        assert_eq!(
            netif.bring_up(),
            Err(Error::Driver {
                op: "link_state",
                code: -2
            })
        );
        assert_eq!(netif.phase(), Phase::Failed);
        // The error aborts the wait on the first poll instead of burning
        // the whole retry budget.
        assert_eq!(journal.count(Call::LinkState), 1);
    }

    #[test]
    fn test_static_setting_skips_dhcp_wait() {
        let journal = Journal::new();
        let manager = SimManager::new(journal.clone());
        let stack = SimStack::new(journal.clone());

        let mut config = fast_config();
        config.ip = IpSetting::Static {
            addr: Ipv4Addr::new(10, 0, 0, 5),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(10, 0, 0, 1),
        };
        let mut netif = Netif::new(manager, stack, config);

        assert_eq!(netif.bring_up(), Ok(()));
        assert_eq!(netif.phase(), Phase::Bound);
        // The applier reads the config once and the success diagnostic
        // reads it once more; no DHCP polling in between.
        assert_eq!(journal.count(Call::GetConfig), 2);

        let set_config = journal
            .calls()
            .iter()
            .find_map(|call| match call {
                Call::SetConfig(config) => Some(*config),
                _ => None,
            })
            .unwrap();
        assert_eq!(set_config.dhcp_enabled, false);
        assert_eq!(set_config.addr, Ipv4Addr::new(10, 0, 0, 5));

        assert_eq!(netif.ip(), Ok(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[test]
    fn test_failed_bring_up_can_be_retried() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        manager.link_up_after = u32::MAX;
        let stack = SimStack::new(journal.clone());

        let mut config = fast_config();
        config.link_mode = LinkMode::Fixed100Full;
        config.link_wait = RetryBudget::new(2, 1);
        let mut netif = Netif::new(manager, stack, config);

        assert_eq!(netif.bring_up(), Err(Error::LinkTimeout));
        assert_eq!(netif.phase(), Phase::Failed);

        netif.manager_mut().link_up_after = 0;
        assert_eq!(netif.bring_up(), Ok(()));
        assert_eq!(netif.phase(), Phase::Bound);

        // The rollback wiped the applied link mode, so the second attempt
        // re-issued it to the re-initialized manager.
        assert_eq!(journal.count(Call::SetLinkMode(LinkMode::Fixed100Full)), 2);
        assert_eq!(journal.count(Call::ManagerInit), 2);
    }

    #[test]
    fn test_ip_query_failure_is_reported() {
        let journal = Journal::new();
        let mut netif = sim_netif(&journal);
        assert_eq!(netif.bring_up(), Ok(()));

        netif.stack_mut().get_config_error = Some(-4);
        assert_eq!(
            netif.ip(),
            Err(Error::Driver {
                op: "get_config",
                code: -4
            })
        );
    }
}

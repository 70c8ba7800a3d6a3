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

use crate::driver::{check, NetManager};
use crate::error::Result;

/// Physical-layer negotiation setting: auto-negotiate, or one of the forced
/// speed/duplex combinations the adapter supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Auto,
    Fixed10Half,
    Fixed10Full,
    Fixed100Half,
    Fixed100Full,
}

/// Reported state of the physical link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up,
}

/// Remembers the link mode most recently applied to the manager so repeated
/// requests for the same mode never touch the driver. The cache is the sole
/// source of truth for the current mode; hardware is never re-queried.
#[derive(Debug)]
pub struct LinkConfig {
    current: LinkMode,
}

impl LinkConfig {
    /// A freshly initialized adapter auto-negotiates, so that is the
    /// starting cached mode.
    pub fn new() -> LinkConfig {
        LinkConfig {
            current: LinkMode::Auto,
        }
    }

    pub fn current(&self) -> LinkMode {
        self.current
    }

    /// Applies the given mode if it differs from the cached one: at most one
    /// driver call per distinct mode. The cache only moves on success, so a
    /// failed application is retried by the next call.
    pub fn apply<M: NetManager>(&mut self, manager: &mut M, mode: LinkMode) -> Result<()> {
        if mode == self.current {
            return Ok(());
        }

        check("set_link_mode", manager.set_link_mode(mode))?;
        self.current = mode;
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> LinkConfig {
        LinkConfig::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sim::{Call, Journal, SimManager};

    #[test]
    fn test_auto_twice_never_touches_driver() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        let mut link = LinkConfig::new();

        assert_eq!(link.apply(&mut manager, LinkMode::Auto), Ok(()));
        assert_eq!(link.apply(&mut manager, LinkMode::Auto), Ok(()));
        assert_eq!(journal.calls(), vec![]);
        assert_eq!(link.current(), LinkMode::Auto);
    }

    #[test]
    fn test_repeated_mode_issues_single_call() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        let mut link = LinkConfig::new();

        assert_eq!(link.apply(&mut manager, LinkMode::Fixed100Full), Ok(()));
        assert_eq!(link.apply(&mut manager, LinkMode::Fixed100Full), Ok(()));

        assert_eq!(
            journal.calls(),
            vec![Call::SetLinkMode(LinkMode::Fixed100Full)]
        );
        assert_eq!(link.current(), LinkMode::Fixed100Full);
    }

    #[test]
    fn test_mode_change_and_back() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        let mut link = LinkConfig::new();

        assert_eq!(link.apply(&mut manager, LinkMode::Fixed10Full), Ok(()));
        assert_eq!(link.apply(&mut manager, LinkMode::Auto), Ok(()));

        assert_eq!(
            journal.calls(),
            vec![
                Call::SetLinkMode(LinkMode::Fixed10Full),
                Call::SetLinkMode(LinkMode::Auto)
            ]
        );
        assert_eq!(link.current(), LinkMode::Auto);
    }

    #[test]
    fn test_failed_apply_keeps_cache() {
        let journal = Journal::new();
        let mut manager = SimManager::new(journal.clone());
        manager.set_link_mode_status = -1;
        let mut link = LinkConfig::new();

        let result = link.apply(&mut manager, LinkMode::Fixed10Half);
        assert_eq!(
            result,
            Err(Error::Driver {
                op: "set_link_mode",
                code: -1
            })
        );
        assert_eq!(link.current(), LinkMode::Auto);

        // The next attempt retries the driver call instead of assuming the
        // mode took.
        manager.set_link_mode_status = 0;
        assert_eq!(link.apply(&mut manager, LinkMode::Fixed10Half), Ok(()));
        assert_eq!(link.current(), LinkMode::Fixed10Half);
        assert_eq!(journal.count(Call::SetLinkMode(LinkMode::Fixed10Half)), 2);
    }
}

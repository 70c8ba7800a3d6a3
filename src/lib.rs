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

// Modules in dependency order: the orchestrator in netif drives the two
// appliers (link, ipcfg), which talk to the subsystems behind the driver
// traits; waiting happens through poll, which suspends on the timer
// facility. sim provides host-runnable subsystems for tests and the demo
// apps.

pub mod driver;
pub mod error;
pub mod ipcfg;
pub mod link;
pub mod netif;
pub mod poll;
pub mod sim;
pub mod timer;

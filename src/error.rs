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

use crate::driver::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while bringing the interface up. Driver
/// calls carry the status code they returned; the two timeout variants mean
/// a bounded wait spent its whole retry budget.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("driver call {op} failed with status {code}")]
    Driver { op: &'static str, code: StatusCode },

    #[error("link negotiation timed out")]
    LinkTimeout,

    #[error("DHCP negotiation timed out")]
    DhcpTimeout,
}

pub type Result<T> = std::result::Result<T, Error>;

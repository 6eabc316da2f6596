// Copyright 2026 BadCompany
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

//! Time-ordered unique ids.
//!
//! Layout, high to low: elapsed milliseconds since `start`, node id, per
//! millisecond step. Bit widths are configurable but must fit in 63 bits so
//! ids stay positive `i64`s.

use crate::engine_core::errors::CodecError;
use crate::utils::time::now_millis;
use parking_lot::Mutex;

#[derive(Debug)]
struct State {
    last_ms: i64,
    step: u64,
}

#[derive(Debug)]
pub struct Sequence {
    start_ms: i64,
    node: u64,
    time_bits: u8,
    node_bits: u8,
    step_bits: u8,
    state: Mutex<State>,
}

pub(crate) fn mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Pack the three components.
pub fn compose(elapsed_ms: i64, node: u64, step: u64, time_bits: u8, node_bits: u8, step_bits: u8) -> i64 {
    let time = (elapsed_ms.max(0) as u64) & mask(time_bits);
    let packed = (time << (node_bits + step_bits))
        | ((node & mask(node_bits)) << step_bits)
        | (step & mask(step_bits));
    packed as i64
}

impl Sequence {
    pub fn new(
        start_ms: i64,
        node: u64,
        time_bits: u8,
        node_bits: u8,
        step_bits: u8,
    ) -> Result<Self, CodecError> {
        let total = time_bits as u32 + node_bits as u32 + step_bits as u32;
        if total > 63 || time_bits == 0 || step_bits == 0 {
            return Err(CodecError::InvalidData(format!(
                "sequence bits {}/{}/{} do not fit a positive i64",
                time_bits, node_bits, step_bits
            )));
        }
        Ok(Self {
            start_ms,
            node: node & mask(node_bits),
            time_bits,
            node_bits,
            step_bits,
            state: Mutex::new(State {
                last_ms: -1,
                step: 0,
            }),
        })
    }

    pub fn node(&self) -> u64 {
        self.node
    }

    /// Next id. Never repeats and never goes backwards, even when the wall
    /// clock does; a full step counter advances to the next tick.
    pub fn next(&self) -> i64 {
        let now = (now_millis() - self.start_ms).max(0);
        let mut state = self.state.lock();
        let mut ms = now.max(state.last_ms);
        if ms == state.last_ms {
            state.step = (state.step + 1) & mask(self.step_bits);
            if state.step == 0 {
                ms += 1;
            }
        } else {
            state.step = 0;
        }
        state.last_ms = ms;
        compose(ms, self.node, state.step, self.time_bits, self.node_bits, self.step_bits)
    }

    /// Split an id into `(elapsed_ms, node, step)`.
    pub fn decompose(&self, id: i64) -> (i64, u64, u64) {
        let raw = id as u64;
        let step = raw & mask(self.step_bits);
        let node = (raw >> self.step_bits) & mask(self.node_bits);
        let elapsed = (raw >> (self.step_bits + self.node_bits)) & mask(self.time_bits);
        (elapsed as i64, node, step)
    }
}

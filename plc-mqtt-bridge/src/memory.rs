// Copyright 2025 The Drasi Authors.
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

//! In-memory implementation of [`PlcTags`].

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::ready;
use futures::stream::{self, StreamExt};
use log::{debug, warn};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::PlcError;
use crate::plc::{PlcTags, PlcValue, TagStream, TagValue};

/// A tag table held in memory.
///
/// Each tag keeps only its latest value, the way a polled PLC variable does:
/// observers see the current value on subscription and then every change they
/// manage to poll. Clones share the same table, so a driver task can write
/// while bridges observe.
#[derive(Clone, Default)]
pub struct MemoryPlc {
    tags: Arc<DashMap<String, watch::Sender<Option<PlcValue>>>>,
}

impl MemoryPlc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a tag without a value. Existing tags are left untouched.
    pub fn define(&self, variable: impl Into<String>) {
        self.tags
            .entry(variable.into())
            .or_insert_with(|| watch::channel(None).0);
    }

    /// Set the value of a tag, declaring it if needed.
    pub fn write(&self, variable: &str, value: PlcValue) {
        self.tags
            .entry(variable.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(value));
    }

    /// Latest value of a tag, `None` if it has never been written.
    pub fn read(&self, variable: &str) -> Result<Option<PlcValue>, PlcError> {
        self.tags
            .get(variable)
            .map(|sender| sender.borrow().clone())
            .ok_or_else(|| PlcError::UnknownTag(variable.to_string()))
    }

    /// Drop a tag. Open streams on it end.
    pub fn remove(&self, variable: &str) -> bool {
        self.tags.remove(variable).is_some()
    }

    pub fn tags(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tags.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl PlcTags for MemoryPlc {
    fn observe<T: TagValue>(&self, variable: &str) -> TagStream<T> {
        let receiver = match self.tags.get(variable) {
            Some(sender) => sender.subscribe(),
            None => {
                warn!("Observe requested for unknown PLC tag '{variable}'");
                return stream::once(ready(Err(PlcError::UnknownTag(variable.to_string()))))
                    .boxed();
            }
        };

        debug!("Observing PLC tag '{variable}'");
        WatchStream::new(receiver)
            .filter_map(|value| ready(value.map(T::from_plc_value)))
            .boxed()
    }
}

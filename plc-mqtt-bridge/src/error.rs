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

//! Error types for the bridge and the PLC access layer.

/// Raised synchronously when a bridge is composed from incomplete inputs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// A required input was absent, or the configure callback produced no PLC handle.
    #[error("required argument missing: {0}")]
    ArgumentMissing(&'static str),
}

/// Errors produced while observing PLC tags.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlcError {
    /// The tag is not known to the PLC.
    #[error("unknown PLC tag: {0}")]
    UnknownTag(String),
    /// The tag holds a value that cannot be read as the requested type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// The tag value does not fit the requested numeric type.
    #[error("value {value} out of range for {expected}")]
    OutOfRange { expected: &'static str, value: String },
}

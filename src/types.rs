use std::fmt::{self, Display};

use serde::{Serialize, Serializer};

pub type ChainId = u64;

pub type NetworkName = String;

pub type Wei = u64;

pub type Address = String;

pub type VariableName = String;

/// Identifier a profile expects the connected node to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkId {
    /// `"*"`, accepted by local development nodes only.
    Any,
    Id(ChainId),
}

impl NetworkId {
    /// Whether a node reporting `chain_id` satisfies this identifier.
    /// Nothing in this crate enforces it; the deployment tool decides.
    pub fn accepts(&self, chain_id: ChainId) -> bool {
        match self {
            NetworkId::Any => true,
            NetworkId::Id(id) => *id == chain_id,
        }
    }
}

impl Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkId::Any => write!(f, "*"),
            NetworkId::Id(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for NetworkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NetworkId::Any => serializer.serialize_str("*"),
            NetworkId::Id(id) => serializer.serialize_u64(*id),
        }
    }
}

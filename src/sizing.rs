// ABOUTME: Worker sizing policy mapping estimated data volume to a machine class
// ABOUTME: Pure step function over four size bands

use std::fmt;
use std::str::FromStr;

const GIB: u64 = 1024 * 1024 * 1024;

/// Named compute profile for a replication worker, in increasing
/// capability. Bands are cost-tiered for Seren-managed infrastructure:
/// Small ~ 2 vCPU/4 GB, Medium compute-optimized 2 vCPU/4 GB,
/// Large 8 vCPU/16 GB, XLarge 16 vCPU/32 GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MachineClass {
    Small,
    Medium,
    Large,
    XLarge,
}

impl MachineClass {
    /// Provider-side instance type name for this class.
    pub fn instance_type(self) -> &'static str {
        match self {
            MachineClass::Small => "t3.medium",
            MachineClass::Medium => "c5.large",
            MachineClass::Large => "c5.2xlarge",
            MachineClass::XLarge => "c5.4xlarge",
        }
    }
}

impl fmt::Display for MachineClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.instance_type())
    }
}

impl FromStr for MachineClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "t3.medium" => Ok(MachineClass::Small),
            "c5.large" => Ok(MachineClass::Medium),
            "c5.2xlarge" => Ok(MachineClass::Large),
            "c5.4xlarge" => Ok(MachineClass::XLarge),
            other => anyhow::bail!("unknown machine class: {}", other),
        }
    }
}

/// Picks a machine class for an estimated data volume. A zero (or absent)
/// estimate means "unknown size", which maps to the configured default
/// rather than the smallest band.
pub fn choose_class(estimated_size_bytes: u64, default: MachineClass) -> MachineClass {
    if estimated_size_bytes == 0 {
        return default;
    }
    if estimated_size_bytes < 10 * GIB {
        MachineClass::Small
    } else if estimated_size_bytes < 100 * GIB {
        MachineClass::Medium
    } else if estimated_size_bytes < 1024 * GIB {
        MachineClass::Large
    } else {
        MachineClass::XLarge
    }
}

//! VID:PID device filters

use std::fmt;

/// Parsed `0xVID:0xPID` pattern; either side may be `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    vendor_id: Option<u16>,
    product_id: Option<u16>,
}

impl DeviceFilter {
    /// Parse a filter pattern
    pub fn parse(filter: &str) -> Result<Self, String> {
        let parts: Vec<&str> = filter.split(':').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Invalid filter format '{}', expected VID:PID (e.g., '0x8087:0x0b37' or '0x8087:*')",
                filter
            ));
        }

        Ok(Self {
            vendor_id: Self::parse_part(parts[0], "VID")?,
            product_id: Self::parse_part(parts[1], "PID")?,
        })
    }

    fn parse_part(id: &str, name: &str) -> Result<Option<u16>, String> {
        if id == "*" {
            return Ok(None);
        }

        let hex_part = id
            .strip_prefix("0x")
            .or_else(|| id.strip_prefix("0X"))
            .ok_or_else(|| {
                format!(
                    "Invalid {} '{}', must start with '0x' (e.g., '0x8087')",
                    name, id
                )
            })?;

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(format!(
                "Invalid {} '{}', hex part must be 1-4 digits",
                name, id
            ));
        }

        u16::from_str_radix(hex_part, 16)
            .map(Some)
            .map_err(|_| format!("Invalid {} '{}', not a valid hex number", name, id))
    }

    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        self.vendor_id.is_none_or(|v| v == vid) && self.product_id.is_none_or(|p| p == pid)
    }

    /// Whether any filter accepts the device; an empty list accepts everything
    pub fn any_matches(filters: &[DeviceFilter], vid: u16, pid: u16) -> bool {
        filters.is_empty() || filters.iter().any(|f| f.matches(vid, pid))
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vendor_id {
            Some(v) => write!(f, "{:#06x}", v)?,
            None => write!(f, "*")?,
        }
        match self.product_id {
            Some(p) => write!(f, ":{:#06x}", p),
            None => write!(f, ":*"),
        }
    }
}

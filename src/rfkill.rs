// SPDX-License-Identifier: MIT

//! rfkill state via the sysfs mirror.
//!
//! The rfkill node for a wireless interface lives under
//! `/sys/class/net/<if>/phy80211/rfkill<N>/` with `hard` and `soft` files
//! holding `0` or `1`. An interface without a node simply has no kill
//! switch.

use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfkillKind {
    Hard,
    Soft,
}

impl RfkillKind {
    fn file(self) -> &'static str {
        match self {
            RfkillKind::Hard => "hard",
            RfkillKind::Soft => "soft",
        }
    }
}

fn rfkill_dir(ifname: &str) -> io::Result<Option<PathBuf>> {
    let phy = PathBuf::from("/sys/class/net").join(ifname).join("phy80211");
    let entries = match fs::read_dir(&phy) {
        Ok(entries) => entries,
        // No phy80211 node means no rfkill to worry about.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with("rfkill")
        {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Whether the given rfkill switch is engaged. Interfaces without an rfkill
/// node report `false`.
pub fn get(ifname: &str, kind: RfkillKind) -> io::Result<bool> {
    let Some(dir) = rfkill_dir(ifname)? else {
        return Ok(false);
    };
    let raw = fs::read_to_string(dir.join(kind.file()))?;
    Ok(raw.trim() == "1")
}

/// Release the soft rfkill switch.
pub fn clear(ifname: &str) -> io::Result<()> {
    let Some(dir) = rfkill_dir(ifname)? else {
        return Ok(());
    };
    fs::write(dir.join(RfkillKind::Soft.file()), "0")
}

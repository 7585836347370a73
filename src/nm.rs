// SPDX-License-Identifier: MIT

//! NetworkManager integration over the system bus.
//!
//! A managed interface gets re-typed and re-activated behind our back, so
//! the open path asks NetworkManager to stop managing the interface and the
//! teardown path hands it back. NetworkManager being absent or unreachable
//! is never an error worth failing an open for; callers treat every error
//! here as informational.
//!
//! The bus connection is scoped to each call: NetworkManager keeps pushing
//! state reports at connected clients, so holding a connection for the
//! lifetime of the capture would have it buffering reports forever.

use zbus::zvariant::OwnedObjectPath;
use zbus::Connection;

#[zbus::proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
trait NetworkManager {
    fn get_devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;
}

#[zbus::proxy(
    interface = "org.freedesktop.NetworkManager.Device",
    default_service = "org.freedesktop.NetworkManager"
)]
trait Device {
    #[zbus(property)]
    fn interface(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn managed(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn set_managed(&self, value: bool) -> zbus::Result<()>;
}

async fn find_device<'a>(
    conn: &'a Connection,
    ifname: &str,
) -> zbus::Result<Option<DeviceProxy<'a>>> {
    let nm = NetworkManagerProxy::new(conn).await?;
    for path in nm.get_devices().await? {
        let device = DeviceProxy::builder(conn).path(path)?.build().await?;
        if device.interface().await? == ifname {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Ask NetworkManager to stop managing `ifname`.
///
/// Returns whether the device was managed before the call, i.e. whether
/// management should be handed back on exit.
pub async fn quiesce(ifname: &str) -> zbus::Result<bool> {
    let conn = Connection::system().await?;
    let Some(device) = find_device(&conn, ifname).await? else {
        return Ok(false);
    };
    let was_managed = device.managed().await?;
    if was_managed {
        device.set_managed(false).await?;
    }
    Ok(was_managed)
}

/// Hand `ifname` back to NetworkManager.
pub async fn restore(ifname: &str) -> zbus::Result<()> {
    let conn = Connection::system().await?;
    if let Some(device) = find_device(&conn, ifname).await? {
        device.set_managed(true).await?;
    }
    Ok(())
}

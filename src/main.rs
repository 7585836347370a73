// SPDX-License-Identifier: MIT

//! Privileged single-interface Wi-Fi capture helper.
//!
//! Spawned by the parent telemetry process with a pair of inherited file
//! descriptors carrying the control protocol. Needs to run (and stay) as
//! root: interface and channel control require it for the whole lifetime
//! of the capture, not just at open.

use std::time::Duration;

use clap::Parser;
use log::{error, info};

use wificap::{CaptureFramework, WifiSource, HOP_SHUFFLE_SPACING};

#[derive(Parser)]
#[command(
    name = "wificap",
    about = "Linux Wi-Fi monitor-mode capture helper",
    version
)]
struct Args {
    /// Inherited descriptor the parent sends commands on.
    #[arg(long = "in-fd")]
    in_fd: i32,

    /// Inherited descriptor responses and packets are written to.
    #[arg(long = "out-fd")]
    out_fd: i32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("wificap launched on pid {}", std::process::id());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let mut framework =
        CaptureFramework::new(args.in_fd, args.out_fd, WifiSource::new());
    // Spread 2.4 GHz hops across the overlap; no effect on 5 GHz.
    framework.set_hop_shuffle_spacing(HOP_SHUFFLE_SPACING);

    let source = runtime.block_on(framework.run());

    runtime.block_on(source.teardown());

    // Deliberately never exit: the parent drains the control channel and
    // then kills us. Exiting on our own races the protocol flush.
    error!("exited the command loop, waiting for the parent to reap us");
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}

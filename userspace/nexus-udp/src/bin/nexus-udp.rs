// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

fn main() {
    env_logger::init();
    nexus_udp::cli::run();
}

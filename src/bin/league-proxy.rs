// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stand-alone proxy.
//!
//!  Build it with `cargo build --release --bin league-proxy`
//!  Configuration comes from LEAGUE_PROXY_* env vars, plus the file named by
//!  LEAGUE_PROXY_CONFIG_FILE when set. Arguments after `--` are handed to
//!  the game client.

use std::env;
use std::error::Error;

use league_proxy::{LeagueProxy, error_fmt, info_fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut loader = LeagueProxy::loader().with_env_vars();
    if let Ok(path) = env::var("LEAGUE_PROXY_CONFIG_FILE") {
        println!("Using configuration from {path}");
        loader = loader.with_config_file(&path);
    }

    let proxy = match loader.build() {
        Ok(p) => p,
        Err(e) => {
            println!("Failed to build proxy: {e}");
            return Err(e.into());
        }
    };

    let client_args: Vec<String> = env::args().skip_while(|arg| arg != "--").skip(1).collect();

    let urls = proxy.start().await?;
    info_fmt!("LeagueProxy", "Config proxy listening on {}", urls.config);
    info_fmt!("LeagueProxy", "Ledge proxy listening on {}", urls.ledge);

    if proxy.launcher().config().enabled {
        match proxy.launch_client(&client_args).await {
            Ok(child) => info_fmt!("LeagueProxy", "Client started (pid {:?})", child.id()),
            Err(e) => error_fmt!("LeagueProxy", "Failed to start client: {}", e),
        }
    }

    match proxy.run_until_signal().await {
        Ok(()) => info_fmt!("LeagueProxy", "Proxy stopped gracefully"),
        Err(e) => {
            error_fmt!("LeagueProxy", "Proxy failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

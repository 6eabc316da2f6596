// Copyright 2026 BadCompany
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

// Command line entry point for the bindery kernel tools
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::debug;

use bindery::config::Config;
use bindery::engine_core::value::{map_from_json, map_to_json, Value};
use bindery::kernel::Kernel;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign or verify identity tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Run a value through a named codec
    Codec {
        #[command(subcommand)]
        action: CodecAction,
    },

    /// Print a fresh unique id
    Id {
        /// Text placed before the id
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

#[derive(Subcommand, Debug)]
enum TokenAction {
    /// Sign a token carrying the given claims
    Sign {
        /// Claims as a JSON object
        #[arg(long, default_value = "{}")]
        payload: String,

        #[arg(long, default_value = "")]
        role: String,

        /// Mark the token as authorized
        #[arg(long)]
        auth: bool,

        /// Lifetime in seconds
        #[arg(long)]
        expires: Option<u64>,
    },

    /// Verify a token and print its header and claims
    Verify { token: String },
}

#[derive(Subcommand, Debug)]
enum CodecAction {
    Encrypt {
        #[arg(long, default_value = "text")]
        codec: String,
        value: String,
    },
    Decrypt {
        #[arg(long, default_value = "text")]
        codec: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    install_panic_hook();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config from env, using defaults: {}", e);
        Config::default()
    });

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }

    let kernel = Kernel::new(config)?;
    debug!("Running {:?}", cli.command);

    match cli.command {
        Command::Token { action } => match action {
            TokenAction::Sign {
                payload,
                role,
                auth,
                expires,
            } => {
                let claims: serde_json::Value =
                    serde_json::from_str(&payload).context("payload must be JSON")?;
                if !claims.is_object() {
                    anyhow::bail!("payload must be a JSON object");
                }
                let (_, text) = kernel.tokens().issue(
                    auth,
                    map_from_json(claims),
                    expires.map(Duration::from_secs),
                    &role,
                )?;
                println!("{}", text);
            }
            TokenAction::Verify { token } => {
                let token = kernel.tokens().verify(&token).context("token rejected")?;
                let report = serde_json::json!({
                    "id": token.header.id,
                    "role": token.header.role,
                    "authorized": token.header.authorized,
                    "issued": token.header.issued,
                    "expires": token.header.expires,
                    "payload": map_to_json(&token.payload),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        },
        Command::Codec { action } => match action {
            CodecAction::Encrypt { codec, value } => {
                let text = kernel.codecs().encrypt(&codec, &Value::Str(value))?;
                println!("{}", text);
            }
            CodecAction::Decrypt { codec, value } => {
                let plain = kernel.codecs().decrypt(&codec, &value)?;
                println!("{}", plain);
            }
        },
        Command::Id { prefix } => {
            println!("{}", kernel.generate(&prefix));
        }
    }

    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

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

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use log::{error, info};
use plc_mqtt_bridge::{
    managed_client_stream, MemoryPlc, MqttClientConfig, PlcValue, PublishPlcTagExt,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = MqttClientConfig::from_env()?;
    let topic = env::var("MQTT_TOPIC").unwrap_or_else(|_| "plc/tag1".to_string());
    let variable = env::var("PLC_VARIABLE").unwrap_or_else(|_| "DB1.DBW0".to_string());
    let scan_ms: u64 = env::var("PLC_SCAN_MS")
        .unwrap_or_else(|_| "1000".to_string())
        .parse()
        .context("Invalid PLC_SCAN_MS")?;

    info!(
        "Starting tag gateway (broker={}:{}, tag={variable}, topic={topic})",
        config.broker_host, config.port
    );

    // 1. Simulated PLC: a word counter advanced once per scan
    let plc = MemoryPlc::new();
    plc.write(&variable, PlcValue::Word(0));

    let simulator = plc.clone();
    let simulated_tag = variable.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(scan_ms));
        let mut counter: u16 = 0;
        loop {
            interval.tick().await;
            counter = counter.wrapping_add(1);
            simulator.write(&simulated_tag, PlcValue::Word(counter));
        }
    });

    // 2. Bridge the tag onto the managed MQTT client
    let mut results = managed_client_stream(&config)?
        .publish_plc_tag::<u16, _, _>(&topic, &variable, move || Some(plc))?;

    // 3. Drain results until Ctrl-C
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            next = results.next() => {
                match next {
                    Some(Ok(processed)) if processed.is_success() => {
                        info!("Queued {} -> '{}' ({})", processed.message.payload, processed.message.topic, processed.id);
                    }
                    Some(Ok(processed)) => {
                        error!("Failed to queue {}: {}", processed.id, processed.error.unwrap_or_default());
                    }
                    Some(Err(e)) => error!("Tag bridge error: {e}"),
                    None => break,
                }
            }
        }
    }

    Ok(())
}

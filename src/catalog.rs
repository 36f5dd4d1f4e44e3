//! Channel catalog loading and display grouping

use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::api::BackendClient;
use crate::error::Result;
use crate::models::{Channel, ChannelCategory, NationalSubCategory, SubCategory};

/// Keeps valid rows, logging and skipping the rest
pub fn parse_channels(rows: Vec<serde_json::Value>) -> Vec<Channel> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<Channel>(row) {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!("Skipping channel row: {}", e);
                None
            }
        })
        .collect()
}

pub fn load_from_file(path: &Path) -> Result<Vec<Channel>> {
    let content = fs::read_to_string(path)?;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&content)?;
    Ok(parse_channels(rows))
}

/// Backend feed when configured, else the local file. Never fails: an
/// unavailable feed yields an empty list.
pub fn load_channels(client: Option<&BackendClient>, local: &Path) -> Vec<Channel> {
    let result = match client {
        Some(client) => client.fetch_channel_rows().map(parse_channels),
        None => load_from_file(local),
    };

    match result {
        Ok(channels) => {
            info!("Loaded {} live channels", channels.len());
            channels
        }
        Err(e) => {
            warn!("Live channels unavailable, showing none: {}", e);
            Vec::new()
        }
    }
}

/// National channels grouped HINDI, ENGLISH, BUSINESS; empty groups omitted
pub fn group_national(channels: &[Channel]) -> Vec<(NationalSubCategory, Vec<Channel>)> {
    NationalSubCategory::ORDER
        .iter()
        .filter_map(|sub| {
            let group: Vec<Channel> = channels
                .iter()
                .filter(|c| matches!(c.sub_category(), SubCategory::National(s) if s == sub))
                .cloned()
                .collect();
            (!group.is_empty()).then_some((*sub, group))
        })
        .collect()
}

/// Regional channels grouped by state, states in first-seen order. A channel
/// serving several states appears in each of them.
pub fn group_regional(channels: &[Channel]) -> Vec<(String, Vec<Channel>)> {
    let mut groups: Vec<(String, Vec<Channel>)> = Vec::new();

    for channel in channels.iter().filter(|c| c.category() == ChannelCategory::Regional) {
        let SubCategory::Regional(states) = channel.sub_category() else {
            continue;
        };
        for state in states {
            match groups.iter_mut().find(|(name, _)| name == state) {
                Some((_, members)) => members.push(channel.clone()),
                None => groups.push((state.clone(), vec![channel.clone()])),
            }
        }
    }

    groups
}

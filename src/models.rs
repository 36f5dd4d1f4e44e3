//! Data models for the live news player

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// UI Tab selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab {
    National,
    Regional,
    Settings,
}

/// Broadcast scope of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelCategory {
    National,
    Regional,
}

/// Language or topic of a national channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NationalSubCategory {
    Hindi,
    English,
    Business,
}

impl NationalSubCategory {
    /// Display order of the national groups
    pub const ORDER: [NationalSubCategory; 3] = [
        NationalSubCategory::Hindi,
        NationalSubCategory::English,
        NationalSubCategory::Business,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NationalSubCategory::Hindi => "HINDI",
            NationalSubCategory::English => "ENGLISH",
            NationalSubCategory::Business => "BUSINESS",
        }
    }
}

/// Sub-category; its shape is determined by the channel category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubCategory {
    National(NationalSubCategory),
    Regional(Vec<String>), // state names
}

impl SubCategory {
    pub fn category(&self) -> ChannelCategory {
        match self {
            SubCategory::National(_) => ChannelCategory::National,
            SubCategory::Regional(_) => ChannelCategory::Regional,
        }
    }

    /// Text shown under the channel name in the player
    pub fn display(&self) -> String {
        match self {
            SubCategory::National(sub) => sub.as_str().to_string(),
            SubCategory::Regional(states) => states.join(", "),
        }
    }
}

/// Row shape of the channel feed
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChannelRow {
    id: String,
    name: String,
    #[serde(rename = "logoUrl", alias = "logo_url", default)]
    logo_url: String,
    #[serde(rename = "streamUrl", alias = "stream_url")]
    stream_url: String,
    category: ChannelCategory,
    #[serde(rename = "subCategory", alias = "sub_category")]
    sub_category: SubCategory,
}

/// Live channel descriptor, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChannelRow", into = "ChannelRow")]
pub struct Channel {
    id: String,
    name: String,
    logo_url: String,
    stream_url: String,
    sub_category: SubCategory,
}

impl Channel {
    pub fn national(
        id: &str,
        name: &str,
        logo_url: &str,
        stream_url: &str,
        sub_category: NationalSubCategory,
    ) -> Result<Self, Error> {
        Self::build(id, name, logo_url, stream_url, SubCategory::National(sub_category))
    }

    pub fn regional(
        id: &str,
        name: &str,
        logo_url: &str,
        stream_url: &str,
        states: Vec<String>,
    ) -> Result<Self, Error> {
        Self::build(id, name, logo_url, stream_url, SubCategory::Regional(states))
    }

    fn build(
        id: &str,
        name: &str,
        logo_url: &str,
        stream_url: &str,
        sub_category: SubCategory,
    ) -> Result<Self, Error> {
        if stream_url.trim().is_empty() {
            return Err(Error::invalid_channel(id, "stream locator is empty"));
        }
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            logo_url: logo_url.to_string(),
            stream_url: stream_url.trim().to_string(),
            sub_category,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logo_url(&self) -> &str {
        &self.logo_url
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn category(&self) -> ChannelCategory {
        self.sub_category.category()
    }

    pub fn sub_category(&self) -> &SubCategory {
        &self.sub_category
    }
}

impl TryFrom<ChannelRow> for Channel {
    type Error = Error;

    fn try_from(row: ChannelRow) -> Result<Self, Self::Error> {
        if row.sub_category.category() != row.category {
            return Err(Error::invalid_channel(
                &row.id,
                format!("sub-category shape does not match category {:?}", row.category),
            ));
        }
        Self::build(&row.id, &row.name, &row.logo_url, &row.stream_url, row.sub_category)
    }
}

impl From<Channel> for ChannelRow {
    fn from(channel: Channel) -> Self {
        Self {
            category: channel.category(),
            id: channel.id,
            name: channel.name,
            logo_url: channel.logo_url,
            stream_url: channel.stream_url,
            sub_category: channel.sub_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_national_row() {
        let json = r#"{"id":"c1","name":"News One","logoUrl":"https://x/logo.png",
            "streamUrl":"https://x/live.m3u8","category":"NATIONAL","subCategory":"ENGLISH"}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.id(), "c1");
        assert_eq!(channel.category(), ChannelCategory::National);
        assert_eq!(
            channel.sub_category(),
            &SubCategory::National(NationalSubCategory::English)
        );
        assert_eq!(channel.sub_category().display(), "ENGLISH");
    }

    #[test]
    fn test_parse_regional_row_snake_case() {
        let json = r#"{"id":"r1","name":"State News","logo_url":"",
            "stream_url":"https://x/r1.m3u8","category":"REGIONAL",
            "sub_category":["Bihar","Jharkhand"]}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.category(), ChannelCategory::Regional);
        assert_eq!(channel.sub_category().display(), "Bihar, Jharkhand");
    }

    #[test]
    fn test_reject_mismatched_shape() {
        let json = r#"{"id":"bad","name":"Bad","logoUrl":"","streamUrl":"https://x/a.m3u8",
            "category":"REGIONAL","subCategory":"HINDI"}"#;
        assert!(serde_json::from_str::<Channel>(json).is_err());
    }

    #[test]
    fn test_reject_empty_stream_url() {
        let result = Channel::national("c2", "Empty", "", "  ", NationalSubCategory::Hindi);
        assert!(matches!(result, Err(Error::InvalidChannel { .. })));
    }

    #[test]
    fn test_serialize_keeps_feed_shape() {
        let channel = Channel::regional(
            "r2",
            "Coastal",
            "",
            "https://x/r2.m3u8",
            vec!["Goa".to_string()],
        )
        .unwrap();
        let value = serde_json::to_value(&channel).unwrap();
        assert_eq!(value["category"], "REGIONAL");
        assert_eq!(value["streamUrl"], "https://x/r2.m3u8");
        assert_eq!(value["subCategory"][0], "Goa");
    }
}

use crate::error::InitProcessError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketConfig {
    pub dscp: u8,
    pub ecn: u8,
    pub identification: u16,
    pub dont_fragment: bool,
    pub more_fragments: bool,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub source_address: String,
    pub destination_address: String,
    pub payload: String,
}

impl PacketConfig {
    pub fn from_env() -> Result<Self, InitProcessError> {
        dotenv::dotenv().ok();

        Ok(PacketConfig {
            dscp: std::env::var("PACKET_DSCP")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|e| InitProcessError::EnvVarParseError(format!("無効なDSCP値: {}", e)))?,
            ecn: std::env::var("PACKET_ECN")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|e| InitProcessError::EnvVarParseError(format!("無効なECN値: {}", e)))?,
            // 未指定の場合は実際のスタックと同様にランダムに採番する
            identification: match std::env::var("PACKET_IDENTIFICATION") {
                Ok(value) => value.parse().map_err(|e| {
                    InitProcessError::EnvVarParseError(format!("無効な識別子: {}", e))
                })?,
                Err(_) => rand::random::<u16>(),
            },
            dont_fragment: std::env::var("PACKET_DONT_FRAGMENT")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|e| {
                    InitProcessError::EnvVarParseError(format!("無効なDFフラグ: {}", e))
                })?,
            more_fragments: std::env::var("PACKET_MORE_FRAGMENTS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|e| {
                    InitProcessError::EnvVarParseError(format!("無効なMFフラグ: {}", e))
                })?,
            fragment_offset: std::env::var("PACKET_FRAGMENT_OFFSET")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|e| {
                    InitProcessError::EnvVarParseError(format!("無効なフラグメントオフセット: {}", e))
                })?,
            ttl: std::env::var("PACKET_TTL")
                .unwrap_or_else(|_| "64".to_string())
                .parse()
                .map_err(|e| InitProcessError::EnvVarParseError(format!("無効なTTL: {}", e)))?,
            protocol: std::env::var("PACKET_PROTOCOL")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .map_err(|e| {
                    InitProcessError::EnvVarParseError(format!("無効なプロトコル番号: {}", e))
                })?,
            source_address: std::env::var("PACKET_SOURCE_ADDRESS")
                .unwrap_or_else(|_| "192.168.1.10".to_string()),
            destination_address: std::env::var("PACKET_DESTINATION_ADDRESS")
                .unwrap_or_else(|_| "192.168.1.20".to_string()),
            payload: std::env::var("PACKET_PAYLOAD").unwrap_or_else(|_| "ahoj".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            dscp: 0,
            ecn: 0,
            identification: 12345,
            dont_fragment: true,
            more_fragments: false,
            fragment_offset: 0,
            ttl: 64,
            protocol: 6,
            source_address: "192.168.1.10".to_string(),
            destination_address: "192.168.1.20".to_string(),
            payload: "ahoj".to_string(),
        }
    }
}

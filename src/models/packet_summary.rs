use crate::network::packet::ipv4::IPv4Packet;
use serde::{Deserialize, Serialize};

/// デコード結果の表示用モデル。アドレスはドット区切り文字列に変換する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketSummary {
    pub version: u8,
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub total_length: u16,
    pub identification: u16,
    pub dont_fragment: bool,
    pub more_fragments: bool,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub header_checksum: u16,
    pub source_address: String,
    pub destination_address: String,
    pub payload_length: usize,
    pub checksum_valid: bool,
}

impl PacketSummary {
    pub fn from_packet(packet: &IPv4Packet) -> Self {
        PacketSummary {
            version: packet.version,
            ihl: packet.ihl,
            dscp: packet.dscp,
            ecn: packet.ecn,
            total_length: packet.total_length,
            identification: packet.identification,
            dont_fragment: packet.dont_fragment,
            more_fragments: packet.more_fragments,
            fragment_offset: packet.fragment_offset,
            ttl: packet.ttl,
            protocol: packet.protocol,
            header_checksum: packet.header_checksum,
            source_address: packet.source.to_string(),
            destination_address: packet.destination.to_string(),
            payload_length: packet.payload.len(),
            checksum_valid: packet.verify_checksum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serialization() {
        let mut packet = IPv4Packet::new(
            4,
            5,
            0,
            0,
            24,
            12345,
            true,
            false,
            0,
            64,
            6,
            0,
            "192.168.1.10",
            "192.168.1.20",
            b"ahoj".to_vec(),
        )
        .expect("パケットの構築に失敗しました");
        packet.header_checksum = packet.compute_checksum();

        let summary = PacketSummary::from_packet(&packet);
        assert!(summary.checksum_valid);
        assert_eq!(summary.payload_length, 4);

        let json = serde_json::to_string(&summary).expect("シリアライズに失敗しました");
        assert!(json.contains("\"source_address\":\"192.168.1.10\""));
        assert!(json.contains("\"destination_address\":\"192.168.1.20\""));
    }
}

use crate::config::packet_config::PacketConfig;
use crate::error::InitProcessError;
use crate::models::packet_summary::PacketSummary;
use crate::network::packet::ipv4::IPv4Packet;
use crate::setup_logger::setup_logger;
use log::info;

mod config;
mod error;
mod models;
mod network;
mod setup_logger;

fn main() -> Result<(), InitProcessError> {
    setup_logger().map_err(|e| InitProcessError::LoggerError(e.to_string()))?;

    let config = PacketConfig::from_env()?;
    let payload = config.payload.clone().into_bytes();
    let total_length = u16::try_from(20 + payload.len())
        .map_err(|e| InitProcessError::PacketBuildError(e.to_string()))?;

    let mut packet = IPv4Packet::new(
        4,
        5, // 20 (ヘッダ全長) / 4 (1ワード4バイト) = 5
        config.dscp,
        config.ecn,
        total_length,
        config.identification,
        config.dont_fragment,
        config.more_fragments,
        config.fragment_offset,
        config.ttl,
        config.protocol,
        0, // チェックサムは全フィールド確定後に計算して設定する
        &config.source_address,
        &config.destination_address,
        payload,
    )
    .map_err(|e| InitProcessError::PacketBuildError(e.to_string()))?;

    packet.header_checksum = packet.compute_checksum();

    // パケットを2進数表現(0と1)で出力する
    println!("{}", packet.to_binary());

    // エンコード結果を解析し直してサマリをログに出す
    let bytes = packet.to_bytes();
    let decoded =
        IPv4Packet::parse(&bytes).map_err(|e| InitProcessError::PacketBuildError(e.to_string()))?;
    let summary = PacketSummary::from_packet(&decoded);
    info!(
        "エンコード結果: {}",
        serde_json::to_string(&summary)
            .map_err(|e| InitProcessError::SerializeError(e.to_string()))?
    );

    Ok(())
}

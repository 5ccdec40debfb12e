use crate::error::{PacketError, PacketResult};
use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

// 0                   1                   2                   3
// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |Version|  IHL  |   DSCP    |ECN|          Total Length         |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |         Identification        |Flags|      Fragment Offset    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Time to Live |    Protocol   |         Header Checksum       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                       Source Address                          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Destination Address                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Options                    |    Padding    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IPv4Packet {
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
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub options: Vec<u8>,
    pub payload: Vec<u8>,
}

impl IPv4Packet {
    /// 全フィールドを検証した上でパケットを構築する。
    /// header_checksumは渡された値をそのまま保持する(0のまま構築し、
    /// 後からcompute_checksumの結果を設定するのが通例)。
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: u8,
        ihl: u8,
        dscp: u8,
        ecn: u8,
        total_length: u16,
        identification: u16,
        dont_fragment: bool,
        more_fragments: bool,
        fragment_offset: u16,
        ttl: u8,
        protocol: u8,
        header_checksum: u16,
        source_address: &str,
        destination_address: &str,
        payload: Vec<u8>,
    ) -> PacketResult<Self> {
        let source = source_address
            .parse::<Ipv4Addr>()
            .map_err(|_| PacketError::InvalidAddressFormat(source_address.to_string()))?;
        let destination = destination_address
            .parse::<Ipv4Addr>()
            .map_err(|_| PacketError::InvalidAddressFormat(destination_address.to_string()))?;

        let packet = Self {
            version,
            ihl,
            dscp,
            ecn,
            total_length,
            identification,
            dont_fragment,
            more_fragments,
            fragment_offset,
            ttl,
            protocol,
            header_checksum,
            source,
            destination,
            options: Vec::new(),
            payload,
        };
        packet.validate()?;

        Ok(packet)
    }

    fn validate(&self) -> PacketResult<()> {
        if self.version != 4 {
            return Err(PacketError::InvalidFieldRange(format!(
                "version = {} (4のみ)",
                self.version
            )));
        }
        if self.ihl < 5 || self.ihl > 15 {
            return Err(PacketError::InvalidFieldRange(format!(
                "ihl = {} (5〜15)",
                self.ihl
            )));
        }
        if self.dscp > 0x3F {
            return Err(PacketError::InvalidFieldRange(format!(
                "dscp = {} (0〜63)",
                self.dscp
            )));
        }
        if self.ecn > 0x3 {
            return Err(PacketError::InvalidFieldRange(format!(
                "ecn = {} (0〜3)",
                self.ecn
            )));
        }
        if self.fragment_offset > 0x1FFF {
            return Err(PacketError::InvalidFieldRange(format!(
                "fragment_offset = {} (0〜8191)",
                self.fragment_offset
            )));
        }
        if self.options.len() != (self.ihl as usize - 5) * 4 {
            return Err(PacketError::LengthMismatch(format!(
                "オプション長 {} がihl {} に対応しません",
                self.options.len(),
                self.ihl
            )));
        }
        let expected = self.header_len() + self.payload.len();
        if self.total_length as usize != expected {
            return Err(PacketError::LengthMismatch(format!(
                "total_length = {} (期待値 {})",
                self.total_length, expected
            )));
        }

        Ok(())
    }

    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }

    pub fn parse(data: &[u8]) -> PacketResult<Self> {
        if data.len() < 20 {
            return Err(PacketError::BufferTooShort {
                required: 20,
                actual: data.len(),
            });
        }

        let version = (data[0] >> 4) & 0xF;
        if version != 4 {
            return Err(PacketError::InvalidVersion(version));
        }

        let ihl = data[0] & 0xF;
        let header_len = ihl as usize * 4;
        if header_len < 20 {
            return Err(PacketError::LengthMismatch(format!("ihl = {} (最低5)", ihl)));
        }
        if data.len() < header_len {
            return Err(PacketError::BufferTooShort {
                required: header_len,
                actual: data.len(),
            });
        }

        let total_length = u16::from_be_bytes([data[2], data[3]]);
        if (total_length as usize) < header_len {
            return Err(PacketError::LengthMismatch(format!(
                "total_length = {} がヘッダ長 {} を下回っています",
                total_length, header_len
            )));
        }
        if data.len() < total_length as usize {
            return Err(PacketError::BufferTooShort {
                required: total_length as usize,
                actual: data.len(),
            });
        }

        let dscp = data[1] >> 2;
        let ecn = data[1] & 0x3;
        let identification = u16::from_be_bytes([data[4], data[5]]);
        let dont_fragment = data[6] & 0x40 != 0;
        let more_fragments = data[6] & 0x20 != 0;
        let fragment_offset = u16::from_be_bytes([data[6] & 0x1F, data[7]]);
        let ttl = data[8];
        let protocol = data[9];
        let header_checksum = u16::from_be_bytes([data[10], data[11]]);
        let source = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let destination = Ipv4Addr::new(data[16], data[17], data[18], data[19]);
        let options = data[20..header_len].to_vec();
        // total_lengthを超える後続バイトは無視する
        let payload = data[header_len..total_length as usize].to_vec();

        Ok(Self {
            version,
            ihl,
            dscp,
            ecn,
            total_length,
            identification,
            dont_fragment,
            more_fragments,
            fragment_offset,
            ttl,
            protocol,
            header_checksum,
            source,
            destination,
            options,
            payload,
        })
    }

    fn put_header(&self, buf: &mut BytesMut, checksum: u16) {
        buf.put_u8(self.version << 4 | self.ihl);
        buf.put_u8(self.dscp << 2 | self.ecn);
        buf.put_u16(self.total_length);
        buf.put_u16(self.identification);

        // 予約ビット(最上位)は常に0
        let mut flags_fragment = self.fragment_offset;
        if self.dont_fragment {
            flags_fragment |= 0x4000;
        }
        if self.more_fragments {
            flags_fragment |= 0x2000;
        }
        buf.put_u16(flags_fragment);

        buf.put_u8(self.ttl);
        buf.put_u8(self.protocol);
        buf.put_u16(checksum);
        buf.put_slice(&self.source.octets());
        buf.put_slice(&self.destination.octets());
        buf.put_slice(&self.options);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.total_length as usize);
        self.put_header(&mut buf, self.header_checksum);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// チェックサムフィールドを0としたヘッダ全体について16ビットワードの
    /// 和を取り、桁あふれを折り返した後の1の補数を返す。パケットは変更しない。
    pub fn compute_checksum(&self) -> u16 {
        let mut header = BytesMut::with_capacity(self.header_len());
        self.put_header(&mut header, 0);

        let mut sum = 0u32;
        for word in header.chunks(2) {
            let value = if word.len() == 2 {
                u16::from_be_bytes([word[0], word[1]]) as u32
            } else {
                // 奇数長の場合は下位バイトを0でパディングする
                (word[0] as u32) << 8
            };
            sum = sum.wrapping_add(value);
        }
        while sum >> 16 != 0 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }

        !(sum as u16)
    }

    pub fn verify_checksum(&self) -> bool {
        self.compute_checksum() == self.header_checksum
    }

    pub fn bits(&self) -> BinaryBits {
        BinaryBits {
            bytes: self.to_bytes(),
            pos: 0,
        }
    }

    pub fn to_binary(&self) -> String {
        self.bits().collect()
    }
}

/// エンコード結果の全ビットを上位ビットから順に'0'/'1'として返すイテレータ。
/// Cloneすれば先頭から再走査できる。
#[derive(Debug, Clone)]
pub struct BinaryBits {
    bytes: Bytes,
    pos: usize,
}

impl Iterator for BinaryBits {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        if self.pos >= self.bytes.len() * 8 {
            return None;
        }

        let byte = self.bytes[self.pos / 8];
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;

        Some(if bit == 1 { '1' } else { '0' })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge_packet() -> IPv4Packet {
        let payload = b"ahoj".to_vec();
        IPv4Packet::new(
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
            payload,
        )
        .expect("パケットの構築に失敗しました")
    }

    #[test]
    fn test_encode_challenge_packet() {
        let mut packet = challenge_packet();
        packet.header_checksum = packet.compute_checksum();

        let expected: [u8; 24] = [
            0x45, 0x00, 0x00, 0x18, 0x30, 0x39, 0x40, 0x00, 0x40, 0x06, 0x87, 0x38, 0xC0, 0xA8,
            0x01, 0x0A, 0xC0, 0xA8, 0x01, 0x14, 0x61, 0x68, 0x6F, 0x6A,
        ];
        assert_eq!(packet.to_bytes().as_ref(), expected.as_slice());
    }

    #[test]
    fn test_checksum_is_deterministic() {
        let packet = challenge_packet();
        assert_eq!(packet.compute_checksum(), 0x8738);
        assert_eq!(packet.compute_checksum(), 0x8738);
    }

    #[test]
    fn test_verify_checksum_detects_corruption() {
        let mut packet = challenge_packet();
        packet.header_checksum = packet.compute_checksum();
        assert!(packet.verify_checksum(), "正しいチェックサムの検証に失敗しました");

        let mut corrupted = packet.to_bytes().to_vec();
        corrupted[8] ^= 0x01; // ttlを1ビット反転
        let decoded = IPv4Packet::parse(&corrupted).expect("パケットの解析に失敗しました");
        assert!(!decoded.verify_checksum());
    }

    #[test]
    fn test_roundtrip() {
        let mut packet = challenge_packet();
        packet.header_checksum = packet.compute_checksum();

        let decoded = IPv4Packet::parse(&packet.to_bytes()).expect("パケットの解析に失敗しました");
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_total_length_mismatch() {
        let result = IPv4Packet::new(
            4,
            5,
            0,
            0,
            25,
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
        );
        assert!(matches!(result, Err(PacketError::LengthMismatch(_))));
    }

    #[test]
    fn test_field_out_of_range() {
        let build = |dscp: u8, ecn: u8, fragment_offset: u16, ihl: u8| {
            IPv4Packet::new(
                4,
                ihl,
                dscp,
                ecn,
                ihl as u16 * 4,
                0,
                false,
                false,
                fragment_offset,
                64,
                6,
                0,
                "10.0.0.1",
                "10.0.0.2",
                Vec::new(),
            )
        };

        assert!(matches!(build(64, 0, 0, 5), Err(PacketError::InvalidFieldRange(_))));
        assert!(matches!(build(0, 4, 0, 5), Err(PacketError::InvalidFieldRange(_))));
        assert!(matches!(build(0, 0, 8192, 5), Err(PacketError::InvalidFieldRange(_))));
        assert!(matches!(build(0, 0, 0, 4), Err(PacketError::InvalidFieldRange(_))));
        // ihl > 5はオプションなしでは長さが合わない
        assert!(matches!(build(0, 0, 0, 6), Err(PacketError::LengthMismatch(_))));
    }

    #[test]
    fn test_invalid_address() {
        let build = |source: &str, destination: &str| {
            IPv4Packet::new(
                4, 5, 0, 0, 20, 0, false, false, 0, 64, 6, 0, source, destination, Vec::new(),
            )
        };

        assert!(matches!(
            build("192.168.1", "10.0.0.1"),
            Err(PacketError::InvalidAddressFormat(_))
        ));
        assert!(matches!(
            build("10.0.0.1", "256.0.0.1"),
            Err(PacketError::InvalidAddressFormat(_))
        ));
    }

    #[test]
    fn test_parse_short_buffer() {
        let result = IPv4Packet::parse(&[0x45; 19]);
        assert!(matches!(
            result,
            Err(PacketError::BufferTooShort { required: 20, actual: 19 })
        ));
    }

    #[test]
    fn test_parse_truncated_payload() {
        let mut packet = challenge_packet();
        packet.header_checksum = packet.compute_checksum();
        let bytes = packet.to_bytes();

        // total_length(24バイト)より短いバッファは受理しない
        let result = IPv4Packet::parse(&bytes[..22]);
        assert!(matches!(result, Err(PacketError::BufferTooShort { .. })));
    }

    #[test]
    fn test_parse_invalid_version() {
        let mut data = [0u8; 20];
        data[0] = 0x65; // version=6, ihl=5
        data[3] = 20;
        assert!(matches!(
            IPv4Packet::parse(&data),
            Err(PacketError::InvalidVersion(6))
        ));
    }

    #[test]
    fn test_parse_total_length_below_header_len() {
        let mut data = [0u8; 20];
        data[0] = 0x45;
        data[3] = 10; // total_length=10 < ヘッダ長20
        assert!(matches!(
            IPv4Packet::parse(&data),
            Err(PacketError::LengthMismatch(_))
        ));
    }

    #[test]
    fn test_parse_with_options() {
        let data = vec![
            0x46, 0x00, 0x00, 0x1A, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00, 0x0A, 0x00,
            0x00, 0x01, 0x0A, 0x00, 0x00, 0x02, // 基本ヘッダ20バイト
            0x94, 0x04, 0x00, 0x00, // オプション(Router Alert)
            0x61, 0x62, // ペイロード"ab"
        ];

        let packet = IPv4Packet::parse(&data).expect("パケットの解析に失敗しました");
        assert_eq!(packet.ihl, 6);
        assert_eq!(packet.options, vec![0x94, 0x04, 0x00, 0x00]);
        assert_eq!(packet.payload, b"ab".to_vec());
        assert_eq!(packet.to_bytes().as_ref(), data.as_slice());
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let mut packet = challenge_packet();
        packet.header_checksum = packet.compute_checksum();

        let mut data = packet.to_bytes().to_vec();
        data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let decoded = IPv4Packet::parse(&data).expect("パケットの解析に失敗しました");
        assert_eq!(decoded.payload, b"ahoj".to_vec());
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_binary_representation() {
        let mut packet = challenge_packet();
        packet.header_checksum = packet.compute_checksum();

        let binary = packet.to_binary();
        assert_eq!(binary.len(), packet.to_bytes().len() * 8);
        assert!(binary.starts_with("01000101")); // 0x45
        assert!(binary.chars().all(|c| c == '0' || c == '1'));

        // イテレータは複製すれば先頭から再走査できる
        let bits = packet.bits();
        let restarted: String = bits.clone().collect();
        assert_eq!(restarted, binary);
        assert_eq!(bits.count(), binary.len());
    }
}

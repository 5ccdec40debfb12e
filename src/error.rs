use thiserror::Error;

pub type PacketResult<T> = Result<T, PacketError>;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("フィールドの値が範囲外です: {0}")]
    InvalidFieldRange(String),

    #[error("パケット長が一致しません: {0}")]
    LengthMismatch(String),

    #[error("不正なアドレス形式です: {0}")]
    InvalidAddressFormat(String),

    #[error("バッファが短すぎます: 必要 {required} バイト, 実際 {actual} バイト")]
    BufferTooShort { required: usize, actual: usize },

    #[error("未対応のIPバージョンです: {0}")]
    InvalidVersion(u8),
}

#[derive(Error, Debug)]
pub enum InitProcessError {
    #[error("ロガーのセットアップに失敗しました: {0}")]
    LoggerError(String),

    #[error("環境変数の解析に失敗しました: {0}")]
    EnvVarParseError(String),

    #[error("パケットの構築に失敗しました: {0}")]
    PacketBuildError(String),

    #[error("パケットのシリアライズに失敗しました: {0}")]
    SerializeError(String),
}

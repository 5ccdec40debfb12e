use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

pub fn setup_logger() -> Result<(), Box<dyn std::error::Error>> {
    // ビルダーでロガーをカスタマイズ
    Builder::new()
        // ログレベルの設定
        .filter_level(LevelFilter::Info)
        // タイムスタンプ付きのフォーマット
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        // 標準出力はパケットの出力専用のため、ログは標準エラーに出す
        .target(Target::Stderr)
        .init();

    Ok(())
}

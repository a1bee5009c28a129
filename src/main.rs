use std::io::{self, BufRead, Write};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use barcoded_scanner::api::ApiConfig;
use barcoded_scanner::model::{ScannerSettings, DEFAULT_SERVER_PORT};
use barcoded_scanner::pipeline::{spawn_processor_loop, ScannerChannels};
use barcoded_scanner::processor::{DecodedFrame, ScanProcessor};
use barcoded_scanner::DecisionGate;
use clap::Parser;

/// 从标准输入读取解码结果（每行一个条码），确认后输出提交请求。
#[derive(Parser, Debug)]
#[command(name = "barcoded-scanner", version)]
struct Cli {
    /// barcoded 服务端 IP 地址
    #[arg(value_name = "IP")]
    ip_address: String,
    /// barcoded 服务端端口
    #[arg(value_name = "PORT", default_value_t = DEFAULT_SERVER_PORT)]
    port: u16,
    /// 参与投票的最近条码数量
    #[arg(value_name = "S", default_value_t = 10)]
    set_size: usize,
    /// 判定成功所需的相同条码数量
    #[arg(value_name = "N", default_value_t = 7)]
    required_num: usize,
    /// 条码在窗口中保留的秒数
    #[arg(value_name = "L", default_value_t = 2.0)]
    barcode_lifetime: f64,
    /// 成功后的冷却秒数（便于移走商品）
    #[arg(value_name = "C", default_value_t = 2.0)]
    cooldown_time: f64,
    /// 使用 https 访问服务端
    #[arg(long)]
    https: bool,
    /// 去掉 zbar 输出的 `TYPE:` 前缀
    #[arg(long)]
    strip_symbology: bool,
    /// 确认时在 stderr 输出提示音（BEL）
    #[arg(long)]
    bell: bool,
}

impl Cli {
    fn settings(&self) -> ScannerSettings {
        ScannerSettings {
            server_address: self.ip_address.clone(),
            server_port: self.port,
            set_size: self.set_size,
            required_num: self.required_num,
            barcode_lifetime_secs: self.barcode_lifetime,
            cooldown_secs: self.cooldown_time,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // 日志输出到 stderr，stdout 仅保留 JSON 行
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    let config = settings.gate_config().context("invalid scanner settings")?;
    log::info!("barcoded scanner starting: {}", config);
    log::debug!(
        "settings: {}",
        serde_json::to_string(&settings).unwrap_or_default()
    );

    let api = ApiConfig::new(settings.server_authority(), cli.https);
    let processor = ScanProcessor::new(DecisionGate::new(config), api);

    // 处理管线：stdin -> 决策门线程 -> 输出线程
    let ScannerChannels {
        frame_tx,
        frame_rx,
        confirm_tx,
        confirm_rx,
    } = ScannerChannels::new();
    let processor_handle = spawn_processor_loop(processor, frame_rx, confirm_tx);

    let bell = cli.bell;
    let output_handle = thread::spawn(move || -> io::Result<()> {
        let stdout = io::stdout();
        for outcome in confirm_rx {
            let Some(report) = outcome.report() else {
                continue;
            };
            let line = serde_json::to_string(&report).map_err(io::Error::from)?;
            let mut out = stdout.lock();
            writeln!(out, "{}", line)?;
            out.flush()?;
            if bell {
                // 蜂鸣反馈
                if let Err(err) = io::stderr().write_all(b"\x07") {
                    log::debug!("bell write failed: {}", err);
                }
            }
        }
        Ok(())
    });

    let stdin = io::stdin();
    let fed = feed_lines(stdin.lock(), cli.strip_symbology, &frame_tx);
    drop(frame_tx);
    let fed = fed?;
    log::debug!("fed {} symbol(s) from stdin", fed);

    let stats = processor_handle
        .join()
        .map_err(|_| anyhow::anyhow!("processor thread panicked"))?;
    output_handle
        .join()
        .map_err(|_| anyhow::anyhow!("output thread panicked"))?
        .context("failed to write confirmation")?;

    log::info!(
        "session finished: {} symbol(s), {} discarded in cooldown, {} confirmation(s)",
        stats.symbols,
        stats.discarded,
        stats.confirmations
    );
    Ok(())
}

// zbarimg/zbarcam 输出的码制名称
const SYMBOLOGIES: &[&str] = &[
    "EAN-2", "EAN-5", "EAN-8", "EAN-13", "UPC-A", "UPC-E", "ISBN-10", "ISBN-13", "I2/5",
    "DataBar", "DataBar-Exp", "Codabar", "CODE-39", "CODE-93", "CODE-128", "PDF417", "QR-Code",
    "SQ-Code",
];

/// 逐行读取解码器输出（按字节，不要求 UTF-8），每行作为一帧送入管线。
///
/// 返回送出的条码数；处理线程退出时提前结束。
fn feed_lines<R: BufRead>(
    reader: R,
    strip_symbology: bool,
    frame_tx: &Sender<DecodedFrame>,
) -> anyhow::Result<usize> {
    let mut fed = 0;
    for line in reader.split(b'\n') {
        let line = line.context("failed to read decoder output from stdin")?;
        let Some(symbol) = parse_symbol(&line, strip_symbology) else {
            continue;
        };
        let frame = DecodedFrame::at(vec![symbol.to_vec()], Instant::now());
        if frame_tx.send(frame).is_err() {
            log::warn!("processor loop stopped, ignoring remaining input");
            break;
        }
        fed += 1;
    }
    Ok(fed)
}

/// 解析一行解码器输出；空行忽略。
fn parse_symbol(line: &[u8], strip_symbology: bool) -> Option<&[u8]> {
    let mut line = line;
    while let Some((&last, rest)) = line.split_last() {
        if last != b'\r' && last != b'\n' {
            break;
        }
        line = rest;
    }
    if line.is_empty() {
        return None;
    }
    if strip_symbology {
        if let Some(pos) = line.iter().position(|&b| b == b':') {
            let kind = &line[..pos];
            // 码制前缀只可能是 ASCII
            if kind.is_ascii() && SYMBOLOGIES.iter().any(|name| name.as_bytes() == kind) {
                return Some(&line[pos + 1..]);
            }
        }
    }
    Some(line)
}

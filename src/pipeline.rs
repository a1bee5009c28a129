use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

use crate::processor::{DecodedFrame, ScanOutcome, ScanProcessor, ScanStats};

/// 处理管线的通道集合（解码帧、确认结果）。
pub struct ScannerChannels {
    pub frame_tx: Sender<DecodedFrame>,
    pub frame_rx: Receiver<DecodedFrame>,
    pub confirm_tx: Sender<ScanOutcome>,
    pub confirm_rx: Receiver<ScanOutcome>,
}

impl ScannerChannels {
    /// 创建默认的 mpsc 通道。
    pub fn new() -> Self {
        let (frame_tx, frame_rx) = mpsc::channel();
        let (confirm_tx, confirm_rx) = mpsc::channel();
        Self {
            frame_tx,
            frame_rx,
            confirm_tx,
            confirm_rx,
        }
    }
}

impl Default for ScannerChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// 启动处理器线程：消费解码帧，只转发确认结果。
///
/// 处理器（及其决策门）移入线程独占；帧通道关闭后返回统计。
pub fn spawn_processor_loop(
    mut processor: ScanProcessor,
    frame_rx: Receiver<DecodedFrame>,
    confirm_tx: Sender<ScanOutcome>,
) -> thread::JoinHandle<ScanStats> {
    thread::spawn(move || {
        // 阻塞等待解码帧
        while let Ok(frame) = frame_rx.recv() {
            for outcome in processor.handle_frame(frame, Instant::now()) {
                if !outcome.is_confirmed() {
                    continue;
                }
                if confirm_tx.send(outcome).is_err() {
                    log::warn!("confirmation receiver dropped, stopping processor loop");
                    return processor.stats();
                }
            }
        }
        let stats = processor.stats();
        log::info!(
            "processor loop finished: {} frame(s), {} confirmation(s)",
            stats.frames,
            stats.confirmations
        );
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::state::DecisionGate;
    use std::time::Duration;

    #[test]
    fn forwards_only_confirmations() {
        let gate = DecisionGate::from_secs(5, 3, 10.0, 60.0).unwrap();
        let processor = ScanProcessor::new(gate, ApiConfig::new("host", false));
        let ScannerChannels {
            frame_tx,
            frame_rx,
            confirm_tx,
            confirm_rx,
        } = ScannerChannels::new();
        let handle = spawn_processor_loop(processor, frame_rx, confirm_tx);

        let base = Instant::now();
        for i in 0..5u64 {
            let at = base + Duration::from_millis(i * 40);
            frame_tx
                .send(DecodedFrame::at(vec![b"4006381333931".to_vec()], at))
                .unwrap();
        }
        drop(frame_tx);

        let confirmed: Vec<ScanOutcome> = confirm_rx.iter().collect();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(
            confirmed[0].submission.as_ref().map(|s| s.barcode.as_str()),
            Some("4006381333931")
        );

        let stats = handle.join().unwrap();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.confirmations, 1);
        assert_eq!(stats.discarded, 2);
    }
}

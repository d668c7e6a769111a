//! Rodio Player - 通过系统音频设备出声
//!
//! `rodio::OutputStream` 在部分平台上是 `!Send`，所以输出流和 Sink 都放在
//! 专用线程里，`RodioPlayer` 只持有命令通道，每次调用都发命令并等待回复。

use std::io::Cursor;
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::application::ports::{AudioPlayerPort, PlayerError};

enum PlayerCommand {
    Load {
        bytes: Arc<[u8]>,
        reply: mpsc::Sender<Result<(), PlayerError>>,
    },
    PlayOnce {
        reply: mpsc::Sender<Result<(), PlayerError>>,
    },
    Pause,
    Resume,
    Stop {
        reply: mpsc::Sender<Result<(), PlayerError>>,
    },
    IsBusy {
        reply: mpsc::Sender<bool>,
    },
    Shutdown,
}

/// Rodio Player
pub struct RodioPlayer {
    cmd_tx: mpsc::Sender<PlayerCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioPlayer {
    /// 启动音频线程并打开默认输出设备
    ///
    /// 设备打不开时返回 DeviceError
    pub fn spawn() -> Result<Self, PlayerError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), PlayerError>>();

        let thread = thread::Builder::new()
            .name("shadowtts-audio".into())
            .spawn(move || run(cmd_rx, init_tx))
            .map_err(|e| PlayerError::DeviceError(format!("Failed to spawn audio thread: {}", e)))?;

        init_rx.recv().map_err(|_| thread_died())??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    fn send_and_recv(
        &self,
        build: impl FnOnce(mpsc::Sender<Result<(), PlayerError>>) -> PlayerCommand,
    ) -> Result<(), PlayerError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx.send(build(tx)).map_err(|_| thread_died())?;
        rx.recv().map_err(|_| thread_died())?
    }

    fn query<T>(&self, build: impl FnOnce(mpsc::Sender<T>) -> PlayerCommand) -> Option<T> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx.send(build(tx)).ok()?;
        rx.recv().ok()
    }
}

fn thread_died() -> PlayerError {
    PlayerError::DeviceError("Audio thread died".to_string())
}

/// 音频线程持有的全部资源
struct AudioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    bytes: Option<Arc<[u8]>>,
    sink: Option<Sink>,
}

impl AudioOutput {
    fn open() -> Result<Self, PlayerError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| PlayerError::DeviceError(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            handle,
            bytes: None,
            sink: None,
        })
    }

    fn load(&mut self, bytes: Arc<[u8]>) -> Result<(), PlayerError> {
        // 先解码一次，格式不支持时在加载阶段就失败
        Decoder::new(Cursor::new(bytes.clone()))
            .map_err(|e| PlayerError::LoadFailed(e.to_string()))?;
        self.stop();
        self.bytes = Some(bytes);
        Ok(())
    }

    fn play_once(&mut self) -> Result<(), PlayerError> {
        let bytes = self.bytes.clone().ok_or(PlayerError::NotLoaded)?;
        self.stop();

        let source =
            Decoder::new(Cursor::new(bytes)).map_err(|e| PlayerError::LoadFailed(e.to_string()))?;
        let sink =
            Sink::try_new(&self.handle).map_err(|e| PlayerError::DeviceError(e.to_string()))?;
        sink.append(source);
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    /// 暂停的 Sink 队列不为空，所以暂停时也算忙
    fn is_busy(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}

fn run(cmd_rx: mpsc::Receiver<PlayerCommand>, init_tx: mpsc::Sender<Result<(), PlayerError>>) {
    let mut output = match AudioOutput::open() {
        Ok(output) => output,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };

    if init_tx.send(Ok(())).is_err() {
        return;
    }

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            PlayerCommand::Load { bytes, reply } => {
                let _ = reply.send(output.load(bytes));
            }
            PlayerCommand::PlayOnce { reply } => {
                let _ = reply.send(output.play_once());
            }
            PlayerCommand::Pause => output.pause(),
            PlayerCommand::Resume => output.resume(),
            PlayerCommand::Stop { reply } => {
                output.stop();
                let _ = reply.send(Ok(()));
            }
            PlayerCommand::IsBusy { reply } => {
                let _ = reply.send(output.is_busy());
            }
            PlayerCommand::Shutdown => break,
        }
    }

    tracing::debug!("Audio thread shutting down");
}

impl AudioPlayerPort for RodioPlayer {
    fn load(&self, path: &Path) -> Result<(), PlayerError> {
        let bytes = std::fs::read(path)
            .map_err(|e| PlayerError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        self.send_and_recv(|reply| PlayerCommand::Load {
            bytes: bytes.into(),
            reply,
        })?;
        tracing::debug!(path = %path.display(), "Audio loaded into output device");
        Ok(())
    }

    fn play_once(&self) -> Result<(), PlayerError> {
        self.send_and_recv(|reply| PlayerCommand::PlayOnce { reply })
    }

    fn pause(&self) {
        let _ = self.cmd_tx.send(PlayerCommand::Pause);
    }

    fn resume(&self) {
        let _ = self.cmd_tx.send(PlayerCommand::Resume);
    }

    fn stop(&self) -> Result<(), PlayerError> {
        self.send_and_recv(|reply| PlayerCommand::Stop { reply })
    }

    fn is_busy(&self) -> bool {
        self.query(|reply| PlayerCommand::IsBusy { reply })
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "rodio"
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PlayerCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::silent_wav;
    use tempfile::tempdir;

    // CI 机器通常没有声卡，打不开设备时跳过
    fn player() -> Option<RodioPlayer> {
        match RodioPlayer::spawn() {
            Ok(player) => Some(player),
            Err(e) => {
                eprintln!("skipping: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_play_before_load_fails() {
        let Some(player) = player() else { return };
        assert!(matches!(player.play_once(), Err(PlayerError::NotLoaded)));
        assert!(!player.is_busy());
    }

    #[test]
    fn test_play_pause_stop() {
        let Some(player) = player() else { return };
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, silent_wav(500, 16_000)).unwrap();

        player.load(&path).unwrap();
        player.play_once().unwrap();
        assert!(player.is_busy());

        player.pause();
        assert!(player.is_busy());
        player.resume();

        player.stop().unwrap();
        assert!(!player.is_busy());
    }

    #[test]
    fn test_load_rejects_non_audio() {
        let Some(player) = player() else { return };
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, b"not audio").unwrap();

        assert!(matches!(
            player.load(&path),
            Err(PlayerError::LoadFailed(_))
        ));
    }
}

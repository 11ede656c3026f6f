use std::sync::Arc;

/// Audio output collaborator. Decoding and mixing live behind this trait.
pub trait AudioSink: Send {
    fn load(&mut self, data: Arc<[u8]>);
    fn play(&mut self);
    fn stop(&mut self);
    /// Volume in percent, `0..=100`
    fn set_volume(&mut self, volume: u8);
    fn set_loop(&mut self, looped: bool);
}

/// Sink that only logs what it is asked to do
#[derive(Debug, Default)]
pub struct LogAudio {
    loaded: usize,
}

impl AudioSink for LogAudio {
    fn load(&mut self, data: Arc<[u8]>) {
        self.loaded = data.len();
        log::debug!("audio: loaded {} bytes", self.loaded);
    }

    fn play(&mut self) {
        log::info!("audio: play ({} bytes)", self.loaded);
    }

    fn stop(&mut self) {
        log::info!("audio: stop");
    }

    fn set_volume(&mut self, volume: u8) {
        log::debug!("audio: volume {volume}");
    }

    fn set_loop(&mut self, looped: bool) {
        log::debug!("audio: loop {looped}");
    }
}

/// Background music, started on construction and stopped on drop.
///
/// Only touched when the application is built and torn down, never per frame.
pub struct BackgroundMusic {
    sink: Box<dyn AudioSink>,
}

impl BackgroundMusic {
    pub fn start(mut sink: Box<dyn AudioSink>, data: Arc<[u8]>, volume: u8, looped: bool) -> Self {
        sink.load(data);
        sink.set_loop(looped);
        sink.play();
        sink.set_volume(volume.min(100));
        Self { sink }
    }
}

impl Drop for BackgroundMusic {
    fn drop(&mut self) {
        self.sink.stop();
    }
}

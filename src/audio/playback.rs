use crate::audio::{
    error::AudioError,
    progress::TrackProgress,
    traits::{AudioSink, SinkEvent},
    util::{construct_sink, setup_device_config},
};
use flume::Sender;
use rodio::{Decoder, Sink, Source};
use std::{io::Cursor, sync::Arc, thread, time::Duration};
use tracing::{info, warn};

const MONITOR_INTERVAL: Duration = Duration::from_millis(100);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// The device-backed [`AudioSink`].
///
/// The output stream lives on its own thread for as long as this handle
/// exists. Sources are fetched whole and decoded off the caller's thread;
/// progress and completion come back through the `SinkEvent` channel.
pub struct RodioSink {
    sink: Arc<Sink>,
    progress: Arc<TrackProgress>,
    event_tx: Sender<SinkEvent>,
    _keeper: Sender<()>,
}

impl RodioSink {
    pub fn new(event_tx: Sender<SinkEvent>) -> Result<Self, AudioError> {
        let (sink_tx, sink_rx) = flume::bounded(1);
        let (keeper_tx, keeper_rx) = flume::bounded::<()>(0);

        thread::Builder::new()
            .name("melodeck-output".into())
            .spawn(move || {
                let opened = setup_device_config().and_then(|(device, config, format)| {
                    construct_sink(device, &config, format)
                });
                match opened {
                    Ok((_stream, sink)) => {
                        let _ = sink_tx.send(Ok(Arc::new(sink)));
                        // Holds the stream open until the handle is dropped.
                        let _ = keeper_rx.recv();
                    }
                    Err(e) => {
                        let _ = sink_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| AudioError::DeviceError(e.to_string()))?;

        let sink: Arc<Sink> = sink_rx
            .recv()
            .map_err(|e| AudioError::DeviceError(e.to_string()))??;
        sink.pause();

        let progress = Arc::new(TrackProgress::new());
        Self::spawn_monitor(sink.clone(), progress.clone(), event_tx.clone());

        info!("rodio_sink_ready");
        Ok(Self {
            sink,
            progress,
            event_tx,
            _keeper: keeper_tx,
        })
    }

    fn spawn_monitor(sink: Arc<Sink>, progress: Arc<TrackProgress>, event_tx: Sender<SinkEvent>) {
        thread::spawn(move || {
            while !progress.is_shut_down() {
                let generation = progress.get_generation();
                if progress.is_loaded() {
                    let position = sink.get_pos();
                    progress.set_current_position(position);

                    if sink.empty() {
                        if progress.take_loaded() {
                            let _ = event_tx.send(SinkEvent::Ended { generation });
                        }
                    } else if !sink.is_paused() {
                        let _ = event_tx.send(SinkEvent::TimeUpdate {
                            generation,
                            position_secs: position.as_secs_f64(),
                        });
                    }
                }
                thread::sleep(MONITOR_INTERVAL);
            }
        });
    }

    fn fetch_and_decode(url: &str) -> Result<Decoder<Cursor<Vec<u8>>>, AudioError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        let bytes = client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.bytes())
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let byte_len = bytes.len() as u64;
        Decoder::builder()
            .with_data(Cursor::new(bytes.to_vec()))
            .with_byte_len(byte_len)
            .with_coarse_seek(true)
            .with_gapless(true)
            .build()
            .map_err(|e| AudioError::DecodingError(e.to_string()))
    }
}

impl AudioSink for RodioSink {
    fn set_source(&self, url: &str) -> Result<u64, AudioError> {
        let generation = self.progress.reset();
        self.sink.stop();
        self.sink.pause();

        let url = url.to_string();
        let sink = self.sink.clone();
        let progress = self.progress.clone();
        let event_tx = self.event_tx.clone();

        thread::Builder::new()
            .name("melodeck-loader".into())
            .spawn(move || match Self::fetch_and_decode(&url) {
                Ok(decoder) => {
                    if !progress.is_current(generation) {
                        return;
                    }
                    let duration = decoder.total_duration();
                    sink.append(decoder);
                    progress.set_loaded(true);
                    if let Some(total) = duration {
                        progress.set_total_duration(total);
                        let _ = event_tx.send(SinkEvent::LoadedMetadata {
                            generation,
                            duration_secs: total.as_secs_f64(),
                        });
                    }
                }
                Err(e) => {
                    if progress.is_current(generation) {
                        warn!(error = %e, "rodio_sink_load_failed");
                        let _ = event_tx.send(SinkEvent::Error {
                            generation,
                            message: e.to_string(),
                        });
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        Ok(generation)
    }

    fn play(&self) -> Result<(), AudioError> {
        self.sink.play();
        Ok(())
    }

    fn pause(&self) {
        self.sink.pause();
        self.progress.set_current_position(self.sink.get_pos());
    }

    fn stop(&self) {
        self.progress.reset();
        self.sink.stop();
    }

    fn seek(&self, position_secs: f64) {
        if !self.progress.is_loaded() || !position_secs.is_finite() {
            return;
        }
        let position = Duration::from_secs_f64(position_secs.max(0.0));
        if let Err(e) = self.sink.try_seek(position) {
            warn!(error = %e, "rodio_sink_seek_failed");
            return;
        }
        self.progress.set_current_position(position);
    }

    fn set_volume(&self, volume: f32) {
        self.sink.set_volume(volume);
    }

    fn current_time(&self) -> f64 {
        self.progress.get_progress().0
    }

    fn duration(&self) -> f64 {
        self.progress.get_progress().1
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        self.progress.shut_down();
        self.sink.stop();
    }
}

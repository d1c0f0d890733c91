//! MQTT transport on the ESP-IDF client
//!
//! The client runs its own task and reconnects by itself. Its callback only
//! queues messages and flips flags; everything is handed to the control loop
//! from `service`, so state is never touched off the main task.
//!
//! Payloads larger than the client buffer arrive in chunks and are put back
//! together up to [`MAX_PAYLOAD`] bytes. Anything bigger is cut at that size
//! and delivered as is (it will almost always fail to parse and be dropped by
//! ingest).

/// Largest payload reassembled from chunks
pub const MAX_PAYLOAD: usize = 4096;

/// Topic and payload of one inbound message
pub type Inbound = (String, Vec<u8>);

struct Pending {
    topic: String,
    data: Vec<u8>,
    /// Offset the next chunk must start at
    received: usize,
    total: usize,
}

/// Collects a chunked publish into one message
pub struct Reassembler {
    cap: usize,
    pending: Option<Pending>,
}

impl Reassembler {
    pub fn new(cap: usize) -> Self {
        Self { cap, pending: None }
    }

    /// First chunk of a message of `total` bytes
    pub fn start(&mut self, topic: &str, chunk: &[u8], total: usize) -> Option<Inbound> {
        if self.pending.is_some() {
            log::warn!("Dropping unfinished chunked message");
        }
        let mut data = Vec::with_capacity(total.min(self.cap));
        append_capped(&mut data, chunk, self.cap);
        self.pending = Some(Pending {
            topic: topic.to_string(),
            data,
            received: chunk.len(),
            total,
        });
        self.finish_if_complete()
    }

    /// A follow-up chunk starting at `offset`
    pub fn extend(&mut self, offset: usize, chunk: &[u8]) -> Option<Inbound> {
        let pending = self.pending.as_mut()?;
        if offset != pending.received {
            log::warn!(
                "Chunk at offset {} does not follow {}, dropping message",
                offset,
                pending.received
            );
            self.pending = None;
            return None;
        }
        append_capped(&mut pending.data, chunk, self.cap);
        pending.received += chunk.len();
        self.finish_if_complete()
    }

    fn finish_if_complete(&mut self) -> Option<Inbound> {
        let done = self
            .pending
            .as_ref()
            .is_some_and(|p| p.received >= p.total);
        if !done {
            return None;
        }
        let pending = self.pending.take()?;
        if pending.total > self.cap {
            log::warn!(
                "Message on {} is {} bytes, keeping the first {}",
                pending.topic,
                pending.total,
                self.cap
            );
        }
        Some((pending.topic, pending.data))
    }
}

fn append_capped(data: &mut Vec<u8>, chunk: &[u8], cap: usize) {
    let room = cap.saturating_sub(data.len());
    data.extend_from_slice(&chunk[..chunk.len().min(room)]);
}

#[cfg(target_os = "espidf")]
pub use esp::MqttTransport;

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::Result;
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use log::{info, warn};

    use super::{Inbound, Reassembler, MAX_PAYLOAD};
    use crate::app::Transport;

    const CONNECT_WAIT: Duration = Duration::from_secs(5);
    const CONNECT_POLL: Duration = Duration::from_millis(100);

    pub struct MqttTransport {
        url: &'static str,
        client_id: &'static str,
        buffer_size: usize,
        client: Option<EspMqttClient<'static>>,
        connected: Arc<AtomicBool>,
        /// Set on every broker (re)connect; subscriptions are replayed in `service`
        session_started: Arc<AtomicBool>,
        topics: Vec<String>,
        tx: Sender<Inbound>,
        rx: Receiver<Inbound>,
    }

    impl MqttTransport {
        pub fn new(url: &'static str, client_id: &'static str, buffer_size: usize) -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                url,
                client_id,
                buffer_size,
                client: None,
                connected: Arc::new(AtomicBool::new(false)),
                session_started: Arc::new(AtomicBool::new(false)),
                topics: Vec::new(),
                tx,
                rx,
            }
        }

        fn start_client(&mut self) -> Result<()> {
            let conf = MqttClientConfiguration {
                client_id: Some(self.client_id),
                buffer_size: self.buffer_size,
                ..Default::default()
            };

            let tx = self.tx.clone();
            let connected = self.connected.clone();
            let session_started = self.session_started.clone();
            let mut chunks = Reassembler::new(MAX_PAYLOAD);

            let client = EspMqttClient::new_cb(self.url, &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        info!("MQTT connected");
                        connected.store(true, Ordering::SeqCst);
                        session_started.store(true, Ordering::SeqCst);
                    }
                    EventPayload::Disconnected => {
                        warn!("MQTT disconnected");
                        connected.store(false, Ordering::SeqCst);
                    }
                    EventPayload::Received {
                        topic,
                        data,
                        details,
                        ..
                    } => {
                        let message = match details {
                            Details::Complete => {
                                Some((topic.unwrap_or_default().to_string(), data.to_vec()))
                            }
                            Details::InitialChunk(chunk) => chunks.start(
                                topic.unwrap_or_default(),
                                data,
                                chunk.total_data_size,
                            ),
                            Details::SubsequentChunk(chunk) => {
                                chunks.extend(chunk.current_data_offset, data)
                            }
                        };
                        if let Some(message) = message {
                            // the receiver only goes away with the transport itself
                            let _ = tx.send(message);
                        }
                    }
                    EventPayload::Error(e) => warn!("MQTT error: {:?}", e),
                    _ => {}
                }
            })?;

            self.client = Some(client);
            Ok(())
        }

        fn subscribe_all(&mut self) {
            let Some(client) = self.client.as_mut() else {
                return;
            };
            for topic in &self.topics {
                match client.subscribe(topic, QoS::AtMostOnce) {
                    Ok(_) => info!("Subscribed to: {}", topic),
                    Err(e) => warn!("Subscribe to {} failed: {}", topic, e),
                }
            }
        }
    }

    impl Transport for MqttTransport {
        /// Start the client if needed and wait a bounded time for the session
        fn connect(&mut self) -> bool {
            if self.client.is_none() {
                if let Err(e) = self.start_client() {
                    warn!("Failed to start MQTT client: {:#}", e);
                    return false;
                }
            }

            let started = Instant::now();
            while !self.is_connected() && started.elapsed() < CONNECT_WAIT {
                std::thread::sleep(CONNECT_POLL);
            }

            // the caller subscribes right after a successful connect
            self.session_started.store(false, Ordering::SeqCst);
            self.is_connected()
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn subscribe(&mut self, topic: &str) -> bool {
            if !self.topics.iter().any(|t| t == topic) {
                self.topics.push(topic.to_string());
            }
            let Some(client) = self.client.as_mut() else {
                return false;
            };
            match client.subscribe(topic, QoS::AtMostOnce) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Subscribe to {} failed: {}", topic, e);
                    false
                }
            }
        }

        fn service(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
            if self.session_started.swap(false, Ordering::SeqCst) {
                info!("MQTT session restarted, resubscribing");
                self.subscribe_all();
            }

            while let Ok((topic, payload)) = self.rx.try_recv() {
                on_message(&topic, &payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_joined_in_order() {
        let mut chunks = Reassembler::new(MAX_PAYLOAD);
        assert_eq!(chunks.start("t/display", b"{\"message\":", 20), None);
        let message = chunks.extend(11, b"\"hello\"}\n").unwrap();
        assert_eq!(message.0, "t/display");
        assert_eq!(message.1, b"{\"message\":\"hello\"}\n");
    }

    #[test]
    fn single_chunk_message_completes_at_once() {
        let mut chunks = Reassembler::new(MAX_PAYLOAD);
        let message = chunks.start("t", b"{}", 2).unwrap();
        assert_eq!(message.1, b"{}");
    }

    #[test]
    fn oversized_message_is_cut_at_the_cap() {
        let mut chunks = Reassembler::new(8);
        assert_eq!(chunks.start("t", b"abcdef", 12), None);
        let message = chunks.extend(6, b"ghijkl").unwrap();
        assert_eq!(message.1, b"abcdefgh");
    }

    #[test]
    fn out_of_order_chunk_drops_the_message() {
        let mut chunks = Reassembler::new(MAX_PAYLOAD);
        chunks.start("t", b"abc", 9);
        assert_eq!(chunks.extend(5, b"fgh"), None);
        // nothing pending any more
        assert_eq!(chunks.extend(3, b"def"), None);
    }

    #[test]
    fn stray_follow_up_chunk_is_ignored() {
        let mut chunks = Reassembler::new(MAX_PAYLOAD);
        assert_eq!(chunks.extend(0, b"abc"), None);
    }
}

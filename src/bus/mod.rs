//! Message Bus
//!
//! A single-owner notification bus. Producers push messages at any point in
//! the frame; once per frame the driver calls [`MessageBus::broadcast`], which
//! delivers every queued message, in push order, to every listener and then
//! resets the arena.
//!
//! # Memory
//!
//! ```text
//!  arena:  [hdr|payload..][hdr|payload....][hdr]...........  (fixed capacity)
//!  queue:  [slice0, slice1, slice2]                            (FIFO)
//! ```
//!
//! Each message is copied once into a [`FrameArena`]: an 8-byte header
//! (type tag + payload length) followed by the payload bytes. No per-message
//! heap allocation happens after warm-up. The arena never grows; a push that
//! does not fit fails with [`SyncError::CapacityExhausted`].
//!
//! # Threading
//!
//! The bus is owned by one context and mutated through `&mut self`. Listener
//! registration therefore cannot race a broadcast.
//!
//! ```rust,ignore
//! let mut bus = MessageBus::new(64 * 1024)?;
//! bus.add_listener(|msg: &Message<'_>| println!("{:?}", msg.kind()));
//! bus.push_pod(RESIZED, &[1280u32, 720])?;
//! bus.broadcast();
//! ```

mod arena;
mod message;

use std::collections::VecDeque;

use bytemuck::Pod;
use slotmap::{SlotMap, new_key_type};

use crate::errors::{Result, SyncError};

pub use arena::{ARENA_ALIGN, ArenaSlice, FrameArena};
pub use message::{Listener, Message, MessageType};

use message::{MESSAGE_HEADER_SIZE, MessageHeader};

new_key_type! {
    /// Registration handle returned by [`MessageBus::add_listener`].
    pub struct ListenerKey;
}

/// Arena-backed FIFO message bus.
pub struct MessageBus {
    arena: FrameArena,
    queue: VecDeque<ArenaSlice>,
    listeners: SlotMap<ListenerKey, Box<dyn Listener + Send>>,
}

impl MessageBus {
    /// Creates a bus whose arena holds `arena_size` bytes per broadcast cycle.
    pub fn new(arena_size: usize) -> Result<Self> {
        let arena = FrameArena::with_capacity(arena_size)?;
        log::debug!("MessageBus initialized with a {arena_size} byte arena");

        Ok(Self {
            arena,
            queue: VecDeque::new(),
            listeners: SlotMap::with_key(),
        })
    }

    /// Bytes a message with `payload_len` bytes of payload consumes in the arena.
    #[inline]
    #[must_use]
    pub fn record_size(payload_len: usize) -> usize {
        (MESSAGE_HEADER_SIZE + payload_len).next_multiple_of(ARENA_ALIGN)
    }

    // ── Listeners ───────────────────────────────────────────────────────────

    pub fn add_listener<L>(&mut self, listener: L) -> ListenerKey
    where
        L: Listener + Send + 'static,
    {
        self.listeners.insert(Box::new(listener))
    }

    /// Unregisters a listener. Returns `false` if the key is unknown.
    pub fn remove_listener(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key).is_some()
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ── Producers ───────────────────────────────────────────────────────────

    /// Copies `message` into the arena and queues it for the next broadcast.
    pub fn push_message(&mut self, message: &Message<'_>) -> Result<()> {
        if self.arena.capacity() == 0 {
            return Err(SyncError::NotInitialized("MessageBus"));
        }

        let payload = message.payload();
        let (slice, record) = self
            .arena
            .alloc(MESSAGE_HEADER_SIZE + payload.len())
            .inspect_err(|err| log::error!("MessageBus push of {:?} failed: {err}", message.kind()))?;

        let header = MessageHeader {
            kind: message.kind().0,
            len: payload.len() as u32,
        };
        let (head, body) = record.split_at_mut(MESSAGE_HEADER_SIZE);
        head.copy_from_slice(bytemuck::bytes_of(&header));
        body.copy_from_slice(payload);

        self.queue.push_back(slice);
        Ok(())
    }

    /// Pushes a plain-old-data value as the payload.
    pub fn push_pod<T: Pod>(&mut self, kind: MessageType, value: &T) -> Result<()> {
        self.push_message(&Message::new(kind, bytemuck::bytes_of(value)))
    }

    // ── Frame driver ────────────────────────────────────────────────────────

    /// Delivers every queued message to every listener, then resets the arena.
    ///
    /// Payload references handed to listeners are invalid once this returns.
    /// Returns the number of messages delivered.
    pub fn broadcast(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(slice) = self.queue.pop_front() {
            let Some(message) = self.arena.get(slice).and_then(MessageHeader::decode) else {
                log::error!("MessageBus dropped a message from a stale arena generation");
                continue;
            };

            for listener in self.listeners.values_mut() {
                listener.on_message(&message);
            }
            delivered += 1;
        }

        self.arena.reset();
        delivered
    }

    /// Clears listeners and the queue and releases the arena. Idempotent.
    ///
    /// Later pushes fail with [`SyncError::NotInitialized`].
    pub fn term(&mut self) {
        if self.arena.capacity() == 0 {
            return;
        }
        self.listeners.clear();
        self.queue.clear();
        self.arena.release();
        log::debug!("MessageBus terminated");
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.arena.capacity() > 0
    }

    /// Number of messages waiting for the next broadcast.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn arena(&self) -> &FrameArena {
        &self.arena
    }
}

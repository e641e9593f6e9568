use bytemuck::{Pod, Zeroable};

/// Integer tag identifying what a message's payload means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageType(pub u32);

/// A message as seen by producers and listeners.
///
/// The payload borrows either from the producer or, during a broadcast, from
/// the bus arena. Listeners must copy anything they want to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    kind: MessageType,
    payload: &'a [u8],
}

impl<'a> Message<'a> {
    #[inline]
    #[must_use]
    pub const fn new(kind: MessageType, payload: &'a [u8]) -> Self {
        Self { kind, payload }
    }

    /// A message with no payload.
    #[inline]
    #[must_use]
    pub const fn empty(kind: MessageType) -> Self {
        Self { kind, payload: &[] }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Reads the payload as a `T`. Returns `None` on a size mismatch.
    #[must_use]
    pub fn read<T: Pod>(&self) -> Option<T> {
        bytemuck::try_pod_read_unaligned(self.payload).ok()
    }
}

/// In-arena record header, written directly in front of the payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct MessageHeader {
    pub kind: u32,
    pub len: u32,
}

pub(crate) const MESSAGE_HEADER_SIZE: usize = std::mem::size_of::<MessageHeader>();

impl MessageHeader {
    /// Splits an arena record into a message.
    pub(crate) fn decode(record: &[u8]) -> Option<Message<'_>> {
        let (header, payload) = record.split_at_checked(MESSAGE_HEADER_SIZE)?;
        let header: Self = bytemuck::try_pod_read_unaligned(header).ok()?;
        let payload = payload.get(..header.len as usize)?;
        Some(Message::new(MessageType(header.kind), payload))
    }
}

/// Receives every message broadcast on a [`MessageBus`](super::MessageBus).
pub trait Listener {
    fn on_message(&mut self, message: &Message<'_>);
}

impl<F> Listener for F
where
    F: FnMut(&Message<'_>),
{
    fn on_message(&mut self, message: &Message<'_>) {
        self(message);
    }
}

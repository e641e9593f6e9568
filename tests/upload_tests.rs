//! StagingUploader Tests
//!
//! Tests for:
//! - FIFO recording order
//! - Snapshot semantics: requests pushed during a drain wait for the next call
//! - In-flight lifetime counting after upload
//! - clear() discarding never-recorded requests
//! - Serialized mode with concurrent producers and drivers
//! - wgpu buffer uploads: copy validation and recording on a no-op device

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use myth_sync::{BufferUpload, StagingUploader, SyncError, Upload, UploadConcurrency, UploadSender};

/// Command list that records the ids of uploaded items.
#[derive(Default)]
struct CommandLog(Vec<u32>);

struct Item {
    id: u32,
    drops: Arc<AtomicUsize>,
    spawn: Option<UploadSender<Item>>,
}

impl Item {
    fn new(id: u32, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            id,
            drops: Arc::clone(drops),
            spawn: None,
        }
    }
}

impl Upload<CommandLog> for Item {
    fn upload(&mut self, commands: &mut CommandLog) {
        commands.0.push(self.id);
        if let Some(sender) = self.spawn.take() {
            sender.push(Some(Item::new(self.id + 100, &self.drops)), 1);
        }
    }
}

impl Drop for Item {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn uploader() -> StagingUploader<Item> {
    StagingUploader::new(UploadConcurrency::FrameDriver)
}

// ============================================================================
// Upload
// ============================================================================

#[test]
fn upload_records_in_fifo_order() {
    let drops = Arc::new(AtomicUsize::new(0));
    let uploader = uploader();
    for id in [1, 2, 3] {
        uploader.push(Some(Item::new(id, &drops)), 2);
    }

    let mut log = CommandLog::default();
    assert_eq!(uploader.upload(&mut log), 3);
    assert_eq!(log.0, vec![1, 2, 3]);
    assert_eq!(uploader.pending_len(), 0);
    assert_eq!(uploader.in_flight_len(), 3);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
}

#[test]
fn upload_only_drains_snapshot() {
    let drops = Arc::new(AtomicUsize::new(0));
    let uploader = uploader();
    let mut first = Item::new(1, &drops);
    first.spawn = Some(uploader.sender());
    uploader.push(Some(first), 1);

    let mut log = CommandLog::default();
    assert_eq!(uploader.upload(&mut log), 1);
    assert_eq!(log.0, vec![1]);
    assert_eq!(uploader.pending_len(), 1);

    assert_eq!(uploader.upload(&mut log), 1);
    assert_eq!(log.0, vec![1, 101]);
}

#[test]
fn in_flight_items_survive_their_lifetime() {
    let drops = Arc::new(AtomicUsize::new(0));
    let uploader = uploader();
    uploader.push(Some(Item::new(1, &drops)), 2);

    // Pending items are not aged by frame_sync.
    assert_eq!(uploader.frame_sync(), 0);
    assert_eq!(uploader.pending_len(), 1);

    uploader.upload(&mut CommandLog::default());
    assert_eq!(uploader.frame_sync(), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    assert_eq!(uploader.frame_sync(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(uploader.in_flight_len(), 0);
}

#[test]
fn push_none_is_noop() {
    let uploader = uploader();
    assert!(!uploader.push(None, 3));
    assert!(!uploader.sender().push(None, 3));
    assert_eq!(uploader.pending_len(), 0);
    assert_eq!(uploader.upload(&mut CommandLog::default()), 0);
}

#[test]
fn clear_discards_pending_and_in_flight() {
    let drops = Arc::new(AtomicUsize::new(0));
    let uploader = uploader();
    uploader.push(Some(Item::new(1, &drops)), 5);
    uploader.upload(&mut CommandLog::default());
    uploader.push(Some(Item::new(2, &drops)), 5);
    uploader.push(Some(Item::new(3, &drops)), 5);

    assert_eq!(uploader.clear(), 3);
    assert_eq!(drops.load(Ordering::SeqCst), 3);
    assert_eq!(uploader.pending_len(), 0);
    assert_eq!(uploader.in_flight_len(), 0);

    let mut log = CommandLog::default();
    assert_eq!(uploader.upload(&mut log), 0);
    assert!(log.0.is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

/// Command list shared between several driver threads.
#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<u32>>>);

struct Tagged(u32);

impl Upload<SharedLog> for Tagged {
    fn upload(&mut self, commands: &mut SharedLog) {
        commands.0.lock().push(self.0);
    }
}

#[test]
fn serialized_mode_keeps_fifo_across_drivers() {
    const TOTAL: u32 = 2000;

    let uploader = Arc::new(StagingUploader::<Tagged>::new(UploadConcurrency::Serialized));
    assert_eq!(uploader.concurrency(), UploadConcurrency::Serialized);

    let log = SharedLog::default();
    let recorded = Arc::new(AtomicUsize::new(0));

    let producer = {
        let sender = uploader.sender();
        thread::spawn(move || {
            for id in 0..TOTAL {
                sender.push(Some(Tagged(id)), 1);
            }
        })
    };

    let drivers: Vec<_> = (0..2)
        .map(|_| {
            let uploader = Arc::clone(&uploader);
            let recorded = Arc::clone(&recorded);
            let mut log = log.clone();
            thread::spawn(move || {
                while recorded.load(Ordering::SeqCst) < TOTAL as usize {
                    let n = uploader.upload(&mut log);
                    recorded.fetch_add(n, Ordering::SeqCst);
                    thread::yield_now();
                }
            })
        })
        .collect();

    producer.join().unwrap();
    for driver in drivers {
        driver.join().unwrap();
    }

    let ids = log.0.lock();
    assert_eq!(ids.len(), TOTAL as usize);
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "uploads recorded out of order");
}

#[test]
fn default_mode_is_frame_driver() {
    let uploader = StagingUploader::<Tagged>::default();
    assert_eq!(uploader.concurrency(), UploadConcurrency::FrameDriver);
}

// ============================================================================
// wgpu buffer uploads
// ============================================================================

fn noop_device() -> (wgpu::Device, wgpu::Queue) {
    wgpu::Device::noop(&wgpu::DeviceDescriptor::default())
}

fn target_buffer(device: &wgpu::Device, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Upload Target"),
        size,
        usage,
        mapped_at_creation: false,
    })
}

#[test]
fn buffer_upload_rejects_misaligned_size_and_offset() {
    let (device, _queue) = noop_device();
    let target = target_buffer(&device, 64, wgpu::BufferUsages::COPY_DST);

    assert!(matches!(
        BufferUpload::new(&device, &[0u8; 6], &target, 0, None),
        Err(SyncError::MisalignedCopy { value: 6 })
    ));
    assert!(matches!(
        BufferUpload::new(&device, &[0u8; 8], &target, 2, None),
        Err(SyncError::MisalignedCopy { value: 2 })
    ));
}

#[test]
fn buffer_upload_rejects_target_without_copy_dst() {
    let (device, _queue) = noop_device();
    let target = target_buffer(&device, 16, wgpu::BufferUsages::VERTEX);

    let err = BufferUpload::new(&device, &[0u8; 16], &target, 0, None).unwrap_err();
    assert!(matches!(
        err,
        SyncError::CopyTargetUsage { usage } if usage == wgpu::BufferUsages::VERTEX
    ));
}

#[test]
fn buffer_upload_rejects_out_of_bounds_copy() {
    let (device, _queue) = noop_device();
    let target = target_buffer(&device, 16, wgpu::BufferUsages::COPY_DST);

    assert!(matches!(
        BufferUpload::new(&device, &[0u8; 64], &target, 0, None),
        Err(SyncError::CopyOutOfBounds {
            offset: 0,
            size: 64,
            target_size: 16,
        })
    ));
    assert!(matches!(
        BufferUpload::new(&device, &[0u8; 4], &target, 16, None),
        Err(SyncError::CopyOutOfBounds { offset: 16, .. })
    ));

    // offset + size overflows u64.
    let offset = u64::MAX - 3;
    assert!(matches!(
        BufferUpload::new(&device, &[0u8; 8], &target, offset, None),
        Err(SyncError::CopyOutOfBounds { .. })
    ));
}

#[test]
fn buffer_upload_records_and_submits() {
    let (device, queue) = noop_device();
    let target = target_buffer(
        &device,
        64,
        wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
    );

    let uploader = StagingUploader::<BufferUpload>::new(UploadConcurrency::FrameDriver);

    let head = BufferUpload::from_pod(&device, &[1.0f32, 2.0, 3.0, 4.0], &target, 0, None).unwrap();
    assert_eq!(head.size(), 16);

    // Ends exactly at the end of the target.
    let tail = BufferUpload::new(&device, &[7u8; 16], &target, 48, Some("Tail Staging")).unwrap();
    assert_eq!(tail.target_offset(), 48);

    uploader.push(Some(head), 1);
    uploader.push(Some(tail), 1);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Upload Encoder"),
    });
    assert_eq!(uploader.upload(&mut encoder), 2);
    queue.submit(Some(encoder.finish()));

    assert_eq!(uploader.in_flight_len(), 2);
    assert_eq!(uploader.frame_sync(), 2);
}

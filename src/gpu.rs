//! OpenCL host side of the batch search.
//!
//! The device enumerates a 24-bit tail over a host-chosen 29-byte key root:
//! work item `g` derives the candidate `root[0..29] ‖ g` and tests the
//! resulting public key against the range tables uploaded at init. A single
//! 64-bit result cell carries back the global id of one matching item, or
//! stays at the sentinel.

use log::info;
use ocl::{Buffer, Context, Device, DeviceType, Kernel, Platform, Program, Queue, SpatialDims};

use crate::error::Error;
use crate::matcher::{Matcher, PUBKEY_LEN};

const KERNEL_SOURCE: &str = include_str!("../kernels/vanity.cl");
const KERNEL_NAME: &str = "find_vanity_pubkey";

/// How many root bytes the host owns; the device fills the remaining three.
pub const KEY_ROOT_LEN: usize = 29;

const RESULT_SENTINEL: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
pub struct GpuOptions {
    pub platform_idx: usize,
    pub device_idx: usize,
    pub global_work_size: usize,
    pub local_work_size: Option<usize>,
}

/// One OpenCL device plus the compiled kernel and its buffers.
///
/// Owned by exactly one worker thread; every device object is released in
/// drop order when the searcher goes out of scope.
pub struct GpuSearcher {
    // The program and range tables are not touched after init but must stay
    // alive for as long as the kernel can launch.
    #[allow(dead_code)]
    program: Program,
    #[allow(dead_code)]
    min_ranges_buf: Buffer<u8>,
    #[allow(dead_code)]
    max_ranges_buf: Buffer<u8>,
    kernel: Kernel,
    queue: Queue,
    result_buf: Buffer<u64>,
    key_root_buf: Buffer<u8>,
    global_work_size: usize,
    local_work_size: Option<usize>,
}

impl GpuSearcher {
    pub fn new(opts: &GpuOptions, matcher: &Matcher) -> Result<Self, Error> {
        let (platform, device) = select_device(opts.platform_idx, opts.device_idx)?;
        info!(
            "Initializing Solana GPU {} {}",
            device.vendor()?,
            device.name()?
        );

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()?;
        let queue = Queue::new(&context, device, None)?;
        let program = Program::builder().src(KERNEL_SOURCE).build(&context)?;

        let num_ranges = matcher.ranges().len();
        let tables_len = num_ranges * PUBKEY_LEN;

        let result_buf = Buffer::<u64>::builder()
            .queue(queue.clone())
            .flags(ocl::flags::MEM_WRITE_ONLY)
            .len(1)
            .build()?;
        let key_root_buf = Buffer::<u8>::builder()
            .queue(queue.clone())
            .flags(ocl::flags::MEM_READ_ONLY)
            .len(32)
            .build()?;
        let min_ranges_buf = Buffer::<u8>::builder()
            .queue(queue.clone())
            .flags(ocl::flags::MEM_READ_ONLY)
            .len(tables_len)
            .build()?;
        let max_ranges_buf = Buffer::<u8>::builder()
            .queue(queue.clone())
            .flags(ocl::flags::MEM_READ_ONLY)
            .len(tables_len)
            .build()?;

        // The range tables never change after compilation; upload them once.
        let mut min_data = vec![0u8; tables_len];
        let mut max_data = vec![0u8; tables_len];
        for (i, range) in matcher.ranges().iter().enumerate() {
            min_data[i * PUBKEY_LEN..][..PUBKEY_LEN].copy_from_slice(&range.min);
            max_data[i * PUBKEY_LEN..][..PUBKEY_LEN].copy_from_slice(&range.max);
        }
        min_ranges_buf.write(&min_data[..]).enq()?;
        max_ranges_buf.write(&max_data[..]).enq()?;

        let kernel = Kernel::builder()
            .program(&program)
            .name(KERNEL_NAME)
            .queue(queue.clone())
            .global_work_size(SpatialDims::One(opts.global_work_size))
            .arg(&result_buf)
            .arg(&key_root_buf)
            .arg(&min_ranges_buf)
            .arg(&max_ranges_buf)
            .arg(num_ranges as u32)
            .build()?;

        Ok(Self {
            program,
            min_ranges_buf,
            max_ranges_buf,
            kernel,
            queue,
            result_buf,
            key_root_buf,
            global_work_size: opts.global_work_size,
            local_work_size: opts.local_work_size,
        })
    }

    /// Candidates tested per launch.
    pub fn batch_size(&self) -> u64 {
        self.global_work_size as u64
    }

    /// Run one batch over `key_root` and return the reconstructed secret key
    /// of one matching candidate, if the device reported any.
    pub fn compute(&mut self, key_root: &[u8; 32]) -> Result<Option<[u8; 32]>, Error> {
        self.result_buf.write(&[RESULT_SENTINEL][..]).enq()?;
        self.key_root_buf.write(&key_root[..]).enq()?;

        let mut cmd = self
            .kernel
            .cmd()
            .global_work_size(SpatialDims::One(self.global_work_size));
        if let Some(local) = self.local_work_size {
            cmd = cmd.local_work_size(SpatialDims::One(local));
        }
        unsafe {
            cmd.enq()?;
        }
        self.queue.finish()?;

        let mut result = [RESULT_SENTINEL];
        self.result_buf.read(&mut result[..]).enq()?;
        let global_id = result[0];
        if global_id == RESULT_SENTINEL {
            return Ok(None);
        }

        Ok(Some(reconstruct_key(key_root, global_id)))
    }
}

/// Place the 24-bit tail big-endian in the last three bytes of the root.
fn reconstruct_key(key_root: &[u8; 32], global_id: u64) -> [u8; 32] {
    let mut key = *key_root;
    key[KEY_ROOT_LEN] = (global_id >> 16) as u8;
    key[KEY_ROOT_LEN + 1] = (global_id >> 8) as u8;
    key[KEY_ROOT_LEN + 2] = global_id as u8;
    key
}

fn select_device(platform_idx: usize, device_idx: usize) -> Result<(Platform, Device), Error> {
    let platforms = Platform::list();
    if platform_idx >= platforms.len() {
        return Err(Error::PlatformOutOfRange {
            index: platform_idx,
            count: platforms.len(),
        });
    }
    let platform = platforms[platform_idx];

    // Prefer GPU devices on the platform; fall back to whatever else it has.
    let devices = match Device::list(platform, Some(DeviceType::GPU)) {
        Ok(devices) if !devices.is_empty() => devices,
        _ => Device::list_all(platform)?,
    };
    if devices.is_empty() {
        return Err(Error::NoDevice);
    }
    if device_idx >= devices.len() {
        return Err(Error::DeviceOutOfRange {
            index: device_idx,
            count: devices.len(),
        });
    }

    Ok((platform, devices[device_idx]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_pubkey;

    #[test]
    fn test_reconstruct_key_places_tail_big_endian() {
        let root = [0xAA; 32];
        let key = reconstruct_key(&root, 0x0012_3456);
        assert_eq!(key[..29], [0xAA; 29]);
        assert_eq!(&key[29..], &[0x12, 0x34, 0x56]);

        let key = reconstruct_key(&root, 0);
        assert_eq!(&key[29..], &[0, 0, 0]);
    }

    /// The kernel must agree with the CPU derivation; this exercises the
    /// whole pipeline on real hardware and only runs where OpenCL exists.
    #[test]
    #[ignore = "requires an OpenCL device"]
    fn test_device_agrees_with_cpu_derivation() {
        let matcher = Matcher::compile("").unwrap();
        let opts = GpuOptions {
            platform_idx: 0,
            device_idx: 0,
            global_work_size: 256,
            local_work_size: None,
        };
        let mut gpu = GpuSearcher::new(&opts, &matcher).unwrap();

        // Every candidate matches the empty prefix, so some work item must
        // report in, and its reconstructed key must confirm on the CPU.
        let root = [5u8; 32];
        let key = gpu.compute(&root).unwrap().expect("no device result");
        assert_eq!(key[..29], root[..29]);
        assert!(matcher.matches(&derive_pubkey(&key)));
    }
}
